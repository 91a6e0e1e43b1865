// Copyright 2024 the dubloon developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Controller connecting the audio encoders.

use super::adpcm;
use super::error::EncodeError;

/// Audio encoder selected by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    /// Identity encoder; the input is already in the target PCM format.
    Pcm,
    /// ADPCM-A, the default.
    Adpcm,
}

impl AudioCodec {
    /// Looks up an encoder by name, ASCII case-insensitively. The empty
    /// name selects ADPCM-A.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownCodec`] for unrecognized names.
    ///
    /// # Examples
    ///
    /// ```
    /// use dubloon::AudioCodec;
    ///
    /// assert_eq!(AudioCodec::from_name("PCM").unwrap(), AudioCodec::Pcm);
    /// assert_eq!(AudioCodec::from_name("").unwrap(), AudioCodec::Adpcm);
    /// assert!(AudioCodec::from_name("opus").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, EncodeError> {
        if name.eq_ignore_ascii_case("pcm") {
            Ok(Self::Pcm)
        } else if name.is_empty() || name.eq_ignore_ascii_case("adpcm") {
            Ok(Self::Adpcm)
        } else {
            Err(EncodeError::UnknownCodec(name.to_owned()))
        }
    }

    /// Encodes an audio byte stream with the selected codec.
    pub fn encode(self, input: &[u8]) -> Vec<u8> {
        match self {
            Self::Pcm => input.to_vec(),
            Self::Adpcm => adpcm::encode(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("pcm", AudioCodec::Pcm)]
    #[case("PCM", AudioCodec::Pcm)]
    #[case("adpcm", AudioCodec::Adpcm)]
    #[case("AdPcM", AudioCodec::Adpcm)]
    #[case("", AudioCodec::Adpcm)]
    fn names_resolve(#[case] name: &str, #[case] expected: AudioCodec) {
        assert_eq!(AudioCodec::from_name(name).unwrap(), expected);
    }

    #[rstest]
    #[case("mp3")]
    #[case("pcm ")]
    #[case("adpcm-a")]
    fn unknown_names_are_not_found(#[case] name: &str) {
        assert_eq!(
            AudioCodec::from_name(name),
            Err(EncodeError::UnknownCodec(name.to_owned()))
        );
    }

    #[test]
    fn pcm_is_the_identity() {
        let input: Vec<u8> = (0..=255).collect();
        assert_eq!(AudioCodec::Pcm.encode(&input), input);
    }

    #[test]
    fn adpcm_prepends_a_header() {
        let out = AudioCodec::Adpcm.encode(&[0u8; 8]);
        assert_eq!(out.len(), 3 + 2);
    }
}

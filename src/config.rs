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

//! Encoder configuration structs.

use serde::Deserialize;
use serde::Serialize;

use super::coding::AudioCodec;
use super::error::EncodeError;

/// Configuration for the audio tracks of an asset group.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Audio {
    /// Encoder name, matched case-insensitively. The empty string
    /// selects ADPCM-A.
    pub codec: String,
}

#[allow(clippy::derivable_impls)]
impl Default for Audio {
    fn default() -> Self {
        Self {
            codec: String::new(),
        }
    }
}

impl Audio {
    /// Resolves the configured codec name.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownCodec`] when the name matches no
    /// encoder.
    pub fn resolve(&self) -> Result<AudioCodec, EncodeError> {
        AudioCodec::from_name(&self.codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let config = Audio::default();
        assert!(toml::to_string(&config).is_ok());
    }

    #[test]
    fn deserialization() {
        let src = r#"codec = "pcm""#;
        let config: Audio = toml::from_str(src).expect("Parse error.");
        assert_eq!(config.resolve().unwrap(), AudioCodec::Pcm);
    }

    #[test]
    fn empty_source_yields_the_default_codec() {
        let config: Audio = toml::from_str("").expect("Parse error.");
        assert_eq!(config, Audio::default());
        assert_eq!(config.resolve().unwrap(), AudioCodec::Adpcm);
    }

    #[test]
    fn bad_names_surface_at_resolution() {
        let config: Audio = toml::from_str(r#"codec = "mp3""#).expect("Parse error.");
        assert!(config.resolve().is_err());
    }
}

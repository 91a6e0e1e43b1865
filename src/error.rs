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

//! Error types surfaced by the asset encoders.

use std::error::Error;
use std::fmt;

use super::constant::MAX_STREAM_WORDS;

/// Enum of errors the encoders can return to the pipeline.
///
/// On error the encoders produce no output at all; there are no
/// partially-written streams to clean up.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub enum EncodeError {
    /// No encoder is registered under the requested name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dubloon::error::EncodeError;
    /// let err = EncodeError::UnknownCodec("vorbis".to_owned());
    /// assert_eq!(format!("{}", err), "no encoder named `vorbis`");
    /// ```
    UnknownCodec(String),
    /// A compressed tile stream does not fit the 16-bit word address
    /// space; the caller must split the asset or reject it.
    ///
    /// # Examples
    ///
    /// ```
    /// # use dubloon::error::EncodeError;
    /// let err = EncodeError::TooLarge { words: 70000 };
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "compressed stream needs 70000 words; the limit is 65536"
    /// );
    /// ```
    TooLarge {
        /// Words the stream would have required.
        words: usize,
    },
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCodec(name) => {
                write!(f, "no encoder named `{name}`")
            }
            Self::TooLarge { words } => {
                write!(
                    f,
                    "compressed stream needs {words} words; the limit is {MAX_STREAM_WORDS}"
                )
            }
        }
    }
}

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

//! Little-endian slice conversion utilities.

/// Reinterprets little-endian byte pairs as signed 16-bit samples.
///
/// A trailing byte that does not complete a sample is discarded.
pub fn le_bytes_to_i16s(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

/// Serializes samples as little-endian byte pairs.
pub fn i16s_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut ret = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        ret.extend_from_slice(&s.to_le_bytes());
    }
    ret
}

/// Serializes 16-bit words as little-endian bytes.
pub fn words_to_le_bytes(words: &[u16]) -> Vec<u8> {
    let mut ret = Vec::with_capacity(words.len() * 2);
    for w in words {
        ret.extend_from_slice(&w.to_le_bytes());
    }
    ret
}

/// Parses little-endian bytes into 16-bit words.
///
/// # Panics
///
/// Panics when the length of `bytes` is odd.
pub fn le_bytes_to_words(bytes: &[u8]) -> Vec<u16> {
    assert!(bytes.len() % 2 == 0, "len={}", bytes.len());
    bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect()
}

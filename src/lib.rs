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

#![doc = include_str!("../README.md")]
#![warn(clippy::all, clippy::nursery, clippy::pedantic)]
// Some of clippy::pedantic rules are actually useful, so use it with a lot of
// ad-hoc exceptions.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate
)]
// Some from restriction lint-group
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::create_dir,
    clippy::dbg_macro,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::if_then_some_else_none,
    clippy::lossy_float_literal,
    clippy::print_stdout,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::separated_literal_suffix,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::try_err,
    clippy::unnecessary_self_imports,
    clippy::wildcard_enum_match_arm
)]

pub mod adpcm;
pub mod arrayutils;
pub mod bitbuf;
pub mod coding;
pub mod config;
pub mod constant;
pub mod dub;
pub mod error;

#[cfg(any(test, doctest, feature = "test_helper"))]
pub mod test_helper;

// import global entry points
pub use coding::AudioCodec;

pub use dub::DubEncoder;
pub use dub::DubStream;
pub use dub::TileLayout;

#[cfg(test)]
mod test {
    // end-to-end, but transparent test.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn e2e_audio_pipeline_from_config(
        #[values("", r#"codec = "adpcm""#, r#"codec = "PCM""#)] config: &str,
    ) {
        let config: config::Audio = toml::from_str(config).expect("config parsing error");
        let codec = config.resolve().expect("codec lookup error");

        let signal = test_helper::sinusoid_plus_noise(2048, 128, 9000.0, 400);
        let input = arrayutils::i16s_to_le_bytes(&signal);
        let encoded = codec.encode(&input);

        match codec {
            AudioCodec::Pcm => {
                assert_eq!(encoded, input);
                assert_eq!(arrayutils::le_bytes_to_i16s(&encoded), signal);
            }
            AudioCodec::Adpcm => {
                assert_eq!(encoded.len(), 3 + signal.len() / 2);
                let decoded = test_helper::adpcm_decode(&encoded);
                let mut sum = 0f64;
                for (d, s) in decoded.iter().zip(&signal) {
                    let e = f64::from(*d) - f64::from(*s);
                    sum += e * e;
                }
                let rms = (sum / signal.len() as f64).sqrt();
                assert!(rms < 2000.0, "rms={rms}");
            }
        }
    }

    #[rstest]
    fn e2e_tile_pipeline(
        #[values((8, 8, 1), (10, 6, 1), (24, 16, 4), (65, 33, 2))] dims: (usize, usize, usize),
        #[values(3, 0xFFFF)] max_tile: u16,
    ) {
        let layout = TileLayout::new(dims.0, dims.1, dims.2);
        let tiles = test_helper::random_tiles(layout.tile_count(), max_tile);

        let stream = test_helper::dub_integrity_test(layout, &tiles);
        stream.log_stats("e2e");
        assert!(stream.compressed_words() < constant::MAX_STREAM_WORDS);
    }
}

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

//! Signal generators and reference decoders for tests.
//!
//! The decoders here mirror the arithmetic of the on-device firmware and
//! exist to close the loop in integrity tests; they are not part of the
//! pipeline itself.

use std::f32::consts::PI;

use rand::distributions::Distribution;
use rand::distributions::Uniform;

use super::adpcm;
use super::constant::BLOCK_SIZE;
use super::constant::CODE_TABLE;
use super::constant::DUB_CHUNK_BITS;
use super::constant::INDEX_MAX;
use super::constant::STEP_SIZE_TABLE;
use super::dub::DubEncoder;
use super::dub::DubStream;
use super::dub::TileLayout;

/// Generates a test signal with a sinusoid and uniform white noise.
#[allow(dead_code)]
pub fn sinusoid_plus_noise(
    num_samples: usize,
    period: usize,
    amplitude: f32,
    noise_width: i32,
) -> Vec<i16> {
    let mut rng = rand::thread_rng();
    let period = period as f32;
    let die = Uniform::from(-noise_width..=noise_width);
    let mut ret = Vec::with_capacity(num_samples);
    for t in 0..num_samples {
        let sin = (amplitude * (2.0 * (t as f32) * PI / period).sin()) as i32;
        ret.push((sin + die.sample(&mut rng)).clamp(-32768, 32767) as i16);
    }
    ret
}

/// Generates uniformly random tile indices in `0..=max_tile`.
#[allow(dead_code)]
pub fn random_tiles(count: usize, max_tile: u16) -> Vec<u16> {
    let mut rng = rand::thread_rng();
    let die = Uniform::from(0..=max_tile);
    (0..count).map(|_| die.sample(&mut rng)).collect()
}

/// Reference ADPCM-A decoder.
///
/// Reads the 3-byte initial-conditions header, then emits the predictor
/// value after every nybble, exactly as the target does.
pub fn adpcm_decode(data: &[u8]) -> Vec<i16> {
    assert!(data.len() >= 3, "stream is shorter than its header");
    let mut sample = i32::from(i16::from_le_bytes([data[0], data[1]]));
    let mut index = i32::from(data[2]);

    let mut ret = Vec::with_capacity((data.len() - 3) * 2);
    for byte in &data[3..] {
        for code in [byte & 0xF, byte >> 4] {
            let step = u32::from(STEP_SIZE_TABLE[index as usize]);
            sample = (sample + adpcm::candidate_delta(code as usize, step)).clamp(-32768, 32767);
            index = (index + adpcm::index_adjust(code as usize)).clamp(0, INDEX_MAX);
            assert!((0..=INDEX_MAX).contains(&index));
            ret.push(sample as i16);
        }
    }
    ret
}

/// Reads DUB bitstreams the way the firmware does: 16-bit words refill
/// a shift register from the low end.
struct BitReader<'a> {
    words: &'a [u16],
    pos: usize,
    acc: u64,
    count: usize,
}

impl<'a> BitReader<'a> {
    fn new(words: &'a [u16]) -> Self {
        Self {
            words,
            pos: 0,
            acc: 0,
            count: 0,
        }
    }

    fn read(&mut self, width: usize) -> u32 {
        while self.count < width {
            self.acc |= u64::from(self.words[self.pos]) << self.count;
            self.pos += 1;
            self.count += 16;
        }
        let ret = (self.acc & ((1u64 << width) - 1)) as u32;
        self.acc >>= width;
        self.count -= width;
        ret
    }

    fn read_var(&mut self, chunk: usize) -> u32 {
        let mut value = 0u32;
        let mut shift = 0;
        loop {
            let more = self.read(1);
            value |= self.read(chunk) << shift;
            shift += chunk;
            if more == 0 {
                return value;
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RefCode {
    Delta(i32),
    Ref(u32),
}

fn apply(dict: &mut Vec<u16>, code: RefCode) {
    let tile = match code {
        RefCode::Delta(d) => {
            let last = dict.last().copied().map_or(0, i32::from);
            (last + d) as u16
        }
        RefCode::Ref(i) => dict[dict.len() - 1 - i as usize],
    };
    dict.push(tile);
}

/// Decodes one block payload into `width * height` tiles.
fn decode_block(words: &[u16], width: usize, height: usize) -> Vec<u16> {
    let total = width * height;
    let mut reader = BitReader::new(words);
    let mut dict: Vec<u16> = Vec::with_capacity(total);
    let mut prev: Option<RefCode> = None;
    let mut streak = false;

    while dict.len() < total {
        if streak {
            // Two identical codes in a row promise a repeat count next.
            let count = reader.read_var(DUB_CHUNK_BITS);
            let code = prev.expect("a streak implies a previous code");
            for _ in 0..count {
                apply(&mut dict, code);
            }
            streak = false;
            prev = None;
        } else {
            let code = if reader.read(1) == 1 {
                RefCode::Ref(reader.read_var(DUB_CHUNK_BITS))
            } else {
                let negative = reader.read(1) == 1;
                let magnitude = reader.read_var(DUB_CHUNK_BITS) as i32;
                RefCode::Delta(if negative { -magnitude } else { magnitude })
            };
            apply(&mut dict, code);
            if prev == Some(code) {
                streak = true;
            }
            prev = Some(code);
        }
    }
    dict
}

/// Reference DUB decoder: walks the packed index and reconstructs every
/// frame from the block-data region.
pub fn dub_decode(words: &[u16], layout: &TileLayout, index16: bool) -> Vec<u16> {
    let mut tiles = vec![0u16; layout.tile_count()];
    let mut block = 0usize;

    for f in 0..layout.frames {
        for y0 in (0..layout.height).step_by(BLOCK_SIZE) {
            for x0 in (0..layout.width).step_by(BLOCK_SIZE) {
                let w = BLOCK_SIZE.min(layout.width - x0);
                let h = BLOCK_SIZE.min(layout.height - y0);

                let (entry, next_word) = if index16 {
                    (usize::from(words[block]), block + 1)
                } else {
                    let bytes = words[block / 2].to_le_bytes();
                    (usize::from(bytes[block % 2]), (block + 2) / 2)
                };
                let start = entry + next_word;

                let decoded = decode_block(&words[start..], w, h);
                for y in 0..h {
                    for x in 0..w {
                        tiles[f * layout.width * layout.height + (y0 + y) * layout.width + x0 + x] =
                            decoded[y * w + x];
                    }
                }
                block += 1;
            }
        }
    }
    tiles
}

/// Encodes `tiles`, decodes the assembled words, and asserts an exact
/// reconstruction. Returns the stream for further checks.
pub fn dub_integrity_test(layout: TileLayout, tiles: &[u16]) -> DubStream {
    let stream = DubEncoder::new(layout)
        .encode(tiles)
        .expect("encoding failed");
    let words = stream.words();
    assert_eq!(words.len(), stream.compressed_words());

    let decoded = dub_decode(&words, &layout, stream.is_index16());
    assert_eq!(decoded, tiles, "decode(encode(t)) != t");
    stream
}

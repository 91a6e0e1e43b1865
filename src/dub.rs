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

//! DUB tile-graphics encoder.
//!
//! Losslessly compresses frames of 16-bit tile indices into a blocked,
//! back-referencing bitstream. Each frame is split into 8×8 blocks
//! (clipped at the edges), each block is coded independently with
//! delta, back-reference and run symbols, byte-identical block payloads
//! are stored once, and a packed index of relative word offsets makes
//! every block addressable.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use super::arrayutils::words_to_le_bytes;
use super::bitbuf::BitBuffer;
use super::constant::BLOCK_SIZE;
use super::constant::DUB_CHUNK_BITS;
use super::constant::MAX_STREAM_WORDS;
use super::error::EncodeError;

/// Dimensions of a tile asset, in tiles and frames.
///
/// The on-device decoder receives these, along with the index width, as
/// out-of-band metadata; they are never part of the encoded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    /// Frame width in tiles.
    pub width: usize,
    /// Frame height in tiles.
    pub height: usize,
    /// Number of frames.
    pub frames: usize,
}

impl TileLayout {
    /// Creates a layout.
    pub fn new(width: usize, height: usize, frames: usize) -> Self {
        Self {
            width,
            height,
            frames,
        }
    }

    /// Total number of tiles across all frames.
    pub fn tile_count(&self) -> usize {
        self.width * self.height * self.frames
    }

    /// Number of blocks across all frames.
    pub fn block_count(&self) -> usize {
        ((self.width + BLOCK_SIZE - 1) / BLOCK_SIZE)
            * ((self.height + BLOCK_SIZE - 1) / BLOCK_SIZE)
            * self.frames
    }
}

/// One symbol in a block's bitstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Code {
    /// Signed difference from the newest dictionary tile. With an empty
    /// dictionary the missing entry reads as zero, so the code carries
    /// the literal tile value (large and positive for tiles >= 0x8000).
    Delta(i32),
    /// Back-reference into the dictionary, newest entry first.
    Ref(u32),
    /// Run length; legal only immediately after two identical codes.
    Repeat(u32),
}

/// DUB encoder for assets of one layout.
///
/// # Examples
///
/// ```
/// use dubloon::dub::{DubEncoder, TileLayout};
///
/// let encoder = DubEncoder::new(TileLayout::new(8, 8, 1));
/// let stream = encoder.encode(&[0u16; 64]).unwrap();
/// assert_eq!(stream.words(), vec![0x0000, 0x0840, 0x00EB]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DubEncoder {
    layout: TileLayout,
}

impl DubEncoder {
    /// Creates an encoder for the given layout.
    pub fn new(layout: TileLayout) -> Self {
        Self { layout }
    }

    /// Encodes `tiles`, in row-major then frame-major order, into a
    /// compressed stream.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::TooLarge`] when index plus block data
    /// exceed the 16-bit word address space; nothing is produced.
    ///
    /// # Panics
    ///
    /// Panics when `tiles.len()` differs from the layout's tile count.
    pub fn encode(&self, tiles: &[u16]) -> Result<DubStream, EncodeError> {
        let layout = self.layout;
        assert_eq!(
            tiles.len(),
            layout.tile_count(),
            "tile slice does not match the layout"
        );

        let mut index: Vec<u16> = Vec::with_capacity(layout.block_count());
        let mut block_data: Vec<u16> = Vec::new();
        // Blocks with byte-identical payloads share one address.
        let mut dedupe: HashMap<Vec<u16>, u16> = HashMap::new();

        for f in 0..layout.frames {
            let frame = &tiles[f * layout.width * layout.height..][..layout.width * layout.height];
            for y in (0..layout.height).step_by(BLOCK_SIZE) {
                for x in (0..layout.width).step_by(BLOCK_SIZE) {
                    let w = BLOCK_SIZE.min(layout.width - x);
                    let h = BLOCK_SIZE.min(layout.height - y);
                    let payload = encode_block(&frame[x + y * layout.width..], layout.width, w, h);

                    let addr = match dedupe.get(&payload) {
                        Some(&addr) => addr,
                        None => {
                            let addr = block_data.len() as u16;
                            block_data.extend_from_slice(&payload);
                            dedupe.insert(payload, addr);
                            addr
                        }
                    };
                    index.push(addr);
                }
            }
        }

        let mut stream = DubStream {
            layout,
            index,
            block_data,
            index16: false,
        };
        // Probe the 8-bit index hypothesis; one oversized entry switches
        // the whole index to 16 bits.
        stream.index16 = (0..stream.index.len()).any(|i| stream.packed_entry(i) >= 0x100);

        let words = stream.compressed_words();
        if words >= MAX_STREAM_WORDS {
            return Err(EncodeError::TooLarge { words });
        }

        log::debug!(
            "dub: {} tiles, {} words, {:.1}% compression",
            stream.tile_count(),
            words,
            stream.ratio()
        );
        Ok(stream)
    }
}

/// A compressed DUB stream and its bookkeeping.
#[derive(Clone, Debug)]
pub struct DubStream {
    layout: TileLayout,
    /// Word offset of each block's payload within the block-data region.
    index: Vec<u16>,
    block_data: Vec<u16>,
    index16: bool,
}

impl DubStream {
    /// True when index entries are stored as 16-bit words rather than
    /// packed byte pairs.
    pub fn is_index16(&self) -> bool {
        self.index16
    }

    /// Size of the packed index region in words.
    pub fn index_words(&self) -> usize {
        let s = self.index.len();
        if self.index16 {
            s
        } else {
            (s + 1) / 2
        }
    }

    /// Total compressed size in words.
    pub fn compressed_words(&self) -> usize {
        self.index_words() + self.block_data.len()
    }

    /// Number of source tiles.
    pub fn tile_count(&self) -> usize {
        self.layout.tile_count()
    }

    /// Percentage saved relative to storing the tiles raw.
    pub fn ratio(&self) -> f32 {
        (100.0 - self.compressed_words() as f64 * 100.0 / self.tile_count() as f64) as f32
    }

    /// Logs a one-line compression summary for this stream.
    pub fn log_stats(&self, name: &str) {
        log::info!(
            "{}: {:4} tiles, {:4} words, {:5.1}% compression",
            name,
            self.tile_count(),
            self.compressed_words(),
            self.ratio()
        );
    }

    /// Index entry `i` relocated relative to the word after its slot.
    ///
    /// The decoder adds the stored value back to the position one word
    /// past the slot it read it from, so entries stay small for blocks
    /// near their index position.
    fn packed_entry(&self, i: usize) -> usize {
        let next_word = if self.index16 { i + 1 } else { (i + 2) / 2 };
        self.index_words() + self.index[i] as usize - next_word
    }

    /// Assembles the stream: the packed index region, then block data.
    pub fn words(&self) -> Vec<u16> {
        let mut ret = Vec::with_capacity(self.compressed_words());

        if self.index16 {
            for i in 0..self.index.len() {
                ret.push(self.packed_entry(i) as u16);
            }
        } else {
            let mut packed: Vec<u8> = (0..self.index.len())
                .map(|i| self.packed_entry(i) as u8)
                .collect();
            if packed.len() % 2 == 1 {
                packed.push(0);
            }
            for pair in packed.chunks_exact(2) {
                ret.push(u16::from(pair[0]) | u16::from(pair[1]) << 8);
            }
        }
        debug_assert_eq!(ret.len(), self.index_words());

        ret.extend_from_slice(&self.block_data);
        ret
    }

    /// Assembles the stream as little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        words_to_le_bytes(&self.words())
    }
}

/// Encodes one block into a standalone word payload.
///
/// `tiles` starts at the block's top-left corner and rows are `stride`
/// tiles apart; the block itself is `width` x `height`.
fn encode_block(tiles: &[u16], stride: usize, width: usize, height: usize) -> Vec<u16> {
    let mut bits = BitBuffer::new();
    let mut data = Vec::new();
    let mut dict: Vec<u16> = Vec::with_capacity(width * height);
    let mut prev_code: Option<Code> = None;
    let mut repeat_count = 0u32;
    let mut repeating = false;

    for y in 0..height {
        for x in 0..width {
            let tile = tiles[x + y * stride];

            let code = find_best_code(&dict, tile);
            dict.push(tile);

            // Two identical codes in a row open a run; the stream then
            // owes the decoder a REPEAT count before anything else.
            let same_code = prev_code == Some(code);
            prev_code = Some(code);

            if repeating {
                if same_code {
                    // Extending an existing run.
                    repeat_count += 1;
                    continue;
                }
                // Break the run.
                pack_code(Code::Repeat(repeat_count), &mut bits);
                bits.flush(&mut data);
                repeating = false;
            } else if same_code {
                // Beginning a run. The code after this one is a REPEAT.
                repeating = true;
                repeat_count = 0;
            }

            pack_code(code, &mut bits);
            bits.flush(&mut data);
        }
    }

    if repeating {
        // Flush the final stowed-away REPEAT.
        pack_code(Code::Repeat(repeat_count), &mut bits);
    }

    bits.finish(&mut data);
    data
}

/// Picks the cheapest code for `tile` against the current dictionary.
fn find_best_code(dict: &[u16], tile: u16) -> Code {
    // DELTA from the newest entry; an empty dictionary reads as zero,
    // which makes the code a literal.
    let delta = dict
        .last()
        .map_or(i32::from(tile), |&last| i32::from(tile) - i32::from(last));
    let mut code = Code::Delta(delta);
    let mut best_length = code_len(code);

    // An identical tile in the history may be cheaper as a REF, which
    // also wins ties. Older matches only cost more bits, so the first
    // one settles it.
    for (i, &entry) in dict.iter().rev().enumerate() {
        if entry == tile {
            let candidate = Code::Ref(i as u32);
            if code_len(candidate) <= best_length {
                code = candidate;
            }
            break;
        }
    }

    code
}

/// Packs one code into the bit buffer.
fn pack_code(code: Code, bits: &mut BitBuffer) {
    match code {
        Code::Delta(value) => {
            // Type bit, sign bit, magnitude.
            bits.append(0, 1);
            if value < 0 {
                bits.append(1, 1);
                bits.append_var(value.unsigned_abs(), DUB_CHUNK_BITS);
            } else {
                bits.append(0, 1);
                bits.append_var(value as u32, DUB_CHUNK_BITS);
            }
        }
        Code::Ref(value) => {
            // Type bit, backref distance.
            bits.append(1, 1);
            bits.append_var(value, DUB_CHUNK_BITS);
        }
        Code::Repeat(value) => {
            // Count only; the preceding code pair implies the type.
            bits.append_var(value, DUB_CHUNK_BITS);
        }
    }
}

/// Packed size of a code in bits, measured without emitting it.
fn code_len(code: Code) -> usize {
    let mut bits = BitBuffer::new();
    pack_code(code, &mut bits);
    bits.bit_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper;

    use rstest::rstest;

    #[test]
    fn code_lengths_favor_short_refs() {
        assert_eq!(code_len(Code::Delta(0)), 6);
        assert_eq!(code_len(Code::Ref(0)), 5);
        assert_eq!(code_len(Code::Ref(7)), 5);
        assert_eq!(code_len(Code::Ref(8)), 9);
        assert_eq!(code_len(Code::Delta(-7)), 6);
        assert_eq!(code_len(Code::Delta(8)), 10);
        assert_eq!(code_len(Code::Repeat(62)), 8);
    }

    #[test]
    fn ref_beats_delta_on_ties() {
        // Tile 5 is both the newest entry (DELTA 0, 6 bits) and a match
        // at distance 0 (REF 0, 5 bits).
        assert_eq!(find_best_code(&[5], 5), Code::Ref(0));
        // A literal DELTA when nothing matches.
        assert_eq!(find_best_code(&[], 9), Code::Delta(9));
        // Only the most recent match is considered.
        assert_eq!(find_best_code(&[3, 7, 3, 9], 3), Code::Ref(1));
    }

    #[test]
    fn empty_dictionary_delta_is_a_positive_literal() {
        assert_eq!(find_best_code(&[], 0x8000), Code::Delta(0x8000));
    }

    #[test]
    fn single_zero_block() {
        // Codes: DELTA 0, REF 0, REF 0 (run opens), REPEAT 61.
        let stream = DubEncoder::new(TileLayout::new(8, 8, 1))
            .encode(&[0u16; 64])
            .unwrap();
        assert!(!stream.is_index16());
        assert_eq!(stream.index_words(), 1);
        assert_eq!(stream.compressed_words(), 3);
        assert_eq!(stream.words(), vec![0x0000, 0x0840, 0x00EB]);
        assert_eq!(stream.tile_count(), 64);
    }

    #[test]
    fn identical_blocks_share_a_payload() {
        // Two 8x8 halves with the same content dedupe to one payload;
        // both index entries resolve to the same address.
        let layout = TileLayout::new(16, 8, 1);
        let mut tiles = vec![0u16; layout.tile_count()];
        for y in 0..8 {
            for x in 0..16 {
                tiles[y * 16 + x] = 7;
            }
        }
        let stream = DubEncoder::new(layout).encode(&tiles).unwrap();
        assert_eq!(stream.index, vec![0, 0]);
        assert_eq!(stream.words(), vec![0x0000, 0x0878, 0x00EB]);
    }

    #[test]
    fn repeated_rows_become_backrefs() {
        // Row 1 repeats row 0, so each of its tiles is found eight
        // entries back (REF 7), and the REF run collapses to a REPEAT.
        let mut tiles = vec![0u16; 64];
        for x in 0..8 {
            tiles[x] = (10 + 10 * x) as u16;
            tiles[8 + x] = (10 + 10 * x) as u16;
        }
        for y in 2..8 {
            for x in 0..8 {
                tiles[y * 8 + x] = (1000 + y * 8 + x) as u16;
            }
        }
        let stream = DubEncoder::new(TileLayout::new(8, 8, 1))
            .encode(&tiles)
            .unwrap();
        let decoded =
            test_helper::dub_decode(&stream.words(), &TileLayout::new(8, 8, 1), stream.is_index16());
        assert_eq!(decoded, tiles);
    }

    #[test]
    fn zero_frames_encode_to_nothing() {
        let stream = DubEncoder::new(TileLayout::new(8, 8, 0)).encode(&[]).unwrap();
        assert_eq!(stream.index_words(), 0);
        assert_eq!(stream.compressed_words(), 0);
        assert!(stream.words().is_empty());
        assert!(stream.to_bytes().is_empty());
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(5, 3, 1)]
    #[case(8, 8, 1)]
    #[case(9, 17, 2)]
    #[case(16, 16, 3)]
    #[case(31, 13, 2)]
    fn round_trips_random_frames(#[case] width: usize, #[case] height: usize, #[case] frames: usize) {
        let layout = TileLayout::new(width, height, frames);
        let tiles = test_helper::random_tiles(layout.tile_count(), 0xFFFF);
        let stream = test_helper::dub_integrity_test(layout, &tiles);
        assert_eq!(stream.index.len(), layout.block_count());
    }

    #[test]
    fn byte_serialization_round_trips() {
        let layout = TileLayout::new(12, 9, 2);
        let tiles = test_helper::random_tiles(layout.tile_count(), 0x200);
        let stream = DubEncoder::new(layout).encode(&tiles).unwrap();

        let words = crate::arrayutils::le_bytes_to_words(&stream.to_bytes());
        assert_eq!(words, stream.words());
        assert_eq!(
            test_helper::dub_decode(&words, &layout, stream.is_index16()),
            tiles
        );
    }

    #[test]
    fn round_trips_structured_frames() {
        // Gradients and flat spans exercise DELTA runs and REFs.
        let layout = TileLayout::new(24, 24, 2);
        let mut tiles = vec![0u16; layout.tile_count()];
        for f in 0..2 {
            for y in 0..24 {
                for x in 0..24 {
                    let v = if y % 3 == 0 { 40 } else { (x + 2 * y + 100 * f) as u16 };
                    tiles[f * 576 + y * 24 + x] = v;
                }
            }
        }
        test_helper::dub_integrity_test(layout, &tiles);
    }

    #[test]
    fn wide_offsets_switch_the_index_to_16_bits() {
        let layout = TileLayout::new(64, 64, 5);
        let tiles = test_helper::random_tiles(layout.tile_count(), 0xFFFF);
        let stream = test_helper::dub_integrity_test(layout, &tiles);
        assert!(stream.is_index16());
        assert_eq!(stream.index_words(), layout.block_count());
    }

    #[test]
    fn index_width_matches_the_8bit_probe() {
        // The probe decides: 16-bit iff some entry would not fit a byte.
        for (width, height, frames) in [(8, 8, 1), (32, 32, 2), (64, 64, 5)] {
            let layout = TileLayout::new(width, height, frames);
            let tiles = test_helper::random_tiles(layout.tile_count(), 0xFFFF);
            let stream = DubEncoder::new(layout).encode(&tiles).unwrap();

            let mut probe = stream.clone();
            probe.index16 = false;
            let overflows =
                (0..probe.index.len()).any(|i| probe.packed_entry(i) >= 0x100);
            assert_eq!(stream.is_index16(), overflows);
        }
    }

    #[test]
    fn oversized_streams_are_rejected() {
        let layout = TileLayout::new(128, 128, 5);
        let tiles = test_helper::random_tiles(layout.tile_count(), 0xFFFF);
        match DubEncoder::new(layout).encode(&tiles) {
            Err(EncodeError::TooLarge { words }) => assert!(words >= MAX_STREAM_WORDS),
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let layout = TileLayout::new(40, 24, 2);
        let tiles = test_helper::random_tiles(layout.tile_count(), 500);
        let a = DubEncoder::new(layout).encode(&tiles).unwrap();
        let b = DubEncoder::new(layout).encode(&tiles).unwrap();
        assert_eq!(a.words(), b.words());
    }

    #[test]
    fn ratio_reports_percentage_saved() {
        let stream = DubEncoder::new(TileLayout::new(8, 8, 1))
            .encode(&[0u16; 64])
            .unwrap();
        // 3 words for 64 tiles.
        assert!((stream.ratio() - 95.3125).abs() < 1e-4);
    }
}

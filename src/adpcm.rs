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

//! ADPCM-A audio encoder.
//!
//! Compresses 16-bit little-endian mono PCM to four bits per sample.
//! This is not quite standard IMA ADPCM: candidate deltas are computed
//! with the multiply-and-shift sequence the target decoder executes, so
//! the rounding differs and the two predictors stay in lockstep.
//!
//! The stream starts with a 3-byte header carrying the initial predictor
//! value and step index. In the long run the initial conditions only
//! have to match between encoder and decoder, but bad ones can take
//! dozens of samples to converge, so [`encode`] searches for the pair
//! that minimizes prediction error over the head of the stream.

use super::constant::ADPCM_HEADER_SIZE;
use super::constant::CODE_TABLE;
use super::constant::INDEX_MAX;
use super::constant::OPTIMIZER_PREFIX_BYTES;
use super::constant::STEP_SIZE_TABLE;

/// Predictor state threaded through every encoded sample; the starting
/// values are also written out as the stream header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct State {
    sample: i32,
    index: i32,
}

/// Encodes a PCM byte stream to ADPCM-A.
///
/// Trailing bytes that do not complete a 16-bit sample are discarded.
/// An odd number of samples duplicates the final sample to fill the
/// last packed byte.
///
/// # Examples
///
/// ```
/// let encoded = dubloon::adpcm::encode(&[0u8; 200]);
/// assert_eq!(encoded.len(), 3 + 50);
/// assert_eq!(&encoded[..3], &[0, 0, 0]);
/// ```
pub fn encode(input: &[u8]) -> Vec<u8> {
    encode_with_error(input).0
}

/// Encodes like [`encode`], also returning the summed squared
/// prediction error of the stream (the difference between the decoder's
/// predictor and the input after each sample, squared, as a 64-bit sum).
pub fn encode_with_error(input: &[u8]) -> (Vec<u8>, u64) {
    let state = optimize_initial_conditions(input);
    let mut out = Vec::new();
    let error = encode_from(state, input, input.len(), &mut out);
    (out, error)
}

/// Finds the initial conditions that minimize prediction error over the
/// head of the stream.
///
/// The step index is highly nonlinear, so a hill climber alone finds
/// terrible local minima; every index value is tried first, and the
/// climber then refines both coordinates from the best of those.
fn optimize_initial_conditions(input: &[u8]) -> State {
    // Too short to bother; also keeps the prefix at least one pair.
    if input.len() < 4 {
        return State { sample: 0, index: 0 };
    }

    let mut state = State {
        sample: i32::from(i16::from_le_bytes([input[0], input[1]])),
        index: 0,
    };

    let prefix_bytes = OPTIMIZER_PREFIX_BYTES.min(input.len());
    let mut scratch = Vec::new();

    let mut error = u64::MAX;
    let mut best_index = 0;
    for index in 0..=INDEX_MAX {
        state.index = index;
        let next_error = encode_from(state, input, prefix_bytes, &mut scratch);
        if next_error < error {
            error = next_error;
            best_index = index;
        }
    }
    state.index = best_index;

    // Unit moves along each axis, accepted only on strict improvement;
    // stop once no single move helps.
    loop {
        state.sample += 1;
        let next_error = encode_from(state, input, prefix_bytes, &mut scratch);
        if next_error < error {
            error = next_error;
            continue;
        }
        state.sample -= 2;
        let next_error = encode_from(state, input, prefix_bytes, &mut scratch);
        if next_error < error {
            error = next_error;
            continue;
        }
        state.sample += 1;

        if state.index < INDEX_MAX {
            state.index += 1;
            let next_error = encode_from(state, input, prefix_bytes, &mut scratch);
            if next_error < error {
                error = next_error;
                continue;
            }
            state.index -= 1;
        }

        if state.index > 0 {
            state.index -= 1;
            let next_error = encode_from(state, input, prefix_bytes, &mut scratch);
            if next_error < error {
                error = next_error;
                continue;
            }
            state.index += 1;
        }

        break;
    }

    state
}

/// Encodes the first `in_bytes` bytes of PCM from the given initial
/// conditions, rewriting `out` and returning the summed squared
/// prediction error.
fn encode_from(mut state: State, input: &[u8], in_bytes: usize, out: &mut Vec<u8>) -> u64 {
    debug_assert!(in_bytes <= input.len());
    let num_samples = in_bytes / 2;
    let num_pairs = num_samples / 2;

    out.clear();
    out.reserve(num_pairs + ADPCM_HEADER_SIZE);

    // Initial-conditions header.
    out.push(state.sample as u8);
    out.push((state.sample >> 8) as u8);
    out.push(state.index as u8);

    let sample_at =
        |t: usize| i32::from(i16::from_le_bytes([input[2 * t], input[2 * t + 1]]));

    let mut error = 0u64;
    for pair in 0..num_pairs {
        error += encode_pair(&mut state, sample_at(2 * pair), sample_at(2 * pair + 1), out);
    }

    // Doubled final sample?
    if num_samples % 2 == 1 {
        let s = sample_at(num_samples - 1);
        error += encode_pair(&mut state, s, s, out);
    }

    error
}

/// Encodes two samples into one packed byte, first sample in the low
/// nybble, and returns their squared prediction errors.
fn encode_pair(state: &mut State, s1: i32, s2: i32, out: &mut Vec<u8>) -> u64 {
    let n1 = encode_sample(state, s1);
    let e1 = i64::from(state.sample - s1);
    let n2 = encode_sample(state, s2);
    let e2 = i64::from(state.sample - s2);

    out.push(n1 | (n2 << 4));

    (e1 * e1 + e2 * e2) as u64
}

/// Encodes a single sample to a 4-bit code, updating the predictor.
fn encode_sample(state: &mut State, sample: i32) -> u8 {
    let step = u32::from(STEP_SIZE_TABLE[state.index as usize]);
    let prev_sample = state.sample;
    let diff = sample - prev_sample;

    // Closest candidate wins; ties go to the later code.
    let mut best_code = 0usize;
    let mut best_delta = 0x0010_0000i32;
    for code in 0..CODE_TABLE.len() {
        let this_delta = candidate_delta(code, step);
        let this_error = (this_delta - diff).max(diff - this_delta);
        let best_error = (best_delta - diff).max(diff - best_delta);
        if this_error <= best_error {
            best_delta = this_delta;
            best_code = code;
        }
    }

    state.sample = (prev_sample + best_delta).clamp(-32768, 32767);
    state.index = (state.index + index_adjust(best_code)).clamp(0, INDEX_MAX);

    best_code as u8
}

/// The decoder's delta for `code` at step size `step`.
///
/// The multiplier is the code-table low byte as a signed 8-bit value,
/// widened to unsigned 32 bits; the wrapping multiply and the final
/// arithmetic shift reproduce the target's shift-and-multiply sequence
/// exactly, including its rounding toward negative infinity.
#[inline]
pub(crate) fn candidate_delta(code: usize, step: u32) -> i32 {
    let multiplier = CODE_TABLE[code] as u8 as i8;
    ((multiplier as i32 as u32).wrapping_mul(step) as i32) >> 3
}

/// Step-index adjustment for `code`: the code-table word shifted right
/// arithmetically past the multiplier byte.
#[inline]
pub(crate) fn index_adjust(code: usize) -> i32 {
    (CODE_TABLE[code] as i32) >> 8
}

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

//! Bit accumulator for variable-length DUB output.

/// Accumulator producing little-endian 16-bit words.
///
/// Fields are placed at the current fill level, lowest accumulator bits
/// first, so the earliest appended bit lands in bit 0 of the first
/// flushed word. The on-device reader refills its shift register the
/// same way (`buffer |= word << count`) and extracts from the low end,
/// which makes the two ends bit-exact mirrors of each other.
#[derive(Clone, Debug, Default)]
pub struct BitBuffer {
    acc: u64,
    count: usize,
}

impl BitBuffer {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits currently buffered.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.count
    }

    /// Appends the low `width` bits of `value`.
    ///
    /// `width` must be at most 32, and the accumulator must have room;
    /// callers keep it drained with [`flush`](Self::flush).
    #[inline]
    pub fn append(&mut self, value: u32, width: usize) {
        debug_assert!(width <= 32);
        debug_assert!(self.count + width <= 64);

        let masked = u64::from(value) & ((1u64 << width) - 1);
        self.acc |= masked << self.count;
        self.count += width;
    }

    /// Appends `value` as a variable-length unsigned integer.
    ///
    /// The value is split into `chunk`-bit groups, least-significant
    /// group first; each group is preceded by a continuation bit (1 =
    /// more groups follow). At least one group is always emitted.
    pub fn append_var(&mut self, value: u32, chunk: usize) {
        let mut value = value;
        loop {
            let group = value & ((1 << chunk) - 1);
            value >>= chunk;
            if value != 0 {
                self.append(1, 1);
                self.append(group, chunk);
            } else {
                self.append(0, 1);
                self.append(group, chunk);
                break;
            }
        }
    }

    /// Moves all whole 16-bit words out of the accumulator into `out`.
    #[inline]
    pub fn flush(&mut self, out: &mut Vec<u16>) {
        while self.count >= 16 {
            out.push((self.acc & 0xFFFF) as u16);
            self.acc >>= 16;
            self.count -= 16;
        }
    }

    /// Flushes everything, zero-padding trailing bits to a full word.
    pub fn finish(&mut self, out: &mut Vec<u16>) {
        self.flush(out);
        if self.count > 0 {
            out.push((self.acc & 0xFFFF) as u16);
            self.acc = 0;
            self.count = 0;
        }
    }
}

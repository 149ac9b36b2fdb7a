//! Reference arithmetic decoding engine (9.3.3.2), used only to check the
//! encoder's output.

use super::cabac_contexts::*;
use super::cabac_tables::*;

pub struct CabacDecoder<'a> {
    data: &'a [u8],
    bit_pos: usize,
    range: u32,
    offset: u32,
    pub contexts: ContextArray,
}

impl<'a> CabacDecoder<'a> {
    pub fn new(data: &'a [u8]) -> CabacDecoder<'a> {
        let mut dec = CabacDecoder {
            data,
            bit_pos: 0,
            range: 510,
            offset: 0,
            contexts: [0; NUM_CONTEXTS],
        };
        dec.offset = dec.read_bits(9);
        dec
    }

    fn read_bit(&mut self) -> u32 {
        let byte = self.data.get(self.bit_pos / 8).copied().unwrap_or(0);
        self.bit_pos += 1;
        ((byte >> (7 - (self.bit_pos - 1) % 8)) & 1) as u32
    }

    fn read_bits(&mut self, n: u32) -> u32 {
        (0..n).fold(0, |v, _| (v << 1) | self.read_bit())
    }

    fn renorm(&mut self) {
        while self.range < 256 {
            self.range <<= 1;
            self.offset = (self.offset << 1) | self.read_bit();
        }
    }

    pub fn decode_decision(&mut self, ctx: usize) -> bool {
        let state = self.contexts[ctx];
        let mut sigma = state_index(state);
        let mut mps = state_mps(state);
        let range_lps = RANGE_LPS[sigma][((self.range >> 6) & 3) as usize] as u32;
        self.range -= range_lps;
        let bin = if self.offset >= self.range {
            self.offset -= self.range;
            self.range = range_lps;
            if sigma == 0 {
                mps = 1 - mps;
            }
            sigma = TRANS_IDX_LPS[sigma] as usize;
            1 - state_mps(state)
        } else {
            sigma = (sigma + 1).min(62);
            mps
        };
        self.contexts[ctx] = ((sigma as u8) << 1) | mps;
        self.renorm();
        bin == 1
    }

    pub fn decode_bypass(&mut self) -> bool {
        self.offset = (self.offset << 1) | self.read_bit();
        if self.offset >= self.range {
            self.offset -= self.range;
            true
        } else {
            false
        }
    }

    pub fn decode_terminate(&mut self) -> bool {
        self.range -= 2;
        if self.offset >= self.range {
            true
        } else {
            self.renorm();
            false
        }
    }

    pub fn decode_ue_bypass(&mut self, exp_bits: u32) -> u32 {
        let mut k = exp_bits;
        let mut v = 0u64;
        while self.decode_bypass() {
            v += 1 << k;
            k += 1;
        }
        for i in (0..k).rev() {
            v += (self.decode_bypass() as u64) << i;
        }
        v as u32
    }

    /// Byte offset following the last bit read; after a terminating bin of 1
    /// this is where raw pcm bytes start.
    pub fn byte_position(&self) -> usize {
        (self.bit_pos + 7) / 8
    }

    /// Re-initializes the engine at byte `pos`, keeping the contexts.
    pub fn restart(&mut self, pos: usize) {
        self.bit_pos = pos * 8;
        self.range = 510;
        self.offset = self.read_bits(9);
    }
}

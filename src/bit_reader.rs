/// MSB-first reader over an RBSP. Reads past the end yield zero bits.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader { data, pos: 0 }
    }

    #[inline(always)]
    pub fn read1(&mut self) -> u32 {
        let byte = self.data.get(self.pos / 8).copied().unwrap_or(0);
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        bit as u32
    }

    pub fn read_bits(&mut self, count: u32) -> u32 {
        assert!(count <= 32, "read_bits: {count} bits requested, at most 32");
        let mut v = 0u64;
        for _ in 0..count {
            v = (v << 1) | self.read1() as u64;
        }
        v as u32
    }

    pub fn read_ue(&mut self) -> u32 {
        let mut zeros = 0;
        while self.read1() == 0 {
            zeros += 1;
            if zeros > 32 {
                panic!("read_ue: malformed Exp-Golomb code");
            }
        }
        let suffix = self.read_bits(zeros) as u64;
        ((1u64 << zeros) + suffix - 1) as u32
    }

    pub fn read_se(&mut self) -> i32 {
        let code = self.read_ue() as i64;
        if code & 1 == 1 {
            ((code + 1) / 2) as i32
        } else {
            (-(code / 2)) as i32
        }
    }

    pub fn read_te(&mut self, x: i32) -> u32 {
        if x == 1 {
            1 - self.read1()
        } else if x > 1 {
            self.read_ue()
        } else {
            0
        }
    }

    pub fn skip(&mut self, bits: usize) {
        self.pos += bits;
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len() * 8
    }

    pub fn skip_to_byte(&mut self) {
        self.pos = (self.pos + 7) & !7;
    }

    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    pub fn bit_position(&self) -> usize {
        self.pos
    }

    pub fn bits_left(&self) -> isize {
        (self.data.len() * 8) as isize - self.pos as isize
    }

    /// Remaining bytes from the current (aligned) position.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        debug_assert!(self.is_aligned());
        let start = (self.pos / 8).min(self.data.len());
        &self.data[start..]
    }

    pub fn advance_bytes(&mut self, n: usize) {
        self.pos += 8 * n;
    }
}

use super::common::*;

/// MSB-first bit packer writing into a caller-owned region.
///
/// Bits collect in a 64-bit accumulator and are stored as big-endian 32-bit
/// words whenever at least 32 of them are live, so the output is the same on
/// every target. The writer never allocates: running past the end of the
/// region is a contract violation and panics at the offending call.
pub struct BitWriter<'a> {
    buf: &'a mut [u8],
    start: usize,
    pos: usize,
    cur_bits: u64,
    live: u32,
}

impl<'a> BitWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> BitWriter<'a> {
        BitWriter::with_offset(buf, 0)
    }

    /// Starts writing at byte `offset`; bytes before it are left untouched.
    pub fn with_offset(buf: &'a mut [u8], offset: usize) -> BitWriter<'a> {
        assert!(offset <= buf.len(), "bit writer offset past end of buffer");
        BitWriter {
            buf,
            start: offset,
            pos: offset,
            cur_bits: 0,
            live: 0,
        }
    }

    #[inline(always)]
    fn store(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        let Some(dst) = self.buf.get_mut(self.pos..end) else {
            panic!(
                "bitstream overflow: {} bytes requested, {} available",
                end - self.start,
                self.buf.len() - self.start
            );
        };
        dst.copy_from_slice(bytes);
        self.pos = end;
    }

    /// Writes the low `count` bits of `value`, most significant first.
    #[inline(always)]
    pub fn write_bits(&mut self, count: u32, value: u32) {
        assert!(count <= 32, "write_bits: {count} bits requested, at most 32");
        if count == 0 {
            return;
        }
        let value = value as u64 & ((1u64 << count) - 1);
        self.cur_bits = (self.cur_bits << count) | value;
        self.live += count;
        if self.live >= 32 {
            let word = (self.cur_bits >> (self.live - 32)) as u32;
            self.store(&word.to_be_bytes());
            self.live -= 32;
        }
    }

    #[inline(always)]
    pub fn write1(&mut self, bit: bool) {
        self.cur_bits = (self.cur_bits << 1) | bit as u64;
        self.live += 1;
        if self.live == 32 {
            let word = self.cur_bits as u32;
            self.store(&word.to_be_bytes());
            self.live = 0;
        }
    }

    /// Unsigned Exp-Golomb: `v + 1` in `2n - 1` bits where `n = bit_length(v + 1)`.
    pub fn write_ue(&mut self, v: u32) {
        if v == 0 {
            self.write1(true);
            return;
        }
        let code = v as u64 + 1;
        let n = bit_length(code);
        if 2 * n - 1 <= 32 {
            self.write_bits(2 * n - 1, code as u32);
        } else {
            self.write_bits(n - 1, 0);
            // n == 33 only for v == u32::MAX, whose leading 1 is implied below
            if n > 32 {
                self.write1(true);
            }
            self.write_bits(n.min(32), code as u32);
        }
    }

    pub fn write_se(&mut self, v: i32) {
        self.write_ue(se_to_ue(v));
    }

    /// Truncated Exp-Golomb with range `x`.
    pub fn write_te(&mut self, x: i32, v: u32) {
        if x == 1 {
            self.write1(v & 1 == 0);
        } else if x > 1 {
            self.write_ue(v);
        }
    }

    /// Stores every complete byte held in the accumulator.
    pub fn flush(&mut self) {
        while self.live >= 8 {
            let byte = (self.cur_bits >> (self.live - 8)) as u8;
            self.store(&[byte]);
            self.live -= 8;
        }
    }

    pub fn align_zero(&mut self) {
        let pad = (8 - self.live % 8) % 8;
        self.write_bits(pad, 0);
        self.flush();
    }

    pub fn align_one(&mut self) {
        let pad = (8 - self.live % 8) % 8;
        self.write_bits(pad, (1 << pad) - 1);
        self.flush();
    }

    /// rbsp_stop_one_bit followed by rbsp_alignment_zero_bits.
    pub fn rbsp_trailing(&mut self) {
        self.write1(true);
        self.align_zero();
    }

    #[inline(always)]
    pub fn is_aligned(&self) -> bool {
        self.live % 8 == 0
    }

    /// Total bits written since the writer was created.
    #[inline(always)]
    pub fn bit_position(&self) -> usize {
        8 * (self.pos - self.start) + self.live as usize
    }

    /// Index into the whole buffer of the byte following the complete bytes
    /// written so far.
    pub fn byte_offset(&self) -> usize {
        self.pos + self.live as usize / 8
    }

    /// Copies raw bytes at a byte boundary.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        assert!(self.is_aligned(), "write_bytes requires byte alignment");
        self.flush();
        self.store(bytes);
    }

    pub fn written(&self) -> &[u8] {
        &self.buf[self.start..self.pos]
    }

    /// Hands the region back together with the offset just past the last
    /// stored byte. Pending bits must have been aligned.
    pub fn into_inner(mut self) -> (&'a mut [u8], usize) {
        assert!(self.is_aligned(), "into_inner requires byte alignment");
        self.flush();
        (self.buf, self.pos)
    }
}

#[inline(always)]
pub fn se_to_ue(v: i32) -> u32 {
    let v = v as i64;
    (if v <= 0 { -2 * v } else { 2 * v - 1 }) as u32
}

pub fn size_ue(v: u32) -> u32 {
    2 * bit_length(v as u64 + 1) - 1
}

pub fn size_se(v: i32) -> u32 {
    size_ue(se_to_ue(v))
}

pub fn size_te(x: i32, v: u32) -> u32 {
    if x == 1 {
        1
    } else if x > 1 {
        size_ue(v)
    } else {
        0
    }
}

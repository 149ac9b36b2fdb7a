use super::bit_writer::*;
use super::cabac_contexts::*;
use super::cabac_tables::*;
use super::common::*;
use super::rd_cost::*;
use debug_print::*;

/// Bin-level interface shared by the arithmetic coder and the cost estimator,
/// so syntax writers are written once and run in either mode.
pub trait CabacSink {
    fn encode_decision(&mut self, ctx: usize, bin: bool);
    /// Same as `encode_decision` for real output; cost-only sinks leave the
    /// context untouched.
    fn encode_decision_noup(&mut self, ctx: usize, bin: bool);
    fn encode_bypass(&mut self, bin: bool);
    /// Terminating bin with value 0.
    fn encode_terminal(&mut self);
    fn encode_ue_bypass(&mut self, exp_bits: u32, val: u32);
    fn contexts(&self) -> &ContextArray;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CabacPhase {
    Initialized,
    Encoding,
    Flushed,
}

/// H.264 arithmetic encoder (9.3.4) writing into a caller-owned region.
///
/// `low` keeps `queue + 10` pending bits. Whole bytes leave it as soon as
/// they are known, except runs of 0xff which are only counted in
/// `bytes_outstanding` until a later byte tells whether a carry ripples
/// through them.
pub struct CabacEncoder<'a> {
    buf: &'a mut [u8],
    start: usize,
    pos: usize,
    low: u32,
    range: u32,
    queue: i32,
    bytes_outstanding: usize,
    pub contexts: ContextArray,
    phase: CabacPhase,
    #[cfg(test)]
    max_outstanding: usize,
}

impl<'a> CabacEncoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> CabacEncoder<'a> {
        CabacEncoder::with_offset(buf, 0)
    }

    pub fn with_offset(buf: &'a mut [u8], offset: usize) -> CabacEncoder<'a> {
        assert!(offset <= buf.len(), "cabac offset past end of buffer");
        CabacEncoder {
            buf,
            start: offset,
            pos: offset,
            low: 0,
            range: 0x1fe,
            queue: -9,
            bytes_outstanding: 0,
            contexts: [0; NUM_CONTEXTS],
            phase: CabacPhase::Initialized,
            #[cfg(test)]
            max_outstanding: 0,
        }
    }

    /// Continues in the region of `writer` right after the bits it holds,
    /// typically a slice header terminated by cabac_alignment_one_bit.
    pub fn resume(writer: BitWriter<'a>) -> CabacEncoder<'a> {
        let (buf, offset) = writer.into_inner();
        CabacEncoder::with_offset(buf, offset)
    }

    pub fn context_init(&mut self, slice_type: SliceType, qp: i32, cabac_init_idc: usize) {
        context_init(&mut self.contexts, slice_type, qp, cabac_init_idc);
    }

    pub fn phase(&self) -> CabacPhase {
        self.phase
    }

    #[inline(always)]
    fn begin(&mut self) {
        if self.phase == CabacPhase::Flushed {
            panic!("cabac encoder used after flush without restart");
        }
        self.phase = CabacPhase::Encoding;
    }

    #[inline(always)]
    fn store(&mut self, byte: u8) {
        let Some(dst) = self.buf.get_mut(self.pos) else {
            panic!(
                "cabac output overflow: region of {} bytes exhausted",
                self.buf.len() - self.start
            );
        };
        *dst = byte;
        self.pos += 1;
    }

    #[inline(always)]
    fn put_byte(&mut self) {
        if self.queue < 0 {
            return;
        }
        let out = self.low >> (self.queue + 10);
        self.low &= (0x400u32 << self.queue) - 1;
        self.queue -= 8;
        if out & 0xff == 0xff {
            self.bytes_outstanding += 1;
            #[cfg(test)]
            {
                self.max_outstanding = self.max_outstanding.max(self.bytes_outstanding);
            }
        } else {
            let carry = out >> 8;
            if carry != 0 {
                assert!(self.pos > self.start, "cabac carry before the first byte");
                self.buf[self.pos - 1] = self.buf[self.pos - 1].wrapping_add(1);
            }
            let fill = (carry as u8).wrapping_sub(1);
            for _ in 0..self.bytes_outstanding {
                self.store(fill);
            }
            self.store(out as u8);
            self.bytes_outstanding = 0;
        }
    }

    #[inline(always)]
    fn renorm(&mut self) {
        let shift = self.range.leading_zeros() - 23;
        self.range <<= shift;
        self.low <<= shift;
        self.queue += shift as i32;
        self.put_byte();
    }

    #[inline(always)]
    pub fn encode_decision(&mut self, ctx: usize, bin: bool) {
        assert!(ctx < NUM_CONTEXTS, "context index {ctx} out of range");
        self.begin();
        let state = self.contexts[ctx];
        let range_lps = RANGE_LPS[state_index(state)][((self.range >> 6) & 3) as usize] as u32;
        self.range -= range_lps;
        if bin as u8 != state_mps(state) {
            self.low += self.range;
            self.range = range_lps;
        }
        self.contexts[ctx] = cabac_transition[state as usize][bin as usize];
        self.renorm();
    }

    #[inline(always)]
    pub fn encode_bypass(&mut self, bin: bool) {
        self.begin();
        self.low <<= 1;
        if bin {
            self.low += self.range;
        }
        self.queue += 1;
        self.put_byte();
    }

    pub fn encode_terminal(&mut self) {
        self.begin();
        self.range -= 2;
        self.renorm();
    }

    /// k-th order Exp-Golomb suffix of large coefficient levels and mvds.
    pub fn encode_ue_bypass(&mut self, exp_bits: u32, val: u32) {
        let v = val as u64 + (1u64 << exp_bits);
        let n = bit_length(v) - 1;
        for _ in exp_bits..n {
            self.encode_bypass(true);
        }
        self.encode_bypass(false);
        for i in (0..n).rev() {
            self.encode_bypass((v >> i) & 1 == 1);
        }
    }

    /// Codes a terminating bin of 1 and emits everything still pending.
    /// The output is then byte aligned.
    pub fn flush(&mut self) {
        self.begin();
        self.low += self.range - 2;
        self.low |= 1;
        self.low <<= 9;
        self.queue += 9;
        self.put_byte();
        self.put_byte();
        self.low <<= -self.queue;
        self.queue = 0;
        self.put_byte();
        while self.bytes_outstanding > 0 {
            self.store(0xff);
            self.bytes_outstanding -= 1;
        }
        self.phase = CabacPhase::Flushed;
        debug_eprintln!("cabac flush at byte {}", self.pos - self.start);
    }

    /// Copies raw bytes (pcm samples) after a flush.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        assert_eq!(self.phase, CabacPhase::Flushed, "raw bytes need a flushed cabac encoder");
        let end = self.pos + bytes.len();
        let Some(dst) = self.buf.get_mut(self.pos..end) else {
            panic!(
                "cabac output overflow: region of {} bytes exhausted",
                self.buf.len() - self.start
            );
        };
        dst.copy_from_slice(bytes);
        self.pos = end;
    }

    /// Re-initializes the arithmetic engine after raw bytes. Contexts are kept.
    pub fn restart(&mut self) {
        assert_eq!(self.phase, CabacPhase::Flushed, "restart needs a flushed cabac encoder");
        self.low = 0;
        self.range = 0x1fe;
        self.queue = -9;
        self.bytes_outstanding = 0;
        self.phase = CabacPhase::Initialized;
    }

    pub fn snapshot_contexts(&self) -> ContextArray {
        self.contexts
    }

    pub fn restore_contexts(&mut self, snapshot: &ContextArray) {
        self.contexts = *snapshot;
    }

    /// Cost-only coder starting from the current contexts; the contexts of
    /// `self` are never touched by the trial.
    pub fn rd_trial(&self) -> CabacCostEstimator {
        CabacCostEstimator::new(&self.contexts)
    }

    /// Bytes produced so far, not counting pending ones.
    pub fn bytes_written(&self) -> usize {
        self.pos - self.start
    }

    pub fn written(&self) -> &[u8] {
        &self.buf[self.start..self.pos]
    }

    /// Hands the region back with the offset just past the last byte.
    pub fn finish(self) -> (&'a mut [u8], usize) {
        assert_eq!(self.phase, CabacPhase::Flushed, "finish needs a flushed cabac encoder");
        (self.buf, self.pos)
    }

    #[cfg(test)]
    pub(crate) fn max_outstanding(&self) -> usize {
        self.max_outstanding
    }
}

impl<'a> CabacSink for CabacEncoder<'a> {
    #[inline(always)]
    fn encode_decision(&mut self, ctx: usize, bin: bool) {
        CabacEncoder::encode_decision(self, ctx, bin);
    }

    #[inline(always)]
    fn encode_decision_noup(&mut self, ctx: usize, bin: bool) {
        CabacEncoder::encode_decision(self, ctx, bin);
    }

    #[inline(always)]
    fn encode_bypass(&mut self, bin: bool) {
        CabacEncoder::encode_bypass(self, bin);
    }

    fn encode_terminal(&mut self) {
        CabacEncoder::encode_terminal(self);
    }

    fn encode_ue_bypass(&mut self, exp_bits: u32, val: u32) {
        CabacEncoder::encode_ue_bypass(self, exp_bits, val);
    }

    fn contexts(&self) -> &ContextArray {
        &self.contexts
    }
}

#![allow(non_upper_case_globals)]

use super::cabac_contexts::*;
use super::cabac_encoder::*;
use super::cabac_tables::*;
use super::common::*;
use lazy_static::lazy_static;

/// Cost of one bin in 1/256 bit.
pub const BYPASS_COST: u64 = 256;
pub const TERMINAL_COST: u64 = 7;

/// Longest coeff_abs_level_minus1 prefix; at 14 the unary code has no terminating zero.
pub const MAX_LEVEL_PREFIX: usize = 14;

/// Cost-only CABAC: bins are priced from the entropy table instead of being
/// coded, so no bytes are produced and no carry handling is involved.
#[derive(Clone)]
pub struct CabacCostEstimator {
    pub contexts: ContextArray,
    /// Accumulated cost, 1/256 bit units.
    pub bits_encoded: u64,
}

impl CabacCostEstimator {
    pub fn new(contexts: &ContextArray) -> CabacCostEstimator {
        CabacCostEstimator {
            contexts: *contexts,
            bits_encoded: 0,
        }
    }

    #[inline(always)]
    pub fn size_decision(&mut self, ctx: usize, bin: bool) {
        assert!(ctx < NUM_CONTEXTS, "context index {ctx} out of range");
        let state = self.contexts[ctx] as usize;
        self.bits_encoded += cabac_entropy[state][bin as usize] as u64;
        self.contexts[ctx] = cabac_transition[state][bin as usize];
    }

    #[inline(always)]
    pub fn size_decision_noup(&mut self, ctx: usize, bin: bool) {
        assert!(ctx < NUM_CONTEXTS, "context index {ctx} out of range");
        let state = self.contexts[ctx] as usize;
        self.bits_encoded += cabac_entropy[state][bin as usize] as u64;
    }

    /// Prices `bin` against a detached state and advances it.
    #[inline(always)]
    pub fn size_decision2(state: &mut u8, bin: bool) -> u16 {
        let cost = cabac_entropy[*state as usize][bin as usize];
        *state = cabac_transition[*state as usize][bin as usize];
        cost
    }

    pub fn size_bypass(&mut self) {
        self.bits_encoded += BYPASS_COST;
    }

    pub fn size_terminal(&mut self) {
        self.bits_encoded += TERMINAL_COST;
    }

    pub fn size_ue_bypass(&mut self, exp_bits: u32, val: u32) {
        // suffix and prefix of EGk are as long as ue(val + 2^k - 1) without k bits
        let code = val as u64 + (1u64 << exp_bits) - 1;
        let bits = 2 * bit_length(code + 1) as u64 - 1 - exp_bits as u64;
        self.bits_encoded += bits * BYPASS_COST;
    }

    /// Prices a coeff_abs_level_minus1 prefix of length `prefix` (plus the
    /// sign bin) from context `ctx` using the precomputed table.
    pub fn size_level_prefix(&mut self, ctx: usize, prefix: usize) {
        let state = self.contexts[ctx] as usize;
        self.bits_encoded += level_prefix_costs.cost[prefix][state] as u64;
        self.contexts[ctx] = level_prefix_costs.state[prefix][state];
    }

    /// Estimated size in bits, rounded up.
    pub fn bits(&self) -> u64 {
        (self.bits_encoded + 255) >> 8
    }
}

impl CabacSink for CabacCostEstimator {
    #[inline(always)]
    fn encode_decision(&mut self, ctx: usize, bin: bool) {
        self.size_decision(ctx, bin);
    }

    #[inline(always)]
    fn encode_decision_noup(&mut self, ctx: usize, bin: bool) {
        self.size_decision_noup(ctx, bin);
    }

    #[inline(always)]
    fn encode_bypass(&mut self, _bin: bool) {
        self.size_bypass();
    }

    fn encode_terminal(&mut self) {
        self.size_terminal();
    }

    fn encode_ue_bypass(&mut self, exp_bits: u32, val: u32) {
        self.size_ue_bypass(exp_bits, val);
    }

    fn contexts(&self) -> &ContextArray {
        &self.contexts
    }
}

/// Cost and final state of coding a unary level prefix from each state.
pub struct LevelPrefixCosts {
    pub cost: [[u16; NUM_STATES]; MAX_LEVEL_PREFIX + 1],
    pub state: [[u8; NUM_STATES]; MAX_LEVEL_PREFIX + 1],
}

lazy_static! {
    pub static ref level_prefix_costs: LevelPrefixCosts = {
        let mut table = LevelPrefixCosts {
            cost: [[0; NUM_STATES]; MAX_LEVEL_PREFIX + 1],
            state: [[0; NUM_STATES]; MAX_LEVEL_PREFIX + 1],
        };
        for prefix in 0..=MAX_LEVEL_PREFIX {
            for s in 0..NUM_STATES {
                let mut state = s as u8;
                let mut cost = 0u16;
                for _ in 1..prefix {
                    cost += CabacCostEstimator::size_decision2(&mut state, true);
                }
                if prefix > 0 && prefix < MAX_LEVEL_PREFIX {
                    cost += CabacCostEstimator::size_decision2(&mut state, false);
                }
                cost += BYPASS_COST as u16;
                table.cost[prefix][s] = cost;
                table.state[prefix][s] = state;
            }
        }
        table
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    #[test]
    fn fixed_costs_work() {
        let contexts = [0u8; NUM_CONTEXTS];
        let mut est = CabacCostEstimator::new(&contexts);
        est.encode_bypass(true);
        est.encode_bypass(false);
        assert_eq!(est.bits_encoded, 512);
        est.encode_terminal();
        assert_eq!(est.bits_encoded, 519);
        assert_eq!(est.bits(), 3);
    }

    #[test]
    #[should_panic(expected = "context index 460 out of range")]
    fn context_index_past_end_panics() {
        let contexts = [0u8; NUM_CONTEXTS];
        let mut est = CabacCostEstimator::new(&contexts);
        est.size_decision_noup(NUM_CONTEXTS - 1, true);
        est.size_decision(NUM_CONTEXTS, true);
    }

    #[test]
    fn ue_bypass_cost_matches_bin_count() {
        let contexts = [0u8; NUM_CONTEXTS];
        for (k, v, bins) in [(0, 0, 1), (0, 1, 3), (0, 2, 3), (3, 0, 4), (3, 7, 4), (3, 8, 6), (0, 14, 7)]
        {
            let mut est = CabacCostEstimator::new(&contexts);
            est.size_ue_bypass(k, v);
            assert_eq!(est.bits_encoded, bins * 256, "k={k} v={v}");
        }
    }

    #[test]
    fn decision_costs_work() {
        let mut contexts = [0u8; NUM_CONTEXTS];
        context_init(&mut contexts, SliceType::I, 26, 0);
        let mut est = CabacCostEstimator::new(&contexts);
        let state = contexts[70];
        est.size_decision_noup(70, true);
        assert_eq!(est.contexts[70], state);
        assert_eq!(est.bits_encoded, cabac_entropy[state as usize][1] as u64);
        est.size_decision(70, true);
        assert_eq!(est.contexts[70], cabac_transition[state as usize][1]);
        assert_eq!(est.bits_encoded, 2 * cabac_entropy[state as usize][1] as u64);
    }

    #[test]
    fn level_prefix_costs_work() {
        for s in 0..NUM_STATES {
            assert_eq!(level_prefix_costs.cost[0][s], 256);
            assert_eq!(level_prefix_costs.state[0][s], s as u8);

            // prefix 1 is a single zero bin
            let mut state = s as u8;
            let cost = CabacCostEstimator::size_decision2(&mut state, false);
            assert_eq!(level_prefix_costs.cost[1][s], cost + 256);
            assert_eq!(level_prefix_costs.state[1][s], state);

            let mut state = s as u8;
            let mut cost = 256;
            for _ in 1..MAX_LEVEL_PREFIX {
                cost += CabacCostEstimator::size_decision2(&mut state, true);
            }
            assert_eq!(level_prefix_costs.cost[MAX_LEVEL_PREFIX][s], cost);
            assert_eq!(level_prefix_costs.state[MAX_LEVEL_PREFIX][s], state);
        }

        let contexts = [20u8; NUM_CONTEXTS];
        let mut est = CabacCostEstimator::new(&contexts);
        est.size_level_prefix(227, 3);
        assert_eq!(est.bits_encoded, level_prefix_costs.cost[3][20] as u64);
        assert_eq!(est.contexts[227], level_prefix_costs.state[3][20]);
    }

    #[test]
    fn cost_tracks_real_output() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(11);
        for round in 0..12 {
            let mut contexts = [0u8; NUM_CONTEXTS];
            context_init(&mut contexts, SliceType::B, rng.gen_range(0..=51), round % 3);
            let p_mps = [0.5, 0.7, 0.8, 0.9, 0.95][round % 5];
            let n = if round % 2 == 0 { 2000 } else { 20000 };
            let mut buf = vec![0u8; 64 * 1024];
            let mut cabac = CabacEncoder::new(&mut buf);
            cabac.restore_contexts(&contexts);
            let mut est = cabac.rd_trial();
            for _ in 0..n {
                let ctx = rng.gen_range(0..NUM_CONTEXTS);
                let mps = cabac.contexts[ctx] & 1 == 1;
                let bin = if rng.gen_bool(p_mps) { mps } else { !mps };
                est.encode_decision(ctx, bin);
                cabac.encode_decision(ctx, bin);
            }
            assert_eq!(est.contexts, cabac.contexts);
            cabac.flush();
            let actual = cabac.bytes_written() as f64;
            let estimated = est.bits_encoded as f64 / 2048.0;
            assert!(
                (estimated - actual).abs() <= actual * 0.05 + 4.0,
                "estimated {estimated:.1} bytes, wrote {actual}"
            );
        }
    }
}

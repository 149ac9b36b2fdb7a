#![allow(non_upper_case_globals)]

use super::cabac_tables::*;
use super::common::*;
use lazy_static::lazy_static;

/// One byte per context: `(pStateIdx << 1) | valMPS`.
pub type ContextArray = [u8; NUM_CONTEXTS];

/// Number of combined (state, MPS) values.
pub const NUM_STATES: usize = 128;

/// Context index offsets of the syntax elements (Table 9-34, frame coded).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(dead_code)]
pub enum CabacContext {
    MbTypeSi = 0,
    MbTypeI = 3,
    MbSkipP = 11,
    MbTypeP = 14,
    SubMbTypeP = 21,
    MbSkipB = 24,
    MbTypeB = 27,
    SubMbTypeB = 36,
    MvdX = 40,
    MvdY = 47,
    RefIdx = 54,
    MbQpDelta = 60,
    IntraChromaPredMode = 64,
    PrevIntraPredModeFlag = 68,
    RemIntraPredMode = 69,
    MbFieldDecodingFlag = 70,
    CodedBlockPatternLuma = 73,
    CodedBlockPatternChroma = 77,
    CodedBlockFlag = 85,
    SignificantCoeffFlag = 105,
    LastSignificantCoeffFlag = 166,
    CoeffAbsLevelMinus1 = 227,
    EndOfSlice = 276,
    SignificantCoeffFlagField = 277,
    LastSignificantCoeffFlagField = 338,
    TransformSize8x8Flag = 399,
    SignificantCoeffFlag8x8 = 402,
    LastSignificantCoeffFlag8x8 = 417,
    CoeffAbsLevelMinus18x8 = 426,
    SignificantCoeffFlag8x8Field = 436,
    LastSignificantCoeffFlag8x8Field = 451,
}

impl CabacContext {
    #[inline(always)]
    pub fn at(self, ctx_inc: usize) -> usize {
        self as usize + ctx_inc
    }
}

#[inline(always)]
pub fn state_index(state: u8) -> usize {
    (state >> 1) as usize
}

#[inline(always)]
pub fn state_mps(state: u8) -> u8 {
    state & 1
}

/// Initial state for one (m, n) pair, 9.3.1.1.
pub fn init_state(m: i32, n: i32, qp: i32) -> u8 {
    let pre = clip3(1, 126, ((m * clip3(0, QP_MAX, qp)) >> 4) + n);
    if pre <= 63 {
        ((63 - pre) << 1) as u8
    } else {
        (((pre - 64) << 1) | 1) as u8
    }
}

fn next_state(state: u8, bin: u8) -> u8 {
    let sigma = state_index(state);
    let mps = state_mps(state);
    if bin == mps {
        let next = if sigma == 63 { 63 } else { (sigma + 1).min(62) };
        ((next as u8) << 1) | mps
    } else {
        let next = TRANS_IDX_LPS[sigma];
        let mps = if sigma == 0 { 1 - mps } else { mps };
        (next << 1) | mps
    }
}

fn bin_cost(state: u8, bin: u8) -> u16 {
    let alpha = (0.01875f64 / 0.5).powf(1.0 / 63.0);
    let p_lps = 0.5 * alpha.powi(state_index(state) as i32);
    let p = if bin == state_mps(state) {
        1.0 - p_lps
    } else {
        p_lps
    };
    (-p.log2() * 256.0).round() as u16
}

lazy_static! {
    /// `cabac_transition[state][bin]`: state after coding `bin`.
    pub static ref cabac_transition: [[u8; 2]; NUM_STATES] = {
        let mut t = [[0u8; 2]; NUM_STATES];
        for (s, row) in t.iter_mut().enumerate() {
            row[0] = next_state(s as u8, 0);
            row[1] = next_state(s as u8, 1);
        }
        t
    };

    /// `cabac_entropy[state][bin]`: cost of coding `bin` in 1/256 bit.
    pub static ref cabac_entropy: [[u16; 2]; NUM_STATES] = {
        let mut t = [[0u16; 2]; NUM_STATES];
        for (s, row) in t.iter_mut().enumerate() {
            row[0] = bin_cost(s as u8, 0);
            row[1] = bin_cost(s as u8, 1);
        }
        t
    };

    // [model][qp][ctx], model 0 is intra, 1..=3 are cabac_init_idc 0..=2
    static ref cabac_init_states: Vec<Vec<ContextArray>> = {
        let tables = [
            &CONTEXT_INIT_I,
            &CONTEXT_INIT_PB[0],
            &CONTEXT_INIT_PB[1],
            &CONTEXT_INIT_PB[2],
        ];
        tables
            .iter()
            .map(|table| {
                (0..=QP_MAX)
                    .map(|qp| {
                        let mut contexts = [0u8; NUM_CONTEXTS];
                        for (ctx, [m, n]) in table.iter().enumerate() {
                            contexts[ctx] = init_state(*m as i32, *n as i32, qp);
                        }
                        contexts
                    })
                    .collect()
            })
            .collect()
    };
}

/// Fills `contexts` for a slice of `slice_type` at `qp` with model `cabac_init_idc`.
/// Intra slices ignore the model id.
pub fn context_init(
    contexts: &mut ContextArray,
    slice_type: SliceType,
    qp: i32,
    cabac_init_idc: usize,
) {
    let model = if slice_type.is_intra() {
        0
    } else {
        assert!(cabac_init_idc <= 2, "cabac_init_idc {cabac_init_idc} out of range");
        cabac_init_idc + 1
    };
    let qp = clip3(0, QP_MAX, qp) as usize;
    contexts.copy_from_slice(&cabac_init_states[model][qp]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_state_works() {
        assert_eq!(init_state(0, 64, 26), 1);
        assert_eq!(init_state(0, 63, 26), 0);
        // pre = 17
        assert_eq!(init_state(20, -15, 26), 46 << 1);
        // pre = 126
        assert_eq!(init_state(0, 200, 26), (62 << 1) | 1);
        assert_eq!(init_state(0, 0, 26), 62 << 1);
        assert_eq!(init_state(-28, 127, -5), init_state(-28, 127, 0));
        assert_eq!(init_state(-28, 127, 70), init_state(-28, 127, 51));
        // negative products shift toward minus infinity
        assert_eq!(init_state(-1, 64, 1), 0);
    }

    #[test]
    fn transition_works() {
        // LPS at state 0 flips the MPS
        assert_eq!(cabac_transition[0][1], 1);
        assert_eq!(cabac_transition[1][0], 0);
        assert_eq!(cabac_transition[0][0], 2);
        assert_eq!(cabac_transition[(62 << 1) | 1][1], (62 << 1) | 1);
        assert_eq!(cabac_transition[62 << 1][1], 38 << 1);
        assert_eq!(cabac_transition[126][0], 126);
        assert_eq!(cabac_transition[127][1], 127);
        for s in 0..NUM_STATES {
            for bin in 0..2 {
                let next = cabac_transition[s][bin];
                if bin as u8 == state_mps(s as u8) {
                    assert!(state_index(next) >= state_index(s as u8));
                    assert_eq!(state_mps(next), state_mps(s as u8));
                } else {
                    assert!(state_index(next) <= state_index(s as u8));
                }
            }
        }
    }

    #[test]
    fn entropy_works() {
        assert_eq!(cabac_entropy[0][0], 256);
        assert_eq!(cabac_entropy[0][1], 256);
        for s in 2..NUM_STATES {
            let mps = state_mps(s as u8) as usize;
            assert!(cabac_entropy[s][mps] < 256);
            assert!(cabac_entropy[s][1 - mps] > 256);
        }
        // p_lps = 0.01875 at state 63
        let lps = cabac_entropy[126][1] as f64 / 256.0;
        assert!((lps - 5.737).abs() < 0.01);
    }

    #[test]
    fn context_init_works() {
        let mut contexts = [0u8; NUM_CONTEXTS];
        context_init(&mut contexts, SliceType::I, 26, 0);
        assert_eq!(contexts[0], init_state(20, -15, 26));
        for ctx in 0..NUM_CONTEXTS {
            let [m, n] = CONTEXT_INIT_I[ctx];
            assert_eq!(contexts[ctx], init_state(m as i32, n as i32, 26));
        }

        let mut si = [0u8; NUM_CONTEXTS];
        context_init(&mut si, SliceType::SI, 26, 2);
        assert_eq!(si, contexts);

        let mut p = [0u8; NUM_CONTEXTS];
        context_init(&mut p, SliceType::P, 30, 1);
        for ctx in 0..NUM_CONTEXTS {
            let [m, n] = CONTEXT_INIT_PB[1][ctx];
            assert_eq!(p[ctx], init_state(m as i32, n as i32, 30));
        }

        let mut clipped = [0u8; NUM_CONTEXTS];
        context_init(&mut clipped, SliceType::B, 99, 2);
        let mut top = [0u8; NUM_CONTEXTS];
        context_init(&mut top, SliceType::B, 51, 2);
        assert_eq!(clipped, top);
    }

    #[test]
    fn context_offsets_work() {
        assert_eq!(CabacContext::MbTypeI.at(3), 6);
        assert_eq!(CabacContext::EndOfSlice as usize, 276);
        assert_eq!(CabacContext::LastSignificantCoeffFlag8x8Field.at(8), NUM_CONTEXTS - 1);
    }
}

#![allow(non_camel_case_types)]
#[allow(unused_imports)]
use num::FromPrimitive;
use std::fmt;

pub const MB_SIZE: usize = 16;
pub const PCM_LUMA_SAMPLES: usize = 256;
pub const PCM_CHROMA_SAMPLES: usize = 64;
/// Luma plus both 4:2:0 chroma blocks of one macroblock.
pub const PCM_MB_BYTES: usize = PCM_LUMA_SAMPLES + 2 * PCM_CHROMA_SAMPLES;
pub const QP_MAX: i32 = 51;

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
#[allow(clippy::upper_case_acronyms)]
pub enum SliceType {
    P = 0,
    B = 1,
    I = 2,
    SP = 3,
    SI = 4,
}

impl SliceType {
    /// I and SI slices initialize CABAC from the intra table, the others from
    /// one of the three inter models.
    pub fn is_intra(&self) -> bool {
        matches!(self, SliceType::I | SliceType::SI)
    }

    pub fn primary_pic_type(&self) -> u32 {
        match self {
            SliceType::I => 0,
            SliceType::P => 1,
            SliceType::B => 2,
            _ => 7,
        }
    }
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SliceType::P => "P",
            SliceType::B => "B",
            SliceType::I => "I",
            SliceType::SP => "SP",
            SliceType::SI => "SI",
        };
        write!(f, "{name}")
    }
}

#[inline(always)]
pub fn clip3<T: PartialOrd>(min: T, max: T, v: T) -> T {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

/// Number of significant bits in `v`; zero for `v == 0`.
#[inline(always)]
pub fn bit_length(v: u64) -> u32 {
    64 - v.leading_zeros()
}

use super::common::*;
use super::config::*;
#[allow(unused_imports)]
use num::FromPrimitive;

#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
pub enum ProfileIdc {
    BASELINE = 66,
    MAIN = 77,
}

/// (level_idc, MaxFS in macroblocks, MaxMBPS), Table A-1.
const LEVEL_LIMITS: [(u8, u64, u64); 15] = [
    (10, 99, 1485),
    (11, 396, 3000),
    (12, 396, 6000),
    (13, 396, 11880),
    (20, 396, 11880),
    (21, 792, 19800),
    (22, 1620, 20250),
    (30, 1620, 40500),
    (31, 3600, 108000),
    (32, 5120, 216000),
    (40, 8192, 245760),
    (41, 8192, 245760),
    (42, 8704, 522240),
    (50, 22080, 589824),
    (51, 36864, 983040),
];

/// aspect_ratio_idc values 1..=13, Table E-1.
pub const SAR_TABLE: [(u32, u32); 13] = [
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
];

pub const EXTENDED_SAR: u32 = 255;

/// Smallest level whose frame size and macroblock rate limits hold.
pub fn derive_level_idc(mb_width: usize, mb_height: usize, fps_num: u32, fps_den: u32) -> u8 {
    let frame_size = (mb_width * mb_height) as u64;
    let mb_rate = (frame_size * fps_num as u64 + fps_den as u64 - 1) / fps_den as u64;
    let longest = mb_width.max(mb_height) as u64;
    LEVEL_LIMITS
        .iter()
        .find(|(_, max_fs, max_mbps)| {
            frame_size <= *max_fs && longest * longest <= 8 * max_fs && mb_rate <= *max_mbps
        })
        .map_or(51, |(level, _, _)| *level)
}

pub struct FrameCropping {
    /// Offsets in chroma sample units (2 luma samples for 4:2:0 frames).
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate_flag: bool,
}

pub struct VuiParameters {
    pub sample_aspect_ratio: Option<(u32, u32)>,
    pub timing_info: Option<TimingInfo>,
}

impl VuiParameters {
    /// aspect_ratio_idc for the signalled ratio, 255 when it needs explicit fields.
    pub fn aspect_ratio_idc(&self) -> Option<u32> {
        self.sample_aspect_ratio.map(|sar| {
            SAR_TABLE
                .iter()
                .position(|entry| *entry == sar)
                .map_or(EXTENDED_SAR, |i| i as u32 + 1)
        })
    }
}

pub struct SequenceParameterSet {
    pub id: usize,
    pub profile_idc: ProfileIdc,
    pub constraint_set_flags: [bool; 3],
    pub level_idc: u8,
    pub log2_max_frame_num: usize, // [4, 16]
    /// Only type 0 is written.
    pub pic_order_cnt_type: usize,
    pub log2_max_pic_order_cnt_lsb: usize, // [4, 16]
    pub num_ref_frames: usize,
    pub gaps_in_frame_num_value_allowed_flag: bool,
    pub mb_width: usize,
    pub mb_height: usize,
    pub frame_mbs_only_flag: bool,
    pub direct_8x8_inference_flag: bool,
    pub frame_cropping: Option<FrameCropping>,
    pub vui: Option<VuiParameters>,
}

impl SequenceParameterSet {
    pub fn new(id: usize, config: &EncoderConfig) -> SequenceParameterSet {
        let profile_idc = if config.cabac {
            ProfileIdc::MAIN
        } else {
            ProfileIdc::BASELINE
        };

        let mut log2_max_frame_num = 4;
        while (1 << log2_max_frame_num) <= config.keyint && log2_max_frame_num < 16 {
            log2_max_frame_num += 1;
        }
        let log2_max_frame_num = (log2_max_frame_num + 1).min(16);

        let mb_width = config.mb_width();
        let mb_height = config.mb_height();
        let frame_cropping = if config.width % MB_SIZE != 0 || config.height % MB_SIZE != 0 {
            Some(FrameCropping {
                left: 0,
                right: (mb_width * MB_SIZE - config.width) / 2,
                top: 0,
                bottom: (mb_height * MB_SIZE - config.height) / 2,
            })
        } else {
            None
        };

        let vui = VuiParameters {
            sample_aspect_ratio: config.sar,
            timing_info: Some(TimingInfo {
                num_units_in_tick: config.fps_den,
                // two ticks per frame
                time_scale: config.fps_num.saturating_mul(2),
                fixed_frame_rate_flag: true,
            }),
        };

        SequenceParameterSet {
            id,
            profile_idc,
            // a pcm-only stream satisfies the baseline and main constraints alike
            constraint_set_flags: [profile_idc == ProfileIdc::BASELINE, true, false],
            level_idc: derive_level_idc(mb_width, mb_height, config.fps_num, config.fps_den),
            log2_max_frame_num,
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb: (log2_max_frame_num + 1).min(16),
            num_ref_frames: 1,
            gaps_in_frame_num_value_allowed_flag: false,
            mb_width,
            mb_height,
            frame_mbs_only_flag: true,
            direct_8x8_inference_flag: true,
            frame_cropping,
            vui: Some(vui),
        }
    }

    pub fn num_mbs(&self) -> usize {
        self.mb_width * self.mb_height
    }

    /// Visible picture size after cropping.
    pub fn cropped_size(&self) -> (usize, usize) {
        let (w, h) = (self.mb_width * MB_SIZE, self.mb_height * MB_SIZE);
        if let Some(crop) = &self.frame_cropping {
            (
                w - 2 * (crop.left + crop.right),
                h - 2 * (crop.top + crop.bottom),
            )
        } else {
            (w, h)
        }
    }
}

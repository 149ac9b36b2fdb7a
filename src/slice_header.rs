use super::common::*;
use super::config::*;
use super::nal::*;
use super::pps::*;
use super::sps::*;

pub struct SliceHeader<'a> {
    pub sps: &'a SequenceParameterSet,
    pub pps: &'a PictureParameterSet,
    pub nal_unit_type: NALUnitType,
    pub nal_ref_idc: NalPriority,
    pub first_mb: usize,
    /// One past the last macroblock of the slice.
    pub last_mb: usize,
    pub slice_type: SliceType,
    pub frame_num: u32,
    /// Present for IDR pictures only.
    pub idr_pic_id: Option<u32>,
    pub pic_order_cnt_lsb: u32,
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active: usize,
    pub cabac_init_idc: usize,
    pub qp: i32,
    pub disable_deblocking_filter_idc: u32,
    pub slice_alpha_c0_offset: i32,
    pub slice_beta_offset: i32,
}

impl<'a> SliceHeader<'a> {
    pub fn new(
        sps: &'a SequenceParameterSet,
        pps: &'a PictureParameterSet,
        config: &EncoderConfig,
        slice_type: SliceType,
        idr_pic_id: Option<u32>,
        frame_num: u32,
        pic_order_cnt: u32,
        mb_range: (usize, usize),
    ) -> SliceHeader<'a> {
        let (nal_unit_type, nal_ref_idc) = if idr_pic_id.is_some() {
            (NALUnitType::SLICE_IDR, NalPriority::HIGHEST)
        } else {
            (NALUnitType::SLICE, NalPriority::HIGH)
        };
        SliceHeader {
            sps,
            pps,
            nal_unit_type,
            nal_ref_idc,
            first_mb: mb_range.0,
            last_mb: mb_range.1,
            slice_type,
            frame_num: frame_num & ((1 << sps.log2_max_frame_num) - 1),
            idr_pic_id,
            pic_order_cnt_lsb: pic_order_cnt & ((1 << sps.log2_max_pic_order_cnt_lsb) - 1),
            num_ref_idx_active_override_flag: false,
            num_ref_idx_l0_active: pps.num_ref_idx_l0_default_active,
            cabac_init_idc: config.cabac_init_idc,
            qp: config.qp,
            // at qp 15 and below the filter cannot change any sample
            disable_deblocking_filter_idc: if config.qp > 15 { 0 } else { 1 },
            slice_alpha_c0_offset: 0,
            slice_beta_offset: 0,
        }
    }

    pub fn num_mbs(&self) -> usize {
        self.last_mb - self.first_mb
    }

    pub fn qp_delta(&self) -> i32 {
        self.qp - self.pps.pic_init_qp
    }

    /// Whether the left and top neighbours of `mb` belong to this slice.
    pub fn neighbour_availability(&self, mb: usize) -> (bool, bool) {
        let mb_width = self.sps.mb_width;
        let left = mb % mb_width > 0 && mb - 1 >= self.first_mb;
        let top = mb >= mb_width && mb - mb_width >= self.first_mb;
        (left, top)
    }
}

/// Macroblock rows of a picture split into `slices` runs of whole rows.
pub fn slice_mb_ranges(mb_width: usize, mb_height: usize, slices: usize) -> Vec<(usize, usize)> {
    (0..slices)
        .map(|i| {
            let first = (i * mb_height / slices) * mb_width;
            let last = ((i + 1) * mb_height / slices) * mb_width;
            (first, last)
        })
        .collect()
}

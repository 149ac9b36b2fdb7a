use super::config::*;
use super::sps::*;

pub struct PictureParameterSet {
    pub id: usize,
    pub sps_id: usize,
    pub entropy_coding_mode_flag: bool,
    pub bottom_field_pic_order_in_frame_present_flag: bool,
    pub num_ref_idx_l0_default_active: usize,
    pub num_ref_idx_l1_default_active: usize,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_idc: u32,
    pub pic_init_qp: i32,
    pub pic_init_qs: i32,
    pub chroma_qp_index_offset: i32,
    pub deblocking_filter_control_present_flag: bool,
    pub constrained_intra_pred_flag: bool,
    pub redundant_pic_cnt_present_flag: bool,
}

impl PictureParameterSet {
    pub fn new(id: usize, sps: &SequenceParameterSet, config: &EncoderConfig) -> PictureParameterSet {
        PictureParameterSet {
            id,
            sps_id: sps.id,
            entropy_coding_mode_flag: config.cabac,
            bottom_field_pic_order_in_frame_present_flag: false,
            num_ref_idx_l0_default_active: 1,
            num_ref_idx_l1_default_active: 1,
            weighted_pred_flag: false,
            weighted_bipred_idc: 0,
            pic_init_qp: 26,
            pic_init_qs: 26,
            chroma_qp_index_offset: 0,
            deblocking_filter_control_present_flag: true,
            constrained_intra_pred_flag: false,
            redundant_pic_cnt_present_flag: false,
        }
    }
}

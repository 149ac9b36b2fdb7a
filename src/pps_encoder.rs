use super::bit_writer::*;
use super::pps::*;
use debug_print::*;

pub struct PpsEncoder<'w, 'a> {
    writer: &'w mut BitWriter<'a>,
}

impl<'w, 'a> PpsEncoder<'w, 'a> {
    pub fn new(writer: &'w mut BitWriter<'a>) -> PpsEncoder<'w, 'a> {
        PpsEncoder { writer }
    }

    pub fn encode(&mut self, pps: &PictureParameterSet) {
        let w = &mut *self.writer;
        debug_eprintln!("pic_parameter_set_id {}", pps.id);
        w.write_ue(pps.id as u32);
        debug_eprintln!("seq_parameter_set_id {}", pps.sps_id);
        w.write_ue(pps.sps_id as u32);
        debug_eprintln!("entropy_coding_mode_flag {}", pps.entropy_coding_mode_flag);
        w.write1(pps.entropy_coding_mode_flag);
        w.write1(pps.bottom_field_pic_order_in_frame_present_flag);
        // num_slice_groups_minus1
        w.write_ue(0);
        w.write_ue(pps.num_ref_idx_l0_default_active as u32 - 1);
        w.write_ue(pps.num_ref_idx_l1_default_active as u32 - 1);
        w.write1(pps.weighted_pred_flag);
        w.write_bits(2, pps.weighted_bipred_idc);
        debug_eprintln!("pic_init_qp_minus26 {}", pps.pic_init_qp - 26);
        w.write_se(pps.pic_init_qp - 26);
        w.write_se(pps.pic_init_qs - 26);
        w.write_se(pps.chroma_qp_index_offset);
        w.write1(pps.deblocking_filter_control_present_flag);
        w.write1(pps.constrained_intra_pred_flag);
        w.write1(pps.redundant_pic_cnt_present_flag);
        w.rbsp_trailing();
    }
}

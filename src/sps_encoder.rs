use super::bit_writer::*;
use super::sps::*;
use debug_print::*;

pub struct SpsEncoder<'w, 'a> {
    writer: &'w mut BitWriter<'a>,
}

impl<'w, 'a> SpsEncoder<'w, 'a> {
    pub fn new(writer: &'w mut BitWriter<'a>) -> SpsEncoder<'w, 'a> {
        SpsEncoder { writer }
    }

    /// Writes seq_parameter_set_rbsp() including the trailing bits.
    pub fn encode(&mut self, sps: &SequenceParameterSet) {
        let w = &mut *self.writer;
        debug_eprintln!("profile_idc {:?}", sps.profile_idc);
        w.write_bits(8, sps.profile_idc as u32);
        for flag in sps.constraint_set_flags {
            w.write1(flag);
        }
        // reserved_zero_5bits
        w.write_bits(5, 0);
        debug_eprintln!("level_idc {}", sps.level_idc);
        w.write_bits(8, sps.level_idc as u32);
        debug_eprintln!("seq_parameter_set_id {}", sps.id);
        w.write_ue(sps.id as u32);
        debug_eprintln!("log2_max_frame_num_minus4 {}", sps.log2_max_frame_num - 4);
        w.write_ue(sps.log2_max_frame_num as u32 - 4);
        w.write_ue(sps.pic_order_cnt_type as u32);
        debug_eprintln!(
            "log2_max_pic_order_cnt_lsb_minus4 {}",
            sps.log2_max_pic_order_cnt_lsb - 4
        );
        w.write_ue(sps.log2_max_pic_order_cnt_lsb as u32 - 4);
        debug_eprintln!("num_ref_frames {}", sps.num_ref_frames);
        w.write_ue(sps.num_ref_frames as u32);
        w.write1(sps.gaps_in_frame_num_value_allowed_flag);
        debug_eprintln!("pic_width_in_mbs_minus1 {}", sps.mb_width - 1);
        w.write_ue(sps.mb_width as u32 - 1);
        debug_eprintln!("pic_height_in_map_units_minus1 {}", sps.mb_height - 1);
        w.write_ue(sps.mb_height as u32 - 1);
        w.write1(sps.frame_mbs_only_flag);
        if !sps.frame_mbs_only_flag {
            // mb_adaptive_frame_field_flag
            w.write1(false);
        }
        w.write1(sps.direct_8x8_inference_flag);

        w.write1(sps.frame_cropping.is_some());
        if let Some(crop) = &sps.frame_cropping {
            debug_eprintln!(
                "frame_crop_offsets {} {} {} {}",
                crop.left,
                crop.right,
                crop.top,
                crop.bottom
            );
            w.write_ue(crop.left as u32);
            w.write_ue(crop.right as u32);
            w.write_ue(crop.top as u32);
            w.write_ue(crop.bottom as u32);
        }

        w.write1(sps.vui.is_some());
        if let Some(vui) = &sps.vui {
            self.encode_vui(vui);
        }
        self.writer.rbsp_trailing();
    }

    fn encode_vui(&mut self, vui: &VuiParameters) {
        let w = &mut *self.writer;
        w.write1(vui.sample_aspect_ratio.is_some());
        if let (Some(idc), Some((sar_width, sar_height))) =
            (vui.aspect_ratio_idc(), vui.sample_aspect_ratio)
        {
            debug_eprintln!("aspect_ratio_idc {}", idc);
            w.write_bits(8, idc);
            if idc == EXTENDED_SAR {
                w.write_bits(16, sar_width);
                w.write_bits(16, sar_height);
            }
        }
        // overscan_info_present_flag
        w.write1(false);
        // video_signal_type_present_flag
        w.write1(false);
        // chroma_loc_info_present_flag
        w.write1(false);

        w.write1(vui.timing_info.is_some());
        if let Some(timing) = &vui.timing_info {
            debug_eprintln!(
                "timing {} / {}",
                timing.time_scale,
                timing.num_units_in_tick
            );
            w.write_bits(32, timing.num_units_in_tick);
            w.write_bits(32, timing.time_scale);
            w.write1(timing.fixed_frame_rate_flag);
        }

        // nal_hrd_parameters_present_flag
        w.write1(false);
        // vcl_hrd_parameters_present_flag
        w.write1(false);
        // pic_struct_present_flag
        w.write1(false);
        // bitstream_restriction_flag
        w.write1(false);
    }
}

#[cfg(test)]
mod tests {
    use super::super::bit_reader::*;
    use super::super::config::*;
    use super::*;

    fn write_sps(sps: &SequenceParameterSet) -> Vec<u8> {
        let mut buf = vec![0u8; 256];
        let mut writer = BitWriter::new(&mut buf);
        SpsEncoder::new(&mut writer).encode(sps);
        writer.written().to_vec()
    }

    #[test]
    fn sps_fields_read_back() {
        let mut config = EncoderConfig::new(176, 144);
        config.cabac = false;
        config.fps_num = 30000;
        config.fps_den = 1001;
        config.sar = Some((12, 11));
        let sps = SequenceParameterSet::new(0, &config);
        let bytes = write_sps(&sps);
        assert_eq!(&bytes[..3], &[66, 0b1100_0000, sps.level_idc]);

        let mut r = BitReader::new(&bytes);
        r.skip(24);
        assert_eq!(r.read_ue(), 0);
        assert_eq!(r.read_ue() as usize, sps.log2_max_frame_num - 4);
        assert_eq!(r.read_ue(), 0);
        assert_eq!(r.read_ue() as usize, sps.log2_max_pic_order_cnt_lsb - 4);
        assert_eq!(r.read_ue(), 1);
        assert_eq!(r.read1(), 0);
        assert_eq!(r.read_ue(), 10);
        assert_eq!(r.read_ue(), 8);
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read1(), 1);
        // no cropping
        assert_eq!(r.read1(), 0);
        // vui
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read_bits(8), 2);
        assert_eq!(r.read_bits(3), 0);
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read_bits(32), 1001);
        assert_eq!(r.read_bits(32), 60000);
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read_bits(4), 0);
        // rbsp_stop_one_bit then zero padding to the end
        assert_eq!(r.read1(), 1);
        while !r.is_aligned() {
            assert_eq!(r.read1(), 0);
        }
        assert!(r.is_eof());
    }

    #[test]
    fn sps_cropping_and_extended_sar_work() {
        let mut config = EncoderConfig::new(1916, 1082);
        config.sar = Some((3, 2));
        let sps = SequenceParameterSet::new(3, &config);
        let bytes = write_sps(&sps);
        assert_eq!(bytes[0], 77);

        let mut r = BitReader::new(&bytes);
        r.skip(24);
        assert_eq!(r.read_ue(), 3);
        r.read_ue();
        r.read_ue();
        r.read_ue();
        r.read_ue();
        r.read1();
        assert_eq!(r.read_ue(), 119);
        assert_eq!(r.read_ue(), 67);
        r.skip(2);
        assert_eq!(r.read1(), 1);
        assert_eq!(
            [r.read_ue(), r.read_ue(), r.read_ue(), r.read_ue()],
            [0, 2, 0, 3]
        );
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read1(), 1);
        assert_eq!(r.read_bits(8), EXTENDED_SAR);
        assert_eq!(r.read_bits(16), 3);
        assert_eq!(r.read_bits(16), 2);
    }
}

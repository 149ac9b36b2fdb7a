use super::bit_writer::*;
use super::cabac_contexts::*;
use super::cabac_encoder::*;
use super::cabac_tables::*;
use super::common::*;
use super::picture::*;
use super::rd_cost::*;
use super::slice_header::*;
use debug_print::*;

/// Room reserved for a slice header and the alignment after it.
pub const MAX_SLICE_HEADER_BYTES: usize = 64;

/// Largest RBSP a slice of `num_mbs` pcm macroblocks can need.
pub fn max_slice_size(num_mbs: usize) -> usize {
    MAX_SLICE_HEADER_BYTES + num_mbs * (PCM_MB_BYTES + 8)
}

/// mb_skip_flag of a P or B macroblock.
pub fn encode_mb_skip<S: CabacSink>(sink: &mut S, slice_type: SliceType, ctx_inc: usize, skip: bool) {
    let ctx = match slice_type {
        SliceType::B => CabacContext::MbSkipB.at(ctx_inc),
        _ => CabacContext::MbSkipP.at(ctx_inc),
    };
    sink.encode_decision(ctx, skip);
}

/// Bins of mb_type I_PCM up to, not including, the terminating bin of 1.
/// The caller codes that bin by flushing the arithmetic coder.
pub fn encode_mb_type_pcm<S: CabacSink>(sink: &mut S, slice_type: SliceType, ctx_inc: usize) {
    match slice_type {
        SliceType::I => sink.encode_decision(CabacContext::MbTypeI.at(ctx_inc), true),
        SliceType::P | SliceType::SP => {
            // prefix 1 selects an intra type, the suffix starts at ctxIdx 17
            sink.encode_decision(CabacContext::MbTypeP.at(0), true);
            sink.encode_decision(CabacContext::MbTypeP.at(3), true);
        }
        _ => panic!("pcm macroblocks are written in I and P slices only"),
    }
}

/// mb_type value of I_PCM in CAVLC slices.
pub fn cavlc_mb_type_pcm(slice_type: SliceType) -> u32 {
    if slice_type.is_intra() {
        25
    } else {
        5 + 25
    }
}

pub struct SliceEncoder<'p> {
    picture: &'p Picture,
}

impl<'p> SliceEncoder<'p> {
    pub fn new(picture: &'p Picture) -> SliceEncoder<'p> {
        SliceEncoder { picture }
    }

    /// Writes the slice RBSP into `buf` and returns its length in bytes.
    pub fn encode(&self, sh: &SliceHeader, buf: &mut [u8]) -> usize {
        let mut writer = BitWriter::new(buf);
        self.encode_sh(&mut writer, sh);
        let header_bits = writer.bit_position();
        let size = if sh.pps.entropy_coding_mode_flag {
            // cabac_alignment_one_bit
            writer.align_one();
            let mut cabac = CabacEncoder::resume(writer);
            self.encode_cabac_data(&mut cabac, sh);
            let (_, end) = cabac.finish();
            end
        } else {
            self.encode_cavlc_data(&mut writer, sh);
            writer.written().len()
        };
        debug_eprintln!(
            "slice {} mbs [{}, {}) header {} bits, rbsp {} bytes",
            sh.slice_type,
            sh.first_mb,
            sh.last_mb,
            header_bits,
            size
        );
        size
    }

    pub fn encode_sh(&self, w: &mut BitWriter, sh: &SliceHeader) {
        debug_eprintln!("first_mb_in_slice {}", sh.first_mb);
        w.write_ue(sh.first_mb as u32);
        // +5: every slice of the picture has this type
        debug_eprintln!("slice_type {}", sh.slice_type as u32 + 5);
        w.write_ue(sh.slice_type as u32 + 5);
        w.write_ue(sh.pps.id as u32);
        debug_eprintln!("frame_num {}", sh.frame_num);
        w.write_bits(sh.sps.log2_max_frame_num as u32, sh.frame_num);
        if let Some(idr_pic_id) = sh.idr_pic_id {
            debug_eprintln!("idr_pic_id {}", idr_pic_id);
            w.write_ue(idr_pic_id);
        }
        debug_eprintln!("pic_order_cnt_lsb {}", sh.pic_order_cnt_lsb);
        w.write_bits(sh.sps.log2_max_pic_order_cnt_lsb as u32, sh.pic_order_cnt_lsb);
        if sh.pps.redundant_pic_cnt_present_flag {
            // redundant_pic_cnt
            w.write_ue(0);
        }
        if sh.slice_type == SliceType::B {
            // direct_spatial_mv_pred_flag
            w.write1(true);
        }
        if matches!(sh.slice_type, SliceType::P | SliceType::SP | SliceType::B) {
            w.write1(sh.num_ref_idx_active_override_flag);
            if sh.num_ref_idx_active_override_flag {
                w.write_ue(sh.num_ref_idx_l0_active as u32 - 1);
                if sh.slice_type == SliceType::B {
                    w.write_ue(sh.num_ref_idx_l0_active as u32 - 1);
                }
            }
        }
        if !sh.slice_type.is_intra() {
            // ref_pic_list_reordering_flag_l0
            w.write1(false);
            if sh.slice_type == SliceType::B {
                w.write1(false);
            }
        }
        if sh.nal_ref_idc as u8 != 0 {
            if sh.idr_pic_id.is_some() {
                // no_output_of_prior_pics_flag, long_term_reference_flag
                w.write1(false);
                w.write1(false);
            } else {
                // adaptive_ref_pic_marking_mode_flag
                w.write1(false);
            }
        }
        if sh.pps.entropy_coding_mode_flag && !sh.slice_type.is_intra() {
            debug_eprintln!("cabac_init_idc {}", sh.cabac_init_idc);
            w.write_ue(sh.cabac_init_idc as u32);
        }
        debug_eprintln!("slice_qp_delta {}", sh.qp_delta());
        w.write_se(sh.qp_delta());
        if sh.pps.deblocking_filter_control_present_flag {
            w.write_ue(sh.disable_deblocking_filter_idc);
            if sh.disable_deblocking_filter_idc != 1 {
                w.write_se(sh.slice_alpha_c0_offset >> 1);
                w.write_se(sh.slice_beta_offset >> 1);
            }
        }
    }

    fn mb_ctx_inc(sh: &SliceHeader, mb: usize) -> usize {
        let (left, top) = sh.neighbour_availability(mb);
        left as usize + top as usize
    }

    fn encode_cabac_data(&self, cabac: &mut CabacEncoder, sh: &SliceHeader) {
        cabac.context_init(sh.slice_type, sh.qp, sh.cabac_init_idc);
        let mb_width = sh.sps.mb_width;
        let mut samples = [0u8; PCM_MB_BYTES];
        for mb in sh.first_mb..sh.last_mb {
            if mb > sh.first_mb {
                // end_of_slice_flag
                cabac.encode_terminal();
            }
            let ctx_inc = Self::mb_ctx_inc(sh, mb);
            if !sh.slice_type.is_intra() {
                encode_mb_skip(cabac, sh.slice_type, ctx_inc, false);
            }
            encode_mb_type_pcm(cabac, sh.slice_type, ctx_inc);
            cabac.flush();
            self.picture.pcm_samples(mb % mb_width, mb / mb_width, &mut samples);
            cabac.write_raw(&samples);
            cabac.restart();
        }
        // end_of_slice_flag = 1
        cabac.flush();
    }

    fn encode_cavlc_data(&self, w: &mut BitWriter, sh: &SliceHeader) {
        let mb_width = sh.sps.mb_width;
        let mut samples = [0u8; PCM_MB_BYTES];
        for mb in sh.first_mb..sh.last_mb {
            if !sh.slice_type.is_intra() {
                // mb_skip_run
                w.write_ue(0);
            }
            w.write_ue(cavlc_mb_type_pcm(sh.slice_type));
            // pcm_alignment_zero_bit
            w.align_zero();
            self.picture.pcm_samples(mb % mb_width, mb / mb_width, &mut samples);
            w.write_bytes(&samples);
        }
        w.rbsp_trailing();
    }

    /// Size of the slice RBSP in bits as predicted without running the
    /// arithmetic coder. Exact for CAVLC; for CABAC the bins are priced
    /// from the entropy table and the flushes are not counted.
    pub fn estimate_bits(&self, sh: &SliceHeader) -> u64 {
        let mut scratch = [0u8; MAX_SLICE_HEADER_BYTES];
        let mut writer = BitWriter::new(&mut scratch);
        self.encode_sh(&mut writer, sh);
        let header_bits = writer.bit_position() as u64;
        let pcm_bits = 8 * PCM_MB_BYTES as u64;
        let align = |bits: u64| (bits + 7) & !7;

        if sh.pps.entropy_coding_mode_flag {
            let mut contexts = [0u8; NUM_CONTEXTS];
            context_init(&mut contexts, sh.slice_type, sh.qp, sh.cabac_init_idc);
            let mut est = CabacCostEstimator::new(&contexts);
            for mb in sh.first_mb..sh.last_mb {
                if mb > sh.first_mb {
                    est.encode_terminal();
                }
                let ctx_inc = Self::mb_ctx_inc(sh, mb);
                if !sh.slice_type.is_intra() {
                    encode_mb_skip(&mut est, sh.slice_type, ctx_inc, false);
                }
                encode_mb_type_pcm(&mut est, sh.slice_type, ctx_inc);
                est.bits_encoded += pcm_bits << 8;
            }
            align(header_bits) + est.bits()
        } else {
            let mb_type_bits = size_ue(cavlc_mb_type_pcm(sh.slice_type)) as u64;
            let skip_run_bits = if sh.slice_type.is_intra() {
                0
            } else {
                size_ue(0) as u64
            };
            let mut bits = header_bits;
            for _ in sh.first_mb..sh.last_mb {
                bits = align(bits + skip_run_bits + mb_type_bits) + pcm_bits;
            }
            align(bits + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::bit_reader::*;
    use super::super::cabac_decoder::*;
    use super::super::config::*;
    use super::super::pps::*;
    use super::super::sps::*;
    use super::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    fn random_picture(rng: &mut StdRng, width: usize, height: usize) -> Picture {
        let mut picture = Picture::new(width, height);
        for plane in picture.planes.iter_mut() {
            rng.fill(&mut plane[..]);
        }
        picture
    }

    fn encode_slice(picture: &Picture, sh: &SliceHeader) -> Vec<u8> {
        let mut buf = vec![0u8; max_slice_size(sh.num_mbs())];
        let size = SliceEncoder::new(picture).encode(sh, &mut buf);
        buf.truncate(size);
        buf
    }

    /// Reads the header back and checks it against `sh`.
    fn read_sh(r: &mut BitReader, sh: &SliceHeader) {
        assert_eq!(r.read_ue() as usize, sh.first_mb);
        assert_eq!(r.read_ue(), sh.slice_type as u32 + 5);
        assert_eq!(r.read_ue(), 0);
        assert_eq!(r.read_bits(sh.sps.log2_max_frame_num as u32), sh.frame_num);
        if let Some(idr_pic_id) = sh.idr_pic_id {
            assert_eq!(r.read_ue(), idr_pic_id);
        }
        assert_eq!(
            r.read_bits(sh.sps.log2_max_pic_order_cnt_lsb as u32),
            sh.pic_order_cnt_lsb
        );
        if sh.slice_type == SliceType::P {
            // override, reordering
            assert_eq!(r.read_bits(2), 0);
        }
        if sh.idr_pic_id.is_some() {
            assert_eq!(r.read_bits(2), 0);
        } else {
            assert_eq!(r.read1(), 0);
        }
        if sh.pps.entropy_coding_mode_flag && sh.slice_type == SliceType::P {
            assert_eq!(r.read_ue() as usize, sh.cabac_init_idc);
        }
        assert_eq!(r.read_se(), sh.qp_delta());
        assert_eq!(r.read_ue(), sh.disable_deblocking_filter_idc);
        if sh.disable_deblocking_filter_idc != 1 {
            assert_eq!(r.read_se(), 0);
            assert_eq!(r.read_se(), 0);
        }
    }

    fn check_cabac_slice(rbsp: &[u8], picture: &Picture, sh: &SliceHeader) {
        let mut r = BitReader::new(rbsp);
        read_sh(&mut r, sh);
        while !r.is_aligned() {
            assert_eq!(r.read1(), 1, "cabac_alignment_one_bit");
        }
        let mut dec = CabacDecoder::new(rbsp);
        context_init(&mut dec.contexts, sh.slice_type, sh.qp, sh.cabac_init_idc);
        dec.restart(r.bit_position() / 8);

        let mut samples = [0u8; PCM_MB_BYTES];
        let mb_width = sh.sps.mb_width;
        for mb in sh.first_mb..sh.last_mb {
            if mb > sh.first_mb {
                assert!(!dec.decode_terminate(), "end_of_slice_flag at mb {mb}");
            }
            let (left, top) = sh.neighbour_availability(mb);
            let ctx_inc = left as usize + top as usize;
            if sh.slice_type == SliceType::P {
                assert!(!dec.decode_decision(11 + ctx_inc), "mb_skip_flag at mb {mb}");
                assert!(dec.decode_decision(14));
                assert!(dec.decode_decision(17));
            } else {
                assert!(dec.decode_decision(3 + ctx_inc), "mb_type at mb {mb}");
            }
            assert!(dec.decode_terminate(), "pcm terminate at mb {mb}");
            let pos = dec.byte_position();
            picture.pcm_samples(mb % mb_width, mb / mb_width, &mut samples);
            assert_eq!(&rbsp[pos..pos + PCM_MB_BYTES], &samples[..], "pcm of mb {mb}");
            dec.restart(pos + PCM_MB_BYTES);
        }
        assert!(dec.decode_terminate());
        assert_eq!(dec.byte_position(), rbsp.len());
    }

    #[test]
    fn cabac_i_slice_decodes() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(21);
        let config = EncoderConfig::new(48, 32);
        let sps = SequenceParameterSet::new(0, &config);
        let pps = PictureParameterSet::new(0, &sps, &config);
        let picture = random_picture(&mut rng, 48, 32);
        let sh = SliceHeader::new(&sps, &pps, &config, SliceType::I, Some(0), 0, 0, (0, 6));
        let rbsp = encode_slice(&picture, &sh);
        check_cabac_slice(&rbsp, &picture, &sh);
    }

    #[test]
    fn cabac_p_slices_decode() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(22);
        let mut config = EncoderConfig::new(40, 40);
        for cabac_init_idc in 0..3 {
            config.cabac_init_idc = cabac_init_idc;
            config.qp = [10, 26, 51][cabac_init_idc];
            let sps = SequenceParameterSet::new(0, &config);
            let pps = PictureParameterSet::new(0, &sps, &config);
            let picture = random_picture(&mut rng, 40, 40);
            for range in slice_mb_ranges(sps.mb_width, sps.mb_height, 2) {
                let sh = SliceHeader::new(&sps, &pps, &config, SliceType::P, None, 3, 6, range);
                let rbsp = encode_slice(&picture, &sh);
                check_cabac_slice(&rbsp, &picture, &sh);
            }
        }
    }

    #[test]
    fn cavlc_slices_read_back() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(23);
        let mut config = EncoderConfig::new(34, 18);
        config.cabac = false;
        let sps = SequenceParameterSet::new(0, &config);
        let pps = PictureParameterSet::new(0, &sps, &config);
        let picture = random_picture(&mut rng, 34, 18);
        for (slice_type, idr_pic_id) in [(SliceType::I, Some(1)), (SliceType::P, None)] {
            let sh = SliceHeader::new(&sps, &pps, &config, slice_type, idr_pic_id, 1, 2, (0, 6));
            let rbsp = encode_slice(&picture, &sh);
            let mut r = BitReader::new(&rbsp);
            read_sh(&mut r, &sh);
            let mut samples = [0u8; PCM_MB_BYTES];
            for mb in 0..6 {
                if slice_type == SliceType::P {
                    assert_eq!(r.read_ue(), 0);
                    assert_eq!(r.read_ue(), 30);
                } else {
                    assert_eq!(r.read_ue(), 25);
                }
                while !r.is_aligned() {
                    assert_eq!(r.read1(), 0, "pcm_alignment_zero_bit");
                }
                picture.pcm_samples(mb % 3, mb / 3, &mut samples);
                assert_eq!(&r.remaining_bytes()[..PCM_MB_BYTES], &samples[..]);
                r.advance_bytes(PCM_MB_BYTES);
            }
            assert_eq!(r.read1(), 1);
            while !r.is_aligned() {
                assert_eq!(r.read1(), 0);
            }
            assert!(r.is_eof());
        }
    }

    #[test]
    fn estimate_bits_tracks_output() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(24);
        for cabac in [false, true] {
            let mut config = EncoderConfig::new(64, 48);
            config.cabac = cabac;
            let sps = SequenceParameterSet::new(0, &config);
            let pps = PictureParameterSet::new(0, &sps, &config);
            let picture = random_picture(&mut rng, 64, 48);
            for (slice_type, idr_pic_id) in [(SliceType::I, Some(0)), (SliceType::P, None)] {
                let sh = SliceHeader::new(&sps, &pps, &config, slice_type, idr_pic_id, 0, 0, (0, 12));
                let actual = 8 * encode_slice(&picture, &sh).len() as u64;
                let estimate = SliceEncoder::new(&picture).estimate_bits(&sh);
                if cabac {
                    assert!(estimate <= actual + 8, "{estimate} > {actual}");
                    assert!(actual <= estimate + 24 * 12 + 64, "{actual} vs {estimate}");
                } else {
                    assert_eq!(estimate, actual);
                }
            }
        }
    }

    #[test]
    fn mb_type_bins_priced_by_estimator() {
        let mut contexts = [0u8; NUM_CONTEXTS];
        context_init(&mut contexts, SliceType::P, 26, 0);
        let mut est = CabacCostEstimator::new(&contexts);
        encode_mb_skip(&mut est, SliceType::P, 2, false);
        encode_mb_type_pcm(&mut est, SliceType::P, 2);
        let expected = cabac_entropy[contexts[13] as usize][0]
            + cabac_entropy[contexts[14] as usize][1]
            + cabac_entropy[contexts[17] as usize][1];
        assert_eq!(est.bits_encoded, expected as u64);
        assert_eq!(est.contexts[13], cabac_transition[contexts[13] as usize][0]);
    }

    #[test]
    #[should_panic(expected = "I and P slices only")]
    fn pcm_in_b_slice_panics() {
        let contexts = [0u8; NUM_CONTEXTS];
        let mut est = CabacCostEstimator::new(&contexts);
        encode_mb_type_pcm(&mut est, SliceType::B, 0);
    }
}

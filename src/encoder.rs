use super::bit_writer::*;
use super::common::*;
use super::config::*;
use super::error::*;
use super::nal::*;
use super::picture::*;
use super::pps::*;
use super::pps_encoder::*;
use super::sei_encoder::*;
use super::slice_encoder::*;
use super::slice_header::*;
use super::sps::*;
use super::sps_encoder::*;
use debug_print::*;
use std::panic;
use std::thread;

const MAX_HEADER_RBSP_BYTES: usize = 1024;

/// Drives parameter sets, access unit framing and slice writing for a
/// sequence of pictures.
pub struct Encoder {
    pub config: EncoderConfig,
    pub sps: SequenceParameterSet,
    pub pps: PictureParameterSet,
    packager: NalPackager,
    slice_ranges: Vec<(usize, usize)>,
    pictures_encoded: u64,
    /// Pictures since the last IDR.
    frames_since_idr: u32,
    idr_pic_id: u32,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> std::result::Result<Encoder, ConfigError> {
        config.validate()?;
        let sps = SequenceParameterSet::new(0, &config);
        let pps = PictureParameterSet::new(0, &sps, &config);
        let packager = NalPackager::new(config.nal_format(), config.escape_backend);
        let slice_ranges = slice_mb_ranges(sps.mb_width, sps.mb_height, config.slices);
        debug_eprintln!(
            "encoder {}x{} ({}x{} mbs) level {} escape {:?}",
            config.width,
            config.height,
            sps.mb_width,
            sps.mb_height,
            sps.level_idc,
            config.escape_backend
        );
        Ok(Encoder {
            config,
            sps,
            pps,
            packager,
            slice_ranges,
            pictures_encoded: 0,
            frames_since_idr: 0,
            idr_pic_id: 0,
        })
    }

    fn package<F>(&self, ref_idc: NalPriority, unit_type: NALUnitType, write: F) -> EncodedNal
    where
        F: FnOnce(&mut BitWriter),
    {
        let mut rbsp = vec![0u8; MAX_HEADER_RBSP_BYTES];
        let size = {
            let mut writer = BitWriter::new(&mut rbsp);
            write(&mut writer);
            writer.written().len()
        };
        rbsp.truncate(size);
        self.packager.encode(&RawNal::new(ref_idc, unit_type, rbsp))
    }

    /// SEI (when enabled), SPS and PPS.
    pub fn headers(&self) -> Vec<EncodedNal> {
        let mut nals = vec![];
        if self.config.sei_version {
            nals.push(self.package(NalPriority::DISPOSABLE, NALUnitType::SEI, |w| {
                SeiEncoder::new(w).encode_version(&self.config)
            }));
        }
        nals.push(self.package(NalPriority::HIGHEST, NALUnitType::SPS, |w| {
            SpsEncoder::new(w).encode(&self.sps)
        }));
        nals.push(self.package(NalPriority::HIGHEST, NALUnitType::PPS, |w| {
            PpsEncoder::new(w).encode(&self.pps)
        }));
        nals
    }

    fn check_picture(&self, picture: &Picture) -> Result<()> {
        if picture.width != self.config.width || picture.height != self.config.height {
            return Err(EncodeError::PictureSize {
                width: self.config.width,
                height: self.config.height,
                got_width: picture.width,
                got_height: picture.height,
            });
        }
        Ok(())
    }

    /// Encodes one picture into its access unit: AUD (when enabled), the
    /// parameter sets before every IDR picture when `repeat_headers` is set,
    /// then one NAL per slice.
    pub fn encode_picture(&mut self, picture: &Picture) -> Result<Vec<EncodedNal>> {
        self.check_picture(picture)?;

        let is_idr = self.pictures_encoded % self.config.keyint as u64 == 0;
        if is_idr && self.pictures_encoded > 0 {
            self.idr_pic_id = (self.idr_pic_id + 1) % 65536;
        }
        if is_idr {
            self.frames_since_idr = 0;
        }
        let slice_type = if is_idr { SliceType::I } else { SliceType::P };

        let mut nals = vec![];
        if self.config.aud {
            nals.push(self.package(NalPriority::DISPOSABLE, NALUnitType::AUD, |w| {
                encode_aud(w, slice_type)
            }));
        }
        if is_idr && (self.config.repeat_headers || self.pictures_encoded == 0) {
            let mut headers = self.headers();
            if self.pictures_encoded > 0 {
                // the version message goes out once
                headers.retain(|nal| nal.unit_type != NALUnitType::SEI);
            }
            nals.append(&mut headers);
        }

        let idr_pic_id = if is_idr { Some(self.idr_pic_id) } else { None };
        let slice_headers = self
            .slice_ranges
            .iter()
            .map(|range| {
                SliceHeader::new(
                    &self.sps,
                    &self.pps,
                    &self.config,
                    slice_type,
                    idr_pic_id,
                    self.frames_since_idr,
                    2 * self.frames_since_idr,
                    *range,
                )
            })
            .collect::<Vec<SliceHeader>>();
        nals.append(&mut self.encode_slices(picture, &slice_headers));

        debug_eprintln!(
            "picture {} {} {} bytes",
            self.pictures_encoded,
            slice_type,
            nals.iter().map(|nal| nal.len()).sum::<usize>()
        );
        self.pictures_encoded += 1;
        self.frames_since_idr += 1;
        Ok(nals)
    }

    /// Each slice gets its own buffer and coder; with several threads the
    /// slices are spread over scoped threads and kept in slice order.
    fn encode_slices(&self, picture: &Picture, slice_headers: &[SliceHeader]) -> Vec<EncodedNal> {
        let packager = &self.packager;
        let encode_one = |sh: &SliceHeader| -> EncodedNal {
            let mut rbsp = vec![0u8; max_slice_size(sh.num_mbs())];
            let slice_encoder = SliceEncoder::new(picture);
            let size = slice_encoder.encode(sh, &mut rbsp);
            debug_eprintln!(
                "slice at mb {}: estimated {} bits, wrote {}",
                sh.first_mb,
                slice_encoder.estimate_bits(sh),
                8 * size
            );
            rbsp.truncate(size);
            packager.encode(&RawNal::new(sh.nal_ref_idc, sh.nal_unit_type, rbsp))
        };

        let threads = self.config.threads.min(slice_headers.len()).max(1);
        if threads == 1 {
            return slice_headers.iter().map(&encode_one).collect();
        }
        let per_thread = (slice_headers.len() + threads - 1) / threads;
        thread::scope(|s| {
            let handles = slice_headers
                .chunks(per_thread)
                .map(|chunk| {
                    let encode_one = &encode_one;
                    s.spawn(move || chunk.iter().map(encode_one).collect::<Vec<EncodedNal>>())
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect()
        })
    }

    pub fn pictures_encoded(&self) -> u64 {
        self.pictures_encoded
    }
}

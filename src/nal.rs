use super::binary_writer::*;
use super::nal_escape::*;
use debug_print::*;
#[allow(unused_imports)]
use num::FromPrimitive;
use std::io::{self, Write};

#[allow(non_camel_case_types)]
#[allow(dead_code)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
pub enum NALUnitType {
    UNSPECIFIED = 0,    // Unspecified
    SLICE = 1,          // Coded slice of a non-IDR picture
    SLICE_DPA = 2,      // Coded slice data partition A
    SLICE_DPB = 3,      // Coded slice data partition B
    SLICE_DPC = 4,      // Coded slice data partition C
    SLICE_IDR = 5,      // Coded slice of an IDR picture
    SEI = 6,            // Supplemental enhancement information
    SPS = 7,            // Sequence parameter set
    PPS = 8,            // Picture parameter set
    AUD = 9,            // Access unit delimiter
    END_OF_SEQ = 10,    // End of sequence
    END_OF_STREAM = 11, // End of stream
    FILLER = 12,        // Filler data
}

/// nal_ref_idc
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive)]
pub enum NalPriority {
    DISPOSABLE = 0,
    LOW = 1,
    HIGH = 2,
    HIGHEST = 3,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NalFormat {
    /// Start code prefixed byte stream.
    AnnexB,
    /// 4-byte big-endian size before each unit.
    LengthPrefixed,
}

/// A NAL unit whose payload is still an RBSP.
#[derive(Clone, Debug)]
pub struct RawNal {
    pub ref_idc: NalPriority,
    pub unit_type: NALUnitType,
    pub long_start_code: bool,
    pub rbsp: Vec<u8>,
}

impl RawNal {
    pub fn new(ref_idc: NalPriority, unit_type: NALUnitType, rbsp: Vec<u8>) -> RawNal {
        // parameter sets and the first unit of an access unit use the 4-byte code
        let long_start_code = matches!(
            unit_type,
            NALUnitType::SPS | NALUnitType::PPS | NALUnitType::AUD | NALUnitType::SEI
        );
        RawNal {
            ref_idc,
            unit_type,
            long_start_code,
            rbsp,
        }
    }

    pub fn header_byte(&self) -> u8 {
        ((self.ref_idc as u8) << 5) | self.unit_type as u8
    }
}

/// A finished, self-contained NAL unit ready for a muxer.
#[derive(Clone, Debug)]
pub struct EncodedNal {
    pub ref_idc: NalPriority,
    pub unit_type: NALUnitType,
    pub data: Vec<u8>,
}

impl EncodedNal {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub struct NalPackager {
    pub format: NalFormat,
    pub backend: EscapeBackend,
}

impl NalPackager {
    pub fn new(format: NalFormat, backend: EscapeBackend) -> NalPackager {
        NalPackager { format, backend }
    }

    /// Upper bound of the packaged size of an RBSP of `rbsp_len` bytes.
    pub fn max_encoded_size(rbsp_len: usize) -> usize {
        4 + 1 + escaped_size_bound(rbsp_len)
    }

    /// Writes prefix, header byte and escaped payload into `dst` and
    /// returns the number of bytes used.
    pub fn encode_into(&self, nal: &RawNal, dst: &mut [u8]) -> usize {
        let needed = Self::max_encoded_size(nal.rbsp.len());
        assert!(
            dst.len() >= needed,
            "nal output region too small: {} bytes for a bound of {}",
            dst.len(),
            needed
        );
        let mut pos = 0;
        match self.format {
            NalFormat::AnnexB => {
                if nal.long_start_code {
                    dst[pos] = 0x00;
                    pos += 1;
                }
                dst[pos..pos + 3].copy_from_slice(&[0x00, 0x00, 0x01]);
                pos += 3;
            }
            // size goes here once the escaped length is known
            NalFormat::LengthPrefixed => pos += 4,
        }
        dst[pos] = nal.header_byte();
        pos += 1;
        pos += self.backend.escape(&mut dst[pos..], &nal.rbsp);
        if self.format == NalFormat::LengthPrefixed {
            let size = (pos - 4) as u32;
            dst[..4].copy_from_slice(&size.to_be_bytes());
        }
        debug_eprintln!(
            "nal type={:?} ref_idc={:?} rbsp={} packaged={}",
            nal.unit_type,
            nal.ref_idc,
            nal.rbsp.len(),
            pos
        );
        pos
    }

    pub fn encode(&self, nal: &RawNal) -> EncodedNal {
        let mut data = vec![0u8; Self::max_encoded_size(nal.rbsp.len())];
        let size = self.encode_into(nal, &mut data);
        data.truncate(size);
        EncodedNal {
            ref_idc: nal.ref_idc,
            unit_type: nal.unit_type,
            data,
        }
    }
}

/// Inserts emulation prevention bytes with the scalar routine.
pub fn escape(dst: &mut [u8], src: &[u8]) -> usize {
    escape_scalar(dst, src)
}

/// Removes emulation prevention bytes: every 0x03 that follows `00 00` and
/// precedes a byte no larger than 0x03 (or ends the payload).
pub fn unescape(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut zeros = 0;
    for (i, &byte) in src.iter().enumerate() {
        if zeros >= 2 && byte == 0x03 && src.get(i + 1).map_or(true, |&next| next <= 0x03) {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        out.push(byte);
    }
    out
}

/// Writes finished units to the output stream.
pub fn write_nals(nals: &[EncodedNal], writer: &mut BinaryWriter) -> io::Result<usize> {
    let mut written = 0;
    for nal in nals {
        writer.write_all(&nal.data)?;
        written += nal.len();
    }
    Ok(written)
}

use super::bit_writer::*;
use super::common::*;
use super::config::*;
use debug_print::*;

pub const SEI_USER_DATA_UNREGISTERED: u32 = 5;

/// uuid_iso_iec_11578 marking the encoder version message.
pub const VERSION_UUID: [u8; 16] = [
    0x5e, 0x0b, 0x9a, 0x33, 0x6c, 0x41, 0x4f, 0x8d, 0xa2, 0x17, 0xc4, 0x90, 0x3b, 0x7e, 0x51, 0xd6,
];

/// Human readable description of the encoder and its settings.
pub fn version_string(config: &EncoderConfig) -> String {
    format!(
        "avcenc {} - H.264/AVC pcm encoder - options: {}x{} fps={}/{} qp={} cabac={} cabac_init_idc={} slices={} keyint={}",
        env!("CARGO_PKG_VERSION"),
        config.width,
        config.height,
        config.fps_num,
        config.fps_den,
        config.qp,
        config.cabac as u8,
        config.cabac_init_idc,
        config.slices,
        config.keyint
    )
}

pub struct SeiEncoder<'w, 'a> {
    writer: &'w mut BitWriter<'a>,
}

impl<'w, 'a> SeiEncoder<'w, 'a> {
    pub fn new(writer: &'w mut BitWriter<'a>) -> SeiEncoder<'w, 'a> {
        SeiEncoder { writer }
    }

    fn encode_payload_header(&mut self, payload_type: u32, payload_size: usize) {
        let w = &mut *self.writer;
        let mut t = payload_type;
        while t >= 0xff {
            w.write_bits(8, 0xff);
            t -= 0xff;
        }
        w.write_bits(8, t);
        let mut size = payload_size;
        while size >= 0xff {
            w.write_bits(8, 0xff);
            size -= 0xff;
        }
        w.write_bits(8, size as u32);
    }

    /// sei_rbsp() carrying one user_data_unregistered message with the
    /// version string, NUL terminated.
    pub fn encode_version(&mut self, config: &EncoderConfig) {
        let text = version_string(config);
        debug_eprintln!("sei version: {}", text);
        let payload_size = VERSION_UUID.len() + text.len() + 1;
        self.encode_payload_header(SEI_USER_DATA_UNREGISTERED, payload_size);
        self.writer.write_bytes(&VERSION_UUID);
        self.writer.write_bytes(text.as_bytes());
        self.writer.write_bytes(&[0]);
        self.writer.rbsp_trailing();
    }
}

/// access_unit_delimiter_rbsp()
pub fn encode_aud(w: &mut BitWriter, slice_type: SliceType) {
    debug_eprintln!("primary_pic_type {}", slice_type.primary_pic_type());
    w.write_bits(3, slice_type.primary_pic_type());
    w.rbsp_trailing();
}

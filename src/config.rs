use super::common::*;
use super::error::ConfigError;
use super::nal::*;
use super::nal_escape::*;
use debug_print::*;

#[derive(Clone, Debug)]
pub struct EncoderConfig {
    pub width: usize,
    pub height: usize,
    pub fps_num: u32,
    pub fps_den: u32,
    /// Sample aspect ratio, signalled in the VUI when present.
    pub sar: Option<(u32, u32)>,
    pub qp: i32,
    /// CABAC when set, CAVLC otherwise.
    pub cabac: bool,
    pub cabac_init_idc: usize,
    pub annexb: bool,
    pub aud: bool,
    pub sei_version: bool,
    /// SPS and PPS in front of every IDR picture, not only the first.
    pub repeat_headers: bool,
    pub slices: usize,
    pub threads: usize,
    pub keyint: usize,
    pub escape_backend: EscapeBackend,
}

impl EncoderConfig {
    pub fn new(width: usize, height: usize) -> EncoderConfig {
        EncoderConfig {
            width,
            height,
            fps_num: 25,
            fps_den: 1,
            sar: None,
            qp: 26,
            cabac: true,
            cabac_init_idc: 0,
            annexb: true,
            aud: false,
            sei_version: true,
            repeat_headers: true,
            slices: 1,
            threads: 1,
            keyint: 250,
            escape_backend: EscapeBackend::detect(),
        }
    }

    pub fn mb_width(&self) -> usize {
        (self.width + MB_SIZE - 1) / MB_SIZE
    }

    pub fn mb_height(&self) -> usize {
        (self.height + MB_SIZE - 1) / MB_SIZE
    }

    pub fn nal_format(&self) -> NalFormat {
        if self.annexb {
            NalFormat::AnnexB
        } else {
            NalFormat::LengthPrefixed
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ConfigError::PictureSize(self.width, self.height));
        }
        if !(0..=QP_MAX).contains(&self.qp) {
            return Err(ConfigError::Qp(self.qp));
        }
        if self.cabac_init_idc > 2 {
            return Err(ConfigError::CabacInitIdc(self.cabac_init_idc));
        }
        // time_scale is twice the numerator
        if self.fps_num == 0 || self.fps_den == 0 || self.fps_num > 0x7fff_ffff {
            return Err(ConfigError::FrameRate(self.fps_num, self.fps_den));
        }
        if let Some((w, h)) = self.sar {
            if w == 0 || h == 0 || w > 0xffff || h > 0xffff {
                return Err(ConfigError::SampleAspectRatio(w, h));
            }
        }
        if self.slices == 0 || self.slices > self.mb_height() {
            return Err(ConfigError::Slices {
                slices: self.slices,
                mb_rows: self.mb_height(),
            });
        }
        if self.threads == 0 {
            return Err(ConfigError::Threads);
        }
        if self.keyint == 0 {
            return Err(ConfigError::Keyint);
        }
        Ok(())
    }

    /// Applies `KEY=VAL[,KEY=VAL...]` overrides.
    pub fn apply_extra_params(&mut self, extra_params: &str) -> Result<(), ConfigError> {
        for param in extra_params.split(',').filter(|p| !p.is_empty()) {
            let param = param.split('=').collect::<Vec<&str>>();
            if let [key, val] = param[..] {
                debug_eprintln!("extra param {}={}", key, val);
                self.set_param(key, val)?;
            } else {
                return Err(ConfigError::ExtraParams(extra_params.to_string()));
            }
        }
        Ok(())
    }

    fn set_param(&mut self, key: &str, val: &str) -> Result<(), ConfigError> {
        let bad_value = || ConfigError::ParamValue {
            key: key.to_string(),
            value: val.to_string(),
        };
        match key {
            "qp" => self.qp = val.parse().map_err(|_| bad_value())?,
            "cabac" => self.cabac = parse_flag(val).ok_or_else(bad_value)?,
            "cabac_init_idc" => self.cabac_init_idc = val.parse().map_err(|_| bad_value())?,
            "annexb" => self.annexb = parse_flag(val).ok_or_else(bad_value)?,
            "aud" => self.aud = parse_flag(val).ok_or_else(bad_value)?,
            "sei" => self.sei_version = parse_flag(val).ok_or_else(bad_value)?,
            "repeat_headers" => self.repeat_headers = parse_flag(val).ok_or_else(bad_value)?,
            "slices" => self.slices = val.parse().map_err(|_| bad_value())?,
            "threads" => self.threads = val.parse().map_err(|_| bad_value())?,
            "keyint" => self.keyint = val.parse().map_err(|_| bad_value())?,
            "fps" => {
                let (num, den) = parse_ratio(val, '/').ok_or_else(bad_value)?;
                self.fps_num = num;
                self.fps_den = den;
            }
            "sar" => self.sar = Some(parse_ratio(val, ':').ok_or_else(bad_value)?),
            "escape" => {
                self.escape_backend = EscapeBackend::from_name(val)
                    .ok_or_else(|| ConfigError::EscapeBackend(val.to_string()))?
            }
            _ => return Err(ConfigError::UnknownParam(key.to_string())),
        }
        Ok(())
    }
}

/// Parses `WIDTHxHEIGHT`.
pub fn parse_size(s: &str) -> Result<(usize, usize), ConfigError> {
    let size = s
        .split('x')
        .map(|x| x.parse::<usize>())
        .collect::<Vec<Result<usize, std::num::ParseIntError>>>();
    if let [Ok(width), Ok(height)] = size[..] {
        Ok((width, height))
    } else {
        Err(ConfigError::SizeFormat(s.to_string()))
    }
}

/// `num/den` for frame rates, `w:h` for aspect ratios. A bare integer means `n/1`.
fn parse_ratio(s: &str, sep: char) -> Option<(u32, u32)> {
    match s.split_once(sep) {
        Some((num, den)) => Some((num.parse().ok()?, den.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::error::EncodeError;
    use super::*;

    #[test]
    fn validate_works() {
        let config = EncoderConfig::new(352, 288);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.mb_width(), 22);
        assert_eq!(config.mb_height(), 18);

        let mut config = EncoderConfig::new(351, 288);
        assert_eq!(config.validate(), Err(ConfigError::PictureSize(351, 288)));
        config.width = 350;
        config.qp = 52;
        assert_eq!(config.validate(), Err(ConfigError::Qp(52)));
        config.qp = 0;
        config.slices = 19;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Slices {
                slices: 19,
                mb_rows: 18
            })
        );
        config.slices = 18;
        config.sar = Some((0, 1));
        assert_eq!(config.validate(), Err(ConfigError::SampleAspectRatio(0, 1)));
        config.sar = Some((12, 11));
        config.cabac_init_idc = 3;
        assert_eq!(config.validate(), Err(ConfigError::CabacInitIdc(3)));
        config.cabac_init_idc = 2;
        assert_eq!(config.validate(), Ok(()));
        config.fps_num = 0x8000_0000;
        assert_eq!(config.validate(), Err(ConfigError::FrameRate(0x8000_0000, 1)));
    }

    #[test]
    fn extra_params_work() {
        let mut config = EncoderConfig::new(64, 64);
        config
            .apply_extra_params("qp=30,cabac=0,annexb=false,fps=30000/1001,sar=16:11,slices=2,escape=scalar")
            .unwrap();
        assert_eq!(config.qp, 30);
        assert!(!config.cabac);
        assert_eq!(config.nal_format(), NalFormat::LengthPrefixed);
        assert_eq!((config.fps_num, config.fps_den), (30000, 1001));
        assert_eq!(config.sar, Some((16, 11)));
        assert_eq!(config.slices, 2);
        assert_eq!(config.escape_backend, EscapeBackend::Scalar);

        config.apply_extra_params("fps=50").unwrap();
        assert_eq!((config.fps_num, config.fps_den), (50, 1));

        assert_eq!(
            config.apply_extra_params("qp"),
            Err(ConfigError::ExtraParams("qp".to_string()))
        );
        assert_eq!(
            config.apply_extra_params("bframes=3"),
            Err(ConfigError::UnknownParam("bframes".to_string()))
        );
        assert_eq!(
            config.apply_extra_params("aud=maybe"),
            Err(ConfigError::ParamValue {
                key: "aud".to_string(),
                value: "maybe".to_string()
            })
        );
        assert_eq!(
            config.apply_extra_params("escape=neon"),
            Err(ConfigError::EscapeBackend("neon".to_string()))
        );
    }

    #[test]
    fn config_error_converts_to_encode_error() {
        let mut config = EncoderConfig::new(64, 64);
        config.keyint = 0;
        let err: EncodeError = config.validate().unwrap_err().into();
        assert!(matches!(err, EncodeError::Config(ConfigError::Keyint)));
        assert_eq!(err.to_string(), "keyint must be at least 1");
        let err: EncodeError = parse_size("64x").unwrap_err().into();
        assert!(matches!(err, EncodeError::Config(ConfigError::SizeFormat(_))));
    }

    #[test]
    fn parse_size_works() {
        assert_eq!(parse_size("1920x1080"), Ok((1920, 1080)));
        assert!(parse_size("1920").is_err());
        assert!(parse_size("ax2").is_err());
    }
}

use thiserror::Error;

/// Rejected encoder settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid picture size {0}x{1}: both sides must be even and non-zero")]
    PictureSize(usize, usize),
    #[error("qp {0} out of range 0..=51")]
    Qp(i32),
    #[error("cabac_init_idc {0} out of range 0..=2")]
    CabacInitIdc(usize),
    #[error("invalid frame rate {0}/{1}")]
    FrameRate(u32, u32),
    #[error("invalid sample aspect ratio {0}:{1}")]
    SampleAspectRatio(u32, u32),
    #[error("{slices} slices requested but the picture has {mb_rows} macroblock rows")]
    Slices { slices: usize, mb_rows: usize },
    #[error("thread count must be at least 1")]
    Threads,
    #[error("keyint must be at least 1")]
    Keyint,
    #[error("unknown escape backend: {0}")]
    EscapeBackend(String),
    #[error("invalid size: {0} (expected WIDTHxHEIGHT)")]
    SizeFormat(String),
    #[error("invalid extra-params: {0}")]
    ExtraParams(String),
    #[error("unknown extra parameter: {0}")]
    UnknownParam(String),
    #[error("invalid value for {key}: {value}")]
    ParamValue { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("picture is {got_width}x{got_height} but the stream is {width}x{height}")]
    PictureSize {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EncodeError>;

//! Error taxonomy.
//!
//! One enum per concern, rolled up into [`EngineError`] at crate
//! boundaries. Inner errors convert via `#[from]` so call sites stay on
//! `?`.

use thiserror::Error;

use crate::codec::VideoCodec;

/// Errors in codec metadata translation and validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("unsupported codec: {0:?}")]
    UnsupportedCodec(VideoCodec),
    #[error("unsupported pixel layout: {subsampling} {bit_depth}-bit")]
    UnsupportedPixelLayout { subsampling: String, bit_depth: u8 },
    #[error("invalid stream parameters: {0}")]
    InvalidParams(String),
}

/// Errors from the decoding pipeline.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("corrupt bitstream at packet {packet}: {reason}")]
    CorruptData { packet: u64, reason: String },
    #[error("decoder initialization failed: {0}")]
    Init(String),
    #[error("frame buffer request rejected: {0}")]
    BufferRequest(String),
    #[error("hardware acceleration: {0}")]
    HwAccel(String),
    #[error("decoder shut down")]
    Shutdown,
    #[error("end of stream")]
    Eof,
}

/// Top-level error for public entry points.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_converts_up() {
        fn inner() -> Result<(), DecodeError> {
            Err(CodecError::UnsupportedCodec(VideoCodec::Unknown))?
        }
        fn outer() -> EngineResult<()> {
            inner()?;
            Ok(())
        }
        assert!(matches!(outer(), Err(EngineError::Decode(_))));
    }

    #[test]
    fn messages_name_the_concern() {
        let err = DecodeError::CorruptData {
            packet: 7,
            reason: "truncated slice header".into(),
        };
        assert!(err.to_string().contains("packet 7"));
    }
}

//! `fm-common` — Shared types, codec metadata, and errors for the framemill decode engine.
//!
//! This crate is the foundation the decode crates depend on. It defines:
//!
//! - **Types**: `FrameNumber`, `TimeCode`, `Resolution`, `Rational` (newtypes for safety)
//! - **Codec metadata**: `VideoCodec`, `AudioCodec`, `SampleFormat`, `ChannelLayout`
//!   and the pure container-to-internal mapping functions
//! - **Color**: `ColorDescription` and the H.273 code-point enums
//! - **Packets**: `Packet`, `VideoFrame` (data flow types)
//! - **Config**: `ThreadingConfig`, `CodecParams`, `UserParams`
//! - **Errors**: `EngineError`, `DecodeError`, `CodecError` (thiserror-based)

pub mod codec;
pub mod color;
pub mod config;
pub mod error;
pub mod packet;
pub mod types;

// Re-export commonly used items at crate root
pub use codec::{AudioCodec, ChannelLayout, SampleFormat, StorageFormat, VideoCodec};
pub use color::{
    ColorDescription, ColorMatrix, ColorPrimaries, ColorRange, PixelFormat, TransferFunction,
};
pub use config::{CodecParams, SkipMode, ThreadingConfig, UserParams, MAX_AUTO_THREADS};
pub use error::{CodecError, DecodeError, EngineError, EngineResult};
pub use packet::{Packet, PacketProps, Plane, VideoFrame};
pub use types::{FrameNumber, Rational, Resolution, TimeCode};

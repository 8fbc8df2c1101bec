//! `fm-decoder` — Frame-parallel video decoding.
//!
//! Decodes a stream of compressed packets on a pool of worker threads,
//! one frame per worker, while keeping the caller's one-packet-in,
//! one-frame-out contract and strict output order.
//!
//! # Architecture
//!
//! Packets are submitted to worker slots round-robin. A submission waits
//! only until the previous frame's geometry is fixed (setup-finished),
//! not until it is fully decoded, so up to `thread_count` frames are in
//! flight. Workers decoding dependent frames synchronize row-by-row on
//! the reference frames they predict from.
//!
//! ## Module Overview
//!
//! - [`pipeline`] — Front door: [`pipeline::DecodePipeline`] picks frame
//!   threading or the synchronous bypass
//! - [`coordinator`] — Round-robin submission, ordered retrieval, the
//!   delaying window, flush and teardown
//! - [`decoder`] — The [`decoder::FrameDecoder`] codec trait and the
//!   [`decoder::DecodeSession`] services handed to it
//! - [`context`] — Per-worker codec context and parameter propagation
//! - [`progress`] — Row-level progress counters on reference frames
//! - [`state`] — The per-slot state machine
//! - [`hwaccel`] — Accelerator capabilities and serialization locks
//! - [`quant`] — MPEG-family inverse quantization and scan tables
//!
//! ## Usage
//!
//! ```ignore
//! use fm_decoder::pipeline::DecodePipeline;
//! use fm_common::{CodecParams, Packet, ThreadingConfig};
//!
//! let config = ThreadingConfig::default();
//! let mut pipeline = DecodePipeline::new(
//!     &config,
//!     params,
//!     &mut |_| Box::new(MyCodec::new()),
//!     None,
//! )?;
//!
//! for packet in packets {
//!     if let Some(frame) = pipeline.decode(&packet)? {
//!         // frames come back in submission order
//!     }
//! }
//! while let Some(frame) = pipeline.decode(&Packet::eos())? {
//!     // drain
//! }
//! ```

pub mod context;
pub mod coordinator;
pub mod decoder;
pub mod hwaccel;
pub mod pipeline;
pub mod progress;
pub mod quant;
pub mod state;
pub mod worker;

pub use context::{CodecContext, PublishedState};
pub use coordinator::FrameThreadCoordinator;
pub use decoder::{DecodeSession, DefaultAllocator, FrameAllocator, FrameDecoder};
pub use hwaccel::{HwAccel, HwAccelCaps, HwAccelState, SerialLock};
pub use pipeline::{DecodePipeline, DirectDecoder};
pub use progress::{FrameProgress, ProgressFrame};
pub use quant::{Dequantizer, ScanTable};
pub use state::{SlotState, StateCell};

//! Decoder configuration and the propagated parameter set.

use serde::{Deserialize, Serialize};

use crate::codec::{ChannelLayout, SampleFormat, VideoCodec};
use crate::color::{ColorDescription, PixelFormat};
use crate::types::{Rational, Resolution};

/// Upper bound on automatically chosen worker counts.
pub const MAX_AUTO_THREADS: usize = 16;

// ─── Threading ───────────────────────────────────────────────────────

/// Frame-threading setup, fixed at decoder construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadingConfig {
    /// Requested worker count. `0` means auto: one more than the number of
    /// available cores, capped at [`MAX_AUTO_THREADS`].
    pub thread_count: usize,
    /// Adjustment to the initial delaying window for codecs whose reorder
    /// delay is shorter than `thread_count - 1`. Only ever shrinks the
    /// window; positive values are ignored.
    pub extra_delay: i32,
    /// Log every cross-thread wait at debug level.
    pub debug_threads: bool,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            thread_count: 0,
            extra_delay: 0,
            debug_threads: false,
        }
    }
}

impl ThreadingConfig {
    /// Resolve `thread_count = 0` to a concrete worker count.
    pub fn effective_thread_count(&self) -> usize {
        if self.thread_count != 0 {
            return self.thread_count;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores + 1).min(MAX_AUTO_THREADS)
    }
}

// ─── Skip modes ──────────────────────────────────────────────────────

/// How aggressively to skip work during decoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkipMode {
    #[default]
    None,
    NonRef,
    BiDir,
    NonIntra,
    NonKey,
    All,
}

// ─── Caller-settable parameters ──────────────────────────────────────

/// Fields the caller may change between packets. Applied to the worker
/// context on every submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserParams {
    pub skip_loop_filter: SkipMode,
    pub skip_idct: SkipMode,
    pub skip_frame: SkipMode,
    /// Opaque caller value, echoed on decoded frames.
    pub opaque: u64,
    /// Log cross-thread waits at debug level for subsequent packets, on
    /// top of the pipeline-wide flag.
    pub debug_threads: bool,
}

// ─── Decode-derived parameters ───────────────────────────────────────

/// Stream parameters discovered during decoding.
///
/// This is the single value type carried from worker to worker and from
/// worker to caller; propagation is a clone of this struct, nothing else.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CodecParams {
    pub codec: VideoCodec,
    pub resolution: Resolution,
    /// Coded dimensions, >= the display resolution.
    pub coded_resolution: Resolution,
    pub format: PixelFormat,
    pub color: ColorDescription,
    pub sample_aspect_ratio: Rational,
    pub frame_rate: Rational,
    pub profile: i32,
    pub level: i32,
    /// Number of frames the codec buffers before the first output.
    pub delay: i32,
    pub bits_per_coded_sample: i32,
    // Audio side, untouched by video pipelines.
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub channel_layout: ChannelLayout,
}

impl CodecParams {
    pub fn new(codec: VideoCodec, resolution: Resolution, format: PixelFormat) -> Self {
        Self {
            codec,
            resolution,
            coded_resolution: resolution,
            format,
            ..Self::default()
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_thread_count_wins() {
        let cfg = ThreadingConfig {
            thread_count: 3,
            ..Default::default()
        };
        assert_eq!(cfg.effective_thread_count(), 3);
    }

    #[test]
    fn auto_thread_count_is_capped() {
        let cfg = ThreadingConfig::default();
        let n = cfg.effective_thread_count();
        assert!(n >= 1 && n <= MAX_AUTO_THREADS);
    }

    #[test]
    fn skip_modes_order_by_aggressiveness() {
        assert!(SkipMode::None < SkipMode::NonRef);
        assert!(SkipMode::NonKey < SkipMode::All);
    }
}

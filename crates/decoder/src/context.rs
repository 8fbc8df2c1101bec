//! Per-worker codec context and cross-thread parameter propagation.
//!
//! Each worker slot owns a [`CodecContext`]. Parameters move between
//! contexts in exactly two directions:
//!
//! - caller -> worker on every submission ([`CodecContext::merge_user`]),
//!   restricted to the caller-settable fields;
//! - worker -> successor / caller via a [`PublishedState`] snapshot, taken
//!   when the worker announces setup-finished. Propagation is a clone of
//!   the snapshot, never a live reference into a running worker.

use std::any::Any;
use std::sync::Arc;

use fm_common::{CodecParams, PacketProps, UserParams};

use crate::hwaccel::HwAccel;

/// Decoding state of one worker slot.
pub struct CodecContext {
    /// Stream parameters, updated as the worker decodes.
    pub params: CodecParams,
    /// Caller-settable knobs, refreshed on every submission.
    pub user: UserParams,
    /// Side data of the packet currently decoding on this slot; stamped
    /// onto the frames that packet produces.
    pub packet_props: PacketProps,
    /// Exclusive accelerator token, present only while this slot owns it.
    pub hwaccel: Option<HwAccel>,
    /// Shared hardware frame pool, if decoding to device memory.
    pub hw_frames: Option<Arc<dyn Any + Send + Sync>>,
    /// Count of frames this context has decoded, for diagnostics.
    pub frame_count: u64,
}

impl CodecContext {
    pub fn new(params: CodecParams) -> Self {
        Self {
            params,
            user: UserParams::default(),
            packet_props: PacketProps::default(),
            hwaccel: None,
            hw_frames: None,
            frame_count: 0,
        }
    }

    /// Apply the caller-settable fields. Only these may change between
    /// packets; everything else the caller set at open time is fixed.
    pub fn merge_user(&mut self, user: &UserParams) {
        self.user = user.clone();
    }

    /// Snapshot the decode-derived state for the next submission to read.
    pub fn publish(&self, decoder_state: Option<Box<dyn Any + Send>>) -> PublishedState {
        PublishedState {
            params: self.params.clone(),
            hw_frames: self.hw_frames.clone(),
            decoder_state,
        }
    }

    /// Adopt a predecessor's published parameters before decoding.
    pub fn apply_published(&mut self, published: &PublishedState) {
        self.params = published.params.clone();
        self.hw_frames = published.hw_frames.clone();
    }
}

/// What a worker publishes at setup-finished: a self-contained snapshot
/// safe to read while the worker keeps decoding.
pub struct PublishedState {
    pub params: CodecParams,
    pub hw_frames: Option<Arc<dyn Any + Send + Sync>>,
    /// Codec-internal inter-frame state (reference lists, sequence
    /// headers), exported by the decoder that produced this snapshot.
    pub decoder_state: Option<Box<dyn Any + Send>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_common::{PixelFormat, Resolution, SkipMode, VideoCodec};

    fn params() -> CodecParams {
        CodecParams::new(
            VideoCodec::H264,
            Resolution::new(320, 240),
            PixelFormat::Yuv420,
        )
    }

    #[test]
    fn merge_user_replaces_only_user_fields() {
        let mut ctx = CodecContext::new(params());
        ctx.frame_count = 5;
        let user = UserParams {
            skip_frame: SkipMode::NonRef,
            opaque: 0xDEAD,
            ..Default::default()
        };
        ctx.merge_user(&user);
        assert_eq!(ctx.user.skip_frame, SkipMode::NonRef);
        assert_eq!(ctx.user.opaque, 0xDEAD);
        assert_eq!(ctx.frame_count, 5);
        assert_eq!(ctx.params, params());
    }

    #[test]
    fn publish_then_apply_carries_params() {
        let mut src = CodecContext::new(params());
        src.params.resolution = Resolution::new(1920, 1080);
        src.params.delay = 2;

        let snapshot = src.publish(None);
        // Source keeps mutating after the snapshot; the snapshot is fixed.
        src.params.delay = 9;

        let mut dst = CodecContext::new(params());
        dst.apply_published(&snapshot);
        assert_eq!(dst.params.resolution, Resolution::new(1920, 1080));
        assert_eq!(dst.params.delay, 2);
    }

    #[test]
    fn apply_published_is_idempotent() {
        let mut src = CodecContext::new(params());
        src.params.profile = 100;
        let snapshot = src.publish(None);

        let mut dst = CodecContext::new(params());
        dst.apply_published(&snapshot);
        let once = dst.params.clone();
        dst.apply_published(&snapshot);
        assert_eq!(dst.params, once);
    }

    #[test]
    fn decoder_state_travels_in_snapshot() {
        let ctx = CodecContext::new(params());
        let snapshot = ctx.publish(Some(Box::new(vec![1u8, 2, 3])));
        let state = snapshot.decoder_state.unwrap();
        assert_eq!(
            state.downcast_ref::<Vec<u8>>().map(Vec::len),
            Some(3)
        );
    }
}

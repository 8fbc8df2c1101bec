//! The codec-facing side of the pipeline.
//!
//! A codec implements [`FrameDecoder`]; the pipeline hands it a
//! [`DecodeSession`] scoped to the current decode call. Everything a codec
//! needs from the threading layer goes through the session: announcing
//! setup-finished, frame buffer requests, and progress on reference
//! frames. The same codec code runs unchanged in single-threaded mode,
//! where the session methods collapse to no-ops.

use std::any::Any;

use fm_common::{CodecParams, DecodeError, Packet, PacketProps, VideoFrame};
use tracing::{debug, error};

use crate::context::CodecContext;
use crate::progress::ProgressFrame;
use crate::worker::{PipelineShared, SlotShared};

// ─── Codec trait ─────────────────────────────────────────────────────

/// One codec instance bound to one worker slot.
pub trait FrameDecoder: Send {
    /// Decode one packet, possibly returning a finished frame. An empty
    /// packet is the end-of-stream marker and drains buffered frames.
    ///
    /// Codecs that fix frame geometry early should call
    /// [`DecodeSession::finish_setup`] as soon as dimensions and buffers
    /// are known, so the next packet can be submitted while this one is
    /// still decoding.
    fn decode(
        &mut self,
        session: &mut DecodeSession<'_>,
        ctx: &mut CodecContext,
        packet: &Packet,
    ) -> Result<Option<VideoFrame>, DecodeError>;

    /// Drop all buffered frames and reset to a clean state.
    fn flush(&mut self, ctx: &mut CodecContext);

    /// Whether decoding a frame depends on state derived from previous
    /// frames. Stateless codecs skip inter-worker state propagation.
    fn uses_inter_frame_state(&self) -> bool {
        false
    }

    /// Whether the codec buffers frames internally (reordering delay), so
    /// end-of-stream packets must keep draining it.
    fn has_delay(&self) -> bool {
        false
    }

    /// Export inter-frame state for the next worker in submission order.
    /// Called when setup finishes without an explicit snapshot.
    fn export_state(&self) -> Option<Box<dyn Any + Send>> {
        None
    }

    /// Adopt inter-frame state exported by the previous worker. The state
    /// is borrowed: the same snapshot may seed several workers.
    fn import_state(&mut self, state: &(dyn Any + Send)) {
        let _ = state;
    }
}

// ─── Frame allocation ────────────────────────────────────────────────

/// Pluggable frame buffer source, the equivalent of a caller-provided
/// get-buffer callback. Calls are serialized by the pipeline.
pub trait FrameAllocator: Send + Sync {
    fn alloc(&self, params: &CodecParams) -> Result<VideoFrame, DecodeError>;
}

/// Heap allocation straight from the stream parameters.
pub struct DefaultAllocator;

impl FrameAllocator for DefaultAllocator {
    fn alloc(&self, params: &CodecParams) -> Result<VideoFrame, DecodeError> {
        if params.resolution.width == 0 || params.resolution.height == 0 {
            return Err(DecodeError::BufferRequest(format!(
                "invalid dimensions {}",
                params.resolution
            )));
        }
        Ok(VideoFrame::alloc(params.resolution, params.format))
    }
}

// ─── Session ─────────────────────────────────────────────────────────

/// The threading services available to a codec during one decode call.
pub struct DecodeSession<'a> {
    /// The slot this call runs on; absent in single-threaded mode.
    slot: Option<&'a SlotShared>,
    shared: &'a PipelineShared,
    /// Side data of the packet this call decodes, stamped onto every
    /// buffer it requests.
    props: PacketProps,
    /// The codec carries inter-frame state, so buffer requests are
    /// forbidden once setup has finished.
    stateful: bool,
    /// Cross-thread waits get logged, per config or per-packet user flag.
    debug: bool,
    setup_done: bool,
}

impl<'a> DecodeSession<'a> {
    pub(crate) fn for_slot(
        slot: &'a SlotShared,
        shared: &'a PipelineShared,
        props: PacketProps,
        stateful: bool,
        debug: bool,
    ) -> Self {
        Self {
            slot: Some(slot),
            shared,
            props,
            stateful,
            debug,
            setup_done: false,
        }
    }

    pub(crate) fn direct(
        shared: &'a PipelineShared,
        props: PacketProps,
        stateful: bool,
        debug: bool,
    ) -> Self {
        Self {
            slot: None,
            shared,
            props,
            stateful,
            debug,
            setup_done: false,
        }
    }

    pub(crate) fn setup_done(&self) -> bool {
        self.setup_done
    }

    /// Announce that frame geometry and buffers are fixed, releasing the
    /// next submission. `decoder_state` is the codec's exported
    /// inter-frame state; stateless codecs pass `None`.
    ///
    /// After this call the codec may no longer request frame buffers for
    /// the current frame.
    pub fn finish_setup(&mut self, ctx: &CodecContext, decoder_state: Option<Box<dyn Any + Send>>) {
        if self.setup_done {
            return;
        }
        self.setup_done = true;
        let Some(slot) = self.slot else {
            return;
        };
        *slot.published.lock() = Some(ctx.publish(decoder_state));
        slot.state.finish_setup();
        if self.debug {
            debug!(slot = slot.index, "setup finished");
        }
    }

    /// Request a frame buffer. Serialized across workers. The packet's
    /// side data rides on the buffer. For codecs with inter-frame state
    /// the request is rejected once setup has finished: the next frame
    /// may already be decoding against this one.
    pub fn get_buffer(&self, params: &CodecParams) -> Result<VideoFrame, DecodeError> {
        if self.setup_done && self.stateful {
            error!("frame buffer requested after setup finished");
            return Err(DecodeError::BufferRequest(
                "buffer requested after setup finished".into(),
            ));
        }
        let _guard = self.shared.buffer_lock.lock();
        let mut frame = self.shared.allocator.alloc(params)?;
        frame.opaque = self.props.opaque;
        Ok(frame)
    }

    /// Request a frame buffer wrapped with progress counters, for frames
    /// other workers will predict from.
    pub fn get_progress_buffer(
        &self,
        params: &CodecParams,
    ) -> Result<ProgressFrame, DecodeError> {
        Ok(ProgressFrame::new(self.get_buffer(params)?))
    }

    /// Publish decode progress on a reference frame.
    pub fn report_progress(&self, frame: &ProgressFrame, field: usize, row: i32) {
        if self.debug {
            debug!(field, row, "report progress");
        }
        frame.progress().report(field, row);
    }

    /// Wait until a reference frame has been decoded up to `row`.
    pub fn await_progress(&self, frame: &ProgressFrame, field: usize, row: i32) {
        if self.debug {
            debug!(field, row, "await progress");
        }
        frame.progress().wait_for(field, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_common::{PixelFormat, Resolution, VideoCodec};

    #[test]
    fn default_allocator_rejects_zero_dimensions() {
        let params = CodecParams::new(
            VideoCodec::H264,
            Resolution::new(0, 0),
            PixelFormat::Yuv420,
        );
        assert!(DefaultAllocator.alloc(&params).is_err());
    }

    #[test]
    fn default_allocator_matches_format_geometry() {
        let params = CodecParams::new(
            VideoCodec::H264,
            Resolution::new(64, 48),
            PixelFormat::Yuv420,
        );
        let frame = DefaultAllocator.alloc(&params).unwrap();
        assert_eq!(frame.planes.len(), 3);
        assert_eq!(frame.planes[0].data.len(), 64 * 48);
    }

    #[test]
    fn stateful_session_rejects_buffer_after_setup() {
        let shared = PipelineShared::with_defaults();
        let mut session = DecodeSession::direct(&shared, PacketProps::default(), true, false);
        let ctx = CodecContext::new(CodecParams::new(
            VideoCodec::H264,
            Resolution::new(64, 48),
            PixelFormat::Yuv420,
        ));

        assert!(session.get_buffer(&ctx.params).is_ok());
        session.finish_setup(&ctx, None);
        assert!(matches!(
            session.get_buffer(&ctx.params),
            Err(DecodeError::BufferRequest(_))
        ));
    }

    #[test]
    fn stateless_session_allows_buffer_after_setup() {
        let shared = PipelineShared::with_defaults();
        let mut session = DecodeSession::direct(&shared, PacketProps::default(), false, false);
        let ctx = CodecContext::new(CodecParams::new(
            VideoCodec::H264,
            Resolution::new(64, 48),
            PixelFormat::Yuv420,
        ));

        session.finish_setup(&ctx, None);
        assert!(session.get_buffer(&ctx.params).is_ok());
    }

    #[test]
    fn buffers_carry_the_packet_side_data() {
        let shared = PipelineShared::with_defaults();
        let props = PacketProps { opaque: 0xC0FFEE };
        let session = DecodeSession::direct(&shared, props, false, false);
        let params = CodecParams::new(
            VideoCodec::H264,
            Resolution::new(64, 48),
            PixelFormat::Yuv420,
        );
        let frame = session.get_buffer(&params).unwrap();
        assert_eq!(frame.opaque, 0xC0FFEE);
    }

    #[test]
    fn user_params_can_enable_thread_debugging() {
        let shared = PipelineShared::with_defaults();
        let mut ctx = CodecContext::new(CodecParams::new(
            VideoCodec::H264,
            Resolution::new(64, 48),
            PixelFormat::Yuv420,
        ));
        assert!(!shared.debug_for(&ctx));
        ctx.user.debug_threads = true;
        assert!(shared.debug_for(&ctx));
    }
}

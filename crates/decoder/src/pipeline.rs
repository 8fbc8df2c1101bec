//! Pipeline front door: pick frame threading or the synchronous bypass.

use fm_common::{
    CodecParams, DecodeError, EngineResult, Packet, ThreadingConfig, UserParams, VideoFrame,
};
use tracing::info;

use crate::context::CodecContext;
use crate::coordinator::FrameThreadCoordinator;
use crate::decoder::{DecodeSession, DefaultAllocator, FrameAllocator, FrameDecoder};
use crate::hwaccel::HwAccel;
use crate::worker::PipelineShared;

// ─── Synchronous bypass ──────────────────────────────────────────────

/// Single-threaded decoding: same codec trait, no workers, no delay
/// window. Every session call degrades to a no-op or a direct allocation.
pub struct DirectDecoder {
    decoder: Box<dyn FrameDecoder>,
    ctx: CodecContext,
    shared: PipelineShared,
}

impl DirectDecoder {
    pub fn new(
        params: CodecParams,
        decoder: Box<dyn FrameDecoder>,
        hwaccel: Option<HwAccel>,
        allocator: Box<dyn FrameAllocator>,
    ) -> Self {
        let mut ctx = CodecContext::new(params);
        ctx.hwaccel = hwaccel;
        Self {
            decoder,
            ctx,
            shared: PipelineShared::new(allocator, false),
        }
    }

    pub fn decode(&mut self, packet: &Packet) -> Result<Option<VideoFrame>, DecodeError> {
        self.ctx.packet_props = packet.props;
        let stateful = self.decoder.uses_inter_frame_state();
        let debug = self.shared.debug_for(&self.ctx);
        let mut session = DecodeSession::direct(&self.shared, packet.props, stateful, debug);
        self.decoder.decode(&mut session, &mut self.ctx, packet)
    }

    pub fn flush(&mut self) {
        self.decoder.flush(&mut self.ctx);
    }

    pub fn params(&self) -> &CodecParams {
        &self.ctx.params
    }

    pub fn set_user_params(&mut self, user: UserParams) {
        self.ctx.merge_user(&user);
    }

    pub fn take_hwaccel(&mut self) -> Option<HwAccel> {
        self.ctx.hwaccel.take()
    }
}

// ─── Mode dispatch ───────────────────────────────────────────────────

/// A decoder ready to accept packets, threaded or not.
pub enum DecodePipeline {
    Direct(DirectDecoder),
    Threaded(FrameThreadCoordinator),
}

impl DecodePipeline {
    /// Build a pipeline for `config`. A resolved thread count of 1
    /// selects the synchronous bypass.
    pub fn new(
        config: &ThreadingConfig,
        params: CodecParams,
        factory: &mut dyn FnMut(usize) -> Box<dyn FrameDecoder>,
        hwaccel: Option<HwAccel>,
    ) -> EngineResult<Self> {
        Self::with_allocator(config, params, factory, hwaccel, Box::new(DefaultAllocator))
    }

    pub fn with_allocator(
        config: &ThreadingConfig,
        params: CodecParams,
        factory: &mut dyn FnMut(usize) -> Box<dyn FrameDecoder>,
        hwaccel: Option<HwAccel>,
        allocator: Box<dyn FrameAllocator>,
    ) -> EngineResult<Self> {
        if config.effective_thread_count() < 2 {
            info!("single-threaded decoding");
            return Ok(Self::Direct(DirectDecoder::new(
                params,
                factory(0),
                hwaccel,
                allocator,
            )));
        }
        Ok(Self::Threaded(FrameThreadCoordinator::new(
            config, params, factory, hwaccel, allocator,
        )?))
    }

    /// Feed one packet, get at most one frame. An empty packet drains;
    /// repeat it until `None` comes back.
    pub fn decode(&mut self, packet: &Packet) -> Result<Option<VideoFrame>, DecodeError> {
        match self {
            Self::Direct(d) => d.decode(packet),
            Self::Threaded(c) => c.decode(packet),
        }
    }

    pub fn flush(&mut self) {
        match self {
            Self::Direct(d) => d.flush(),
            Self::Threaded(c) => c.flush(),
        }
    }

    pub fn params(&self) -> &CodecParams {
        match self {
            Self::Direct(d) => d.params(),
            Self::Threaded(c) => c.params(),
        }
    }

    pub fn set_user_params(&mut self, user: UserParams) {
        match self {
            Self::Direct(d) => d.set_user_params(user),
            Self::Threaded(c) => c.set_user_params(user),
        }
    }

    /// Reclaim an exclusive accelerator token before dropping the
    /// pipeline.
    pub fn take_hwaccel(&mut self) -> Option<HwAccel> {
        match self {
            Self::Direct(d) => d.take_hwaccel(),
            Self::Threaded(c) => c.take_hwaccel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_common::{FrameNumber, PixelFormat, Resolution, VideoCodec};

    /// Echoes the context's packet-props stash back on the frame.
    struct PropsEcho;

    impl FrameDecoder for PropsEcho {
        fn decode(
            &mut self,
            session: &mut DecodeSession<'_>,
            ctx: &mut CodecContext,
            packet: &Packet,
        ) -> Result<Option<VideoFrame>, DecodeError> {
            if packet.is_eos() {
                return Ok(None);
            }
            let mut frame = session.get_buffer(&ctx.params)?;
            frame.frame_number = FrameNumber(ctx.packet_props.opaque);
            Ok(Some(frame))
        }

        fn flush(&mut self, _ctx: &mut CodecContext) {}
    }

    #[test]
    fn direct_decoder_stashes_packet_props_on_the_context() {
        let params = CodecParams::new(
            VideoCodec::H264,
            Resolution::new(64, 48),
            PixelFormat::Yuv420,
        );
        let mut decoder =
            DirectDecoder::new(params, Box::new(PropsEcho), None, Box::new(DefaultAllocator));
        let mut packet = Packet::new(vec![1]);
        packet.props.opaque = 42;
        let frame = decoder.decode(&packet).unwrap().unwrap();
        assert_eq!(frame.frame_number, FrameNumber(42));
        assert_eq!(frame.opaque, 42);
    }
}

//! Compressed packets and decoded frames.

use crate::color::{ColorDescription, PixelFormat};
use crate::types::{FrameNumber, Rational, Resolution, TimeCode};

// ─── Packets ─────────────────────────────────────────────────────────

/// Caller-settable properties attached to a packet, carried through to the
/// frame decoded from it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PacketProps {
    /// Opaque caller value, returned untouched on the decoded frame.
    pub opaque: u64,
}

/// One compressed access unit.
///
/// A packet with empty `data` is the end-of-stream marker: it carries no
/// coded bytes and tells the decoder to drain.
#[derive(Clone, Debug, Default)]
pub struct Packet {
    pub data: Vec<u8>,
    pub pts: Option<TimeCode>,
    pub dts: Option<TimeCode>,
    pub duration: Option<TimeCode>,
    pub keyframe: bool,
    pub props: PacketProps,
}

impl Packet {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// The end-of-stream marker.
    pub fn eos() -> Self {
        Self::default()
    }

    pub fn is_eos(&self) -> bool {
        self.data.is_empty()
    }
}

// ─── Frames ──────────────────────────────────────────────────────────

/// One plane of a decoded frame: its own buffer plus the row stride.
#[derive(Clone, Debug, Default)]
pub struct Plane {
    pub data: Vec<u8>,
    /// Bytes per row, >= width * bytes_per_sample.
    pub stride: usize,
}

impl Plane {
    pub fn new(width: usize, height: usize, bytes_per_sample: usize) -> Self {
        let stride = width * bytes_per_sample;
        Self {
            data: vec![0; stride * height],
            stride,
        }
    }
}

/// A decoded video frame.
#[derive(Clone, Debug, Default)]
pub struct VideoFrame {
    pub planes: Vec<Plane>,
    pub resolution: Resolution,
    pub format: PixelFormat,
    pub color: ColorDescription,
    pub sample_aspect_ratio: Rational,
    pub pts: Option<TimeCode>,
    /// Packet dts this frame was decoded from, used for output ordering.
    pub dts: Option<TimeCode>,
    pub frame_number: FrameNumber,
    pub keyframe: bool,
    /// Opaque value from the packet this frame was decoded from.
    pub opaque: u64,
}

impl VideoFrame {
    /// Allocate zeroed planes for the given geometry.
    pub fn alloc(resolution: Resolution, format: PixelFormat) -> Self {
        let bps = format.bytes_per_sample();
        let planes = format
            .plane_dimensions(resolution)
            .into_iter()
            .map(|(w, h)| Plane::new(w as usize, h as usize, bps))
            .collect();
        Self {
            planes,
            resolution,
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
    fn empty_packet_is_eos() {
        assert!(Packet::eos().is_eos());
        assert!(!Packet::new(vec![0x42]).is_eos());
    }

    #[test]
    fn alloc_yuv420_plane_sizes() {
        let frame = VideoFrame::alloc(Resolution::new(1920, 1080), PixelFormat::Yuv420);
        assert_eq!(frame.planes.len(), 3);
        assert_eq!(frame.planes[0].data.len(), 1920 * 1080);
        assert_eq!(frame.planes[1].data.len(), 960 * 540);
        assert_eq!(frame.planes[1].stride, 960);
    }

    #[test]
    fn alloc_ten_bit_uses_two_bytes() {
        let frame = VideoFrame::alloc(Resolution::new(16, 16), PixelFormat::Yuv420P10);
        assert_eq!(frame.planes[0].stride, 32);
    }
}

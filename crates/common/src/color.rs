//! Color space, pixel format, and transfer function types.
//!
//! The code-point enums follow ITU-T H.273 (the values carried in
//! container color boxes and codec VUI). Unknown code points map to an
//! explicit `Unknown` variant rather than silently defaulting — the only
//! sanctioned guesses are [`ColorDescription::guess_for_resolution`] (the
//! SD/HD heuristic) and the JPEG/full-range rule, both opt-in.

use serde::{Deserialize, Serialize};

use crate::types::Resolution;

/// Pixel format of decoded frame data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 8-bit.
    #[default]
    Yuv420,
    /// Planar YUV 4:2:2, 8-bit.
    Yuv422,
    /// Planar YUV 4:4:4, 8-bit.
    Yuv444,
    /// Planar YUV 4:2:0 with alpha plane, 8-bit.
    Yuva420,
    /// Planar YUV 4:2:0, 10-bit.
    Yuv420P10,
    /// Planar YUV 4:2:2, 10-bit.
    Yuv422P10,
    /// Planar YUV 4:4:4, 10-bit.
    Yuv444P10,
    /// Planar YUV 4:2:0, 12-bit.
    Yuv420P12,
    /// NV12: Y plane + interleaved UV at half resolution (HW decoder output).
    Nv12,
    /// P010: 10-bit NV12 variant (HDR content).
    P010,
    /// Not representable — carries no layout information.
    Unknown,
}

/// Chroma subsampling of a planar YUV layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromaSubsampling {
    /// 4:2:0 — chroma at half resolution both ways.
    C420,
    /// 4:2:2 — chroma at half horizontal resolution.
    C422,
    /// 4:4:4 — full-resolution chroma.
    C444,
}

impl PixelFormat {
    /// Map a planar layout description to the internal pixel format.
    ///
    /// Unsupported bit depths return [`PixelFormat::Unknown`] — never a guess.
    pub fn from_layout(subsampling: ChromaSubsampling, bit_depth: u8, alpha: bool) -> Self {
        use ChromaSubsampling::*;
        match (subsampling, bit_depth, alpha) {
            (C420, 8, false) => Self::Yuv420,
            (C420, 8, true) => Self::Yuva420,
            (C422, 8, false) => Self::Yuv422,
            (C444, 8, false) => Self::Yuv444,
            (C420, 10, false) => Self::Yuv420P10,
            (C422, 10, false) => Self::Yuv422P10,
            (C444, 10, false) => Self::Yuv444P10,
            (C420, 12, false) => Self::Yuv420P12,
            _ => Self::Unknown,
        }
    }

    /// Number of planes in this format (0 for `Unknown`).
    pub fn plane_count(self) -> usize {
        match self {
            Self::Yuva420 => 4,
            Self::Nv12 | Self::P010 => 2,
            Self::Unknown => 0,
            _ => 3,
        }
    }

    /// Bytes per sample in the luma plane.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Yuv420P10 | Self::Yuv422P10 | Self::Yuv444P10 | Self::Yuv420P12 | Self::P010 => 2,
            _ => 1,
        }
    }

    /// Plane dimensions for a frame of `res`, as (width, height) pairs in
    /// samples. Chroma planes are rounded up for odd sizes.
    pub fn plane_dimensions(self, res: Resolution) -> Vec<(u32, u32)> {
        let (w, h) = (res.width, res.height);
        let half_w = w.div_ceil(2);
        let half_h = h.div_ceil(2);
        match self {
            Self::Yuv420 | Self::Yuv420P10 | Self::Yuv420P12 => {
                vec![(w, h), (half_w, half_h), (half_w, half_h)]
            }
            Self::Yuva420 => vec![(w, h), (half_w, half_h), (half_w, half_h), (w, h)],
            Self::Yuv422 | Self::Yuv422P10 => vec![(w, h), (half_w, h), (half_w, h)],
            Self::Yuv444 | Self::Yuv444P10 => vec![(w, h), (w, h), (w, h)],
            // Interleaved UV counts as one plane of full width.
            Self::Nv12 | Self::P010 => vec![(w, h), (w, half_h)],
            Self::Unknown => Vec::new(),
        }
    }
}

/// Color primaries (H.273 table 2).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorPrimaries {
    Bt709,
    Bt470M,
    Bt470Bg,
    Smpte170M,
    Bt2020,
    #[default]
    Unknown,
}

impl ColorPrimaries {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Bt709,
            4 => Self::Bt470M,
            5 => Self::Bt470Bg,
            6 => Self::Smpte170M,
            9 => Self::Bt2020,
            _ => Self::Unknown,
        }
    }
}

/// Transfer characteristics (H.273 table 3).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferFunction {
    Bt709,
    Smpte170M,
    Linear,
    Srgb,
    /// PQ (Perceptual Quantizer, HDR10).
    Pq,
    /// HLG (Hybrid Log-Gamma, broadcast HDR).
    Hlg,
    #[default]
    Unknown,
}

impl TransferFunction {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Bt709,
            6 => Self::Smpte170M,
            8 => Self::Linear,
            13 => Self::Srgb,
            16 => Self::Pq,
            18 => Self::Hlg,
            _ => Self::Unknown,
        }
    }
}

/// Matrix coefficients (H.273 table 4).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMatrix {
    /// Identity (GBR).
    Rgb,
    Bt709,
    Bt470Bg,
    Smpte170M,
    Bt2020Ncl,
    #[default]
    Unknown,
}

impl ColorMatrix {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Rgb,
            1 => Self::Bt709,
            5 => Self::Bt470Bg,
            6 => Self::Smpte170M,
            9 => Self::Bt2020Ncl,
            _ => Self::Unknown,
        }
    }
}

/// Sample range.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorRange {
    /// Limited/studio range (16-235 for 8-bit luma).
    #[default]
    Limited,
    /// Full range (0-255), the JPEG convention.
    Full,
}

/// Combined color metadata for a stream or frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorDescription {
    pub primaries: ColorPrimaries,
    pub transfer: TransferFunction,
    pub matrix: ColorMatrix,
    pub range: ColorRange,
}

impl ColorDescription {
    /// Rec.709 (HD video standard), limited range.
    pub const REC709: Self = Self {
        primaries: ColorPrimaries::Bt709,
        transfer: TransferFunction::Bt709,
        matrix: ColorMatrix::Bt709,
        range: ColorRange::Limited,
    };

    /// Rec.601 (SD video standard), limited range.
    pub const REC601: Self = Self {
        primaries: ColorPrimaries::Smpte170M,
        transfer: TransferFunction::Smpte170M,
        matrix: ColorMatrix::Smpte170M,
        range: ColorRange::Limited,
    };

    /// JPEG: Rec.601 matrix with full range.
    pub const JPEG: Self = Self {
        primaries: ColorPrimaries::Bt709,
        transfer: TransferFunction::Srgb,
        matrix: ColorMatrix::Smpte170M,
        range: ColorRange::Full,
    };

    /// Decode the three H.273 code points plus a full-range flag.
    ///
    /// A full-range flag takes precedence and yields the JPEG description,
    /// matching the container convention where the YUVJ formats implied
    /// full-range Rec.601.
    pub fn from_coded(primaries: u8, transfer: u8, matrix: u8, full_range: bool) -> Self {
        if full_range {
            return Self::JPEG;
        }
        Self {
            primaries: ColorPrimaries::from_code(primaries),
            transfer: TransferFunction::from_code(transfer),
            matrix: ColorMatrix::from_code(matrix),
            range: ColorRange::Limited,
        }
    }

    /// True when at least one field carries real information.
    pub fn is_specified(&self) -> bool {
        self.primaries != ColorPrimaries::Unknown
            || self.transfer != TransferFunction::Unknown
            || self.matrix != ColorMatrix::Unknown
            || self.range == ColorRange::Full
    }

    /// The documented SD/HD heuristic: SD video is usually Rec.601 and HD
    /// is usually Rec.709. Only meaningful when no explicit metadata was
    /// present; callers must check [`is_specified`](Self::is_specified) first.
    pub fn guess_for_resolution(res: Resolution) -> Self {
        if res.is_hd() {
            Self::REC709
        } else {
            Self::REC601
        }
    }
}

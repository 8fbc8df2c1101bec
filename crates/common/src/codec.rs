//! Codec metadata translation — container enumerations to internal types.
//!
//! Pure, side-effect-free mappings between the identifiers containers carry
//! (sample-entry FourCCs, storage sample formats, channel masks) and the
//! internal codec representation. Unknown values map to an explicit
//! `Unknown`/`Unsupported` sentinel; the only guesses are the documented
//! heuristics (channel-layout-from-channel-count, and the SD/HD color rule
//! which lives in [`crate::color`]).

use serde::{Deserialize, Serialize};

// ─── FourCC helpers ──────────────────────────────────────────────────

/// Convert 4 ASCII bytes to a u32 FourCC code.
pub const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 16) | ((c as u32) << 8) | (d as u32)
}

/// Convert a FourCC u32 to a human-readable string for logging.
pub fn fourcc_to_string(cc: u32) -> String {
    cc.to_be_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}

// Video sample-entry FourCCs.
const AVC1: u32 = fourcc(b'a', b'v', b'c', b'1');
const AVC3: u32 = fourcc(b'a', b'v', b'c', b'3');
const HEV1: u32 = fourcc(b'h', b'e', b'v', b'1');
const HVC1: u32 = fourcc(b'h', b'v', b'c', b'1');
const VP09: u32 = fourcc(b'v', b'p', b'0', b'9');
const AV01: u32 = fourcc(b'a', b'v', b'0', b'1');
const MP4V: u32 = fourcc(b'm', b'p', b'4', b'v');
const MPG2: u32 = fourcc(b'm', b'p', b'g', b'2');
const MPG1: u32 = fourcc(b'm', b'p', b'g', b'1');
const S263: u32 = fourcc(b's', b'2', b'6', b'3');

// Audio sample-entry FourCCs.
const MP4A: u32 = fourcc(b'm', b'p', b'4', b'a');
const OPUS: u32 = fourcc(b'O', b'p', b'u', b's');
const FLAC: u32 = fourcc(b'f', b'L', b'a', b'C');
const MP3_: u32 = fourcc(b'.', b'm', b'p', b'3');
const ALAC: u32 = fourcc(b'a', b'l', b'a', b'c');
const VORB: u32 = fourcc(b'v', b'o', b'r', b'b');
const LPCM: u32 = fourcc(b'l', b'p', b'c', b'm');
const SOWT: u32 = fourcc(b's', b'o', b'w', b't'); // little-endian PCM16
const TWOS: u32 = fourcc(b't', b'w', b'o', b's'); // big-endian PCM16
const IN24: u32 = fourcc(b'i', b'n', b'2', b'4');

// ─── Video codecs ────────────────────────────────────────────────────

/// Video codec identifier.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    H265,
    H263,
    Mpeg1,
    Mpeg2,
    Mpeg4,
    Vp9,
    Av1,
    #[default]
    Unknown,
}

impl VideoCodec {
    /// Map a container sample-entry FourCC to a codec. Unknown FourCCs map
    /// to `Unknown`, never to a guess.
    pub fn from_fourcc(cc: u32) -> Self {
        match cc {
            AVC1 | AVC3 => Self::H264,
            HEV1 | HVC1 => Self::H265,
            VP09 => Self::Vp9,
            AV01 => Self::Av1,
            MP4V => Self::Mpeg4,
            MPG2 => Self::Mpeg2,
            MPG1 => Self::Mpeg1,
            S263 => Self::H263,
            _ => Self::Unknown,
        }
    }

    /// The canonical sample-entry FourCC for this codec, if it has one.
    pub fn to_fourcc(self) -> Option<u32> {
        match self {
            Self::H264 => Some(AVC1),
            Self::H265 => Some(HVC1),
            Self::Vp9 => Some(VP09),
            Self::Av1 => Some(AV01),
            Self::Mpeg4 => Some(MP4V),
            Self::Mpeg2 => Some(MPG2),
            Self::Mpeg1 => Some(MPG1),
            Self::H263 => Some(S263),
            Self::Unknown => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::H264 => "H.264/AVC",
            Self::H265 => "H.265/HEVC",
            Self::H263 => "H.263",
            Self::Mpeg1 => "MPEG-1",
            Self::Mpeg2 => "MPEG-2",
            Self::Mpeg4 => "MPEG-4 Part 2",
            Self::Vp9 => "VP9",
            Self::Av1 => "AV1",
            Self::Unknown => "unknown",
        }
    }
}

// ─── Audio codecs ────────────────────────────────────────────────────

/// Audio codec identifier.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    Alac,
    /// Little-endian interleaved PCM.
    Pcm,
    PcmS16Be,
    PcmS24Be,
    #[default]
    Unknown,
}

impl AudioCodec {
    pub fn from_fourcc(cc: u32) -> Self {
        match cc {
            MP4A => Self::Aac,
            OPUS => Self::Opus,
            FLAC => Self::Flac,
            MP3_ => Self::Mp3,
            ALAC => Self::Alac,
            VORB => Self::Vorbis,
            LPCM | SOWT => Self::Pcm,
            TWOS => Self::PcmS16Be,
            IN24 => Self::PcmS24Be,
            _ => Self::Unknown,
        }
    }
}

// ─── Sample formats ──────────────────────────────────────────────────

/// Sample format as reported by a container or decoder, before any
/// codec-specific disambiguation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageFormat {
    U8,
    S16,
    S32,
    F32,
    PlanarS16,
    PlanarS32,
    PlanarF32,
}

/// Internal sample format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    U8,
    S16,
    /// 24-bit samples carried in 32-bit storage.
    S24,
    S32,
    F32,
    PlanarS16,
    PlanarS32,
    PlanarF32,
    #[default]
    Unknown,
}

impl SampleFormat {
    /// Map a storage format to the internal sample format.
    ///
    /// 24-bit PCM is stored as S32 by decoders, so the codec is consulted
    /// to tell true S32 apart from S24-in-S32.
    pub fn from_storage(storage: StorageFormat, codec: AudioCodec) -> Self {
        match storage {
            StorageFormat::U8 => Self::U8,
            StorageFormat::S16 => Self::S16,
            StorageFormat::S32 => {
                if codec == AudioCodec::PcmS24Be {
                    Self::S24
                } else {
                    Self::S32
                }
            }
            StorageFormat::F32 => Self::F32,
            StorageFormat::PlanarS16 => Self::PlanarS16,
            StorageFormat::PlanarS32 => Self::PlanarS32,
            StorageFormat::PlanarF32 => Self::PlanarF32,
        }
    }

    /// Map back to the storage format a decoder would use.
    pub fn to_storage(self) -> Option<StorageFormat> {
        match self {
            Self::U8 => Some(StorageFormat::U8),
            Self::S16 => Some(StorageFormat::S16),
            // 24-bit is carried in 32-bit storage.
            Self::S24 | Self::S32 => Some(StorageFormat::S32),
            Self::F32 => Some(StorageFormat::F32),
            Self::PlanarS16 => Some(StorageFormat::PlanarS16),
            Self::PlanarS32 => Some(StorageFormat::PlanarS32),
            Self::PlanarF32 => Some(StorageFormat::PlanarF32),
            Self::Unknown => None,
        }
    }
}

// ─── Channel layouts ─────────────────────────────────────────────────

// WAVE-format channel mask bits (subset used by the defined layouts).
const CH_FRONT_LEFT: u64 = 0x1;
const CH_FRONT_RIGHT: u64 = 0x2;
const CH_FRONT_CENTER: u64 = 0x4;
const CH_LFE: u64 = 0x8;
const CH_BACK_LEFT: u64 = 0x10;
const CH_BACK_RIGHT: u64 = 0x20;
const CH_BACK_CENTER: u64 = 0x100;
const CH_SIDE_LEFT: u64 = 0x200;
const CH_SIDE_RIGHT: u64 = 0x400;

/// Speaker layout of an audio stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// L R C.
    Surround,
    /// L R BL BR.
    Quad,
    FivePointZero,
    FivePointOne,
    SixPointOne,
    SevenPointOne,
    /// Channel count known but no defined layout.
    #[default]
    Unsupported,
}

impl ChannelLayout {
    /// Map a WAVE-style channel mask to a layout. Masks without a defined
    /// layout fall back to the channel-count guess — containers commonly
    /// write a zero mask for WAV and MP3.
    pub fn from_mask(mask: u64, channels: u16) -> Self {
        const MONO: u64 = CH_FRONT_CENTER;
        const STEREO: u64 = CH_FRONT_LEFT | CH_FRONT_RIGHT;
        const SURROUND: u64 = STEREO | CH_FRONT_CENTER;
        const QUAD: u64 = STEREO | CH_BACK_LEFT | CH_BACK_RIGHT;
        const FIVE_ZERO: u64 = SURROUND | CH_SIDE_LEFT | CH_SIDE_RIGHT;
        const FIVE_ONE: u64 = FIVE_ZERO | CH_LFE;
        const SIX_ONE: u64 = FIVE_ONE | CH_BACK_CENTER;
        const SEVEN_ONE: u64 = FIVE_ONE | CH_BACK_LEFT | CH_BACK_RIGHT;

        match mask {
            MONO => Self::Mono,
            STEREO => Self::Stereo,
            SURROUND => Self::Surround,
            QUAD => Self::Quad,
            FIVE_ZERO => Self::FivePointZero,
            FIVE_ONE => Self::FivePointOne,
            SIX_ONE => Self::SixPointOne,
            SEVEN_ONE => Self::SevenPointOne,
            _ => Self::guess_from_channels(channels),
        }
    }

    /// Heuristic fallback: guess a layout from the channel count alone.
    pub fn guess_from_channels(channels: u16) -> Self {
        match channels {
            1 => Self::Mono,
            2 => Self::Stereo,
            3 => Self::Surround,
            4 => Self::Quad,
            5 => Self::FivePointZero,
            6 => Self::FivePointOne,
            7 => Self::SixPointOne,
            8 => Self::SevenPointOne,
            _ => Self::Unsupported,
        }
    }

    /// Number of channels in this layout (0 for `Unsupported`).
    pub fn channel_count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround => 3,
            Self::Quad => 4,
            Self::FivePointZero => 5,
            Self::FivePointOne => 6,
            Self::SixPointOne => 7,
            Self::SevenPointOne => 8,
            Self::Unsupported => 0,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_fourcc_roundtrip() {
        for codec in [
            VideoCodec::H264,
            VideoCodec::H265,
            VideoCodec::Vp9,
            VideoCodec::Av1,
            VideoCodec::Mpeg2,
        ] {
            let cc = codec.to_fourcc().unwrap();
            assert_eq!(VideoCodec::from_fourcc(cc), codec);
        }
    }

    #[test]
    fn avc_variants_map_to_h264() {
        assert_eq!(VideoCodec::from_fourcc(AVC1), VideoCodec::H264);
        assert_eq!(VideoCodec::from_fourcc(AVC3), VideoCodec::H264);
        assert_eq!(VideoCodec::from_fourcc(HEV1), VideoCodec::H265);
        assert_eq!(VideoCodec::from_fourcc(HVC1), VideoCodec::H265);
    }

    #[test]
    fn unknown_fourcc_is_sentinel() {
        let cc = fourcc(b'z', b'z', b'z', b'z');
        assert_eq!(VideoCodec::from_fourcc(cc), VideoCodec::Unknown);
        assert_eq!(AudioCodec::from_fourcc(cc), AudioCodec::Unknown);
        assert_eq!(VideoCodec::Unknown.to_fourcc(), None);
    }

    #[test]
    fn fourcc_display() {
        assert_eq!(fourcc_to_string(AVC1), "avc1");
        assert_eq!(fourcc_to_string(0x0000_0001), "????");
    }

    #[test]
    fn s24_disambiguation() {
        // S32 storage is S24 only for the 24-bit PCM codec.
        assert_eq!(
            SampleFormat::from_storage(StorageFormat::S32, AudioCodec::PcmS24Be),
            SampleFormat::S24
        );
        assert_eq!(
            SampleFormat::from_storage(StorageFormat::S32, AudioCodec::Flac),
            SampleFormat::S32
        );
        // Both map back to S32 storage.
        assert_eq!(SampleFormat::S24.to_storage(), Some(StorageFormat::S32));
        assert_eq!(SampleFormat::S32.to_storage(), Some(StorageFormat::S32));
    }

    #[test]
    fn channel_mask_layouts() {
        assert_eq!(ChannelLayout::from_mask(0x3, 2), ChannelLayout::Stereo);
        assert_eq!(ChannelLayout::from_mask(0x4, 1), ChannelLayout::Mono);
        assert_eq!(
            ChannelLayout::from_mask(0x60F, 6),
            ChannelLayout::FivePointOne
        );
    }

    #[test]
    fn zero_mask_guesses_from_count() {
        // WAV and MP3 commonly carry no mask.
        assert_eq!(ChannelLayout::from_mask(0, 2), ChannelLayout::Stereo);
        assert_eq!(ChannelLayout::from_mask(0, 6), ChannelLayout::FivePointOne);
        assert_eq!(ChannelLayout::from_mask(0, 9), ChannelLayout::Unsupported);
    }

    #[test]
    fn layout_channel_counts() {
        for n in 1..=8u16 {
            assert_eq!(ChannelLayout::guess_from_channels(n).channel_count(), n);
        }
        assert_eq!(ChannelLayout::Unsupported.channel_count(), 0);
    }
}

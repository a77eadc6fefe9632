//! PCM format descriptors
//!
//! Every sample the engine stores or mixes is in the canonical format:
//! 44100 Hz, 16-bit signed, 2 channels, little-endian. Other descriptors
//! describe what a decoder produced before normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical sample rate
pub const SAMPLE_RATE: u32 = 44100;

/// Canonical bit depth
pub const BITS_PER_SAMPLE: u16 = 16;

/// Canonical channel count (fixed, the engine never mixes more than stereo)
pub const CHANNELS: u16 = 2;

/// Bytes in one canonical stereo frame (2 bytes left + 2 bytes right)
pub const FRAME_SIZE: usize = 4;

/// Bytes one frame occupies in a single de-interleaved channel array
pub const BYTES_PER_CHANNEL_FRAME: usize = FRAME_SIZE / CHANNELS as usize;

/// Numeric representation of individual samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// Two's complement integer
    Signed,
    /// Offset-binary integer (midpoint is silence)
    Unsigned,
    /// IEEE 754 float, nominal range [-1.0, 1.0]
    Float,
}

/// Declared layout of a PCM byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub encoding: SampleEncoding,
    pub big_endian: bool,
}

impl PcmFormat {
    /// The engine's internal representation
    pub const CANONICAL: PcmFormat = PcmFormat::signed(SAMPLE_RATE, 16, 2);

    /// 44.1 kHz 16-bit mono, treated as stereo by duplicating the channel
    pub const MONO_16: PcmFormat = PcmFormat::signed(SAMPLE_RATE, 16, 1);

    /// 44.1 kHz 8-bit signed mono, the intermediate for manual upconversion
    pub const MONO_8: PcmFormat = PcmFormat::signed(SAMPLE_RATE, 8, 1);

    /// 44.1 kHz 8-bit signed stereo, the intermediate for manual upconversion
    pub const STEREO_8: PcmFormat = PcmFormat::signed(SAMPLE_RATE, 8, 2);

    /// Little-endian signed integer format
    pub const fn signed(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            bits_per_sample,
            channels,
            encoding: SampleEncoding::Signed,
            big_endian: false,
        }
    }

    /// Bytes per single-channel sample
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize).div_ceil(8)
    }

    /// Bytes per interleaved frame across all channels
    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// Format equivalence.
    ///
    /// Byte order is irrelevant for single-byte samples, so two 8-bit formats
    /// that differ only in declared endianness match.
    pub fn matches(&self, other: &PcmFormat) -> bool {
        let same_order = self.big_endian == other.big_endian || self.bits_per_sample <= 8;
        self.sample_rate == other.sample_rate
            && self.bits_per_sample == other.bits_per_sample
            && self.channels == other.channels
            && self.encoding == other.encoding
            && same_order
    }

    /// True if no conversion is needed before use (canonical stereo or
    /// canonical-rate 16-bit mono)
    pub fn is_directly_usable(&self) -> bool {
        self.matches(&Self::CANONICAL) || self.matches(&Self::MONO_16)
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = match self.encoding {
            SampleEncoding::Signed => "signed",
            SampleEncoding::Unsigned => "unsigned",
            SampleEncoding::Float => "float",
        };
        write!(
            f,
            "{} Hz, {}-bit {}, {} ch, {}",
            self.sample_rate,
            self.bits_per_sample,
            encoding,
            self.channels,
            if self.big_endian { "BE" } else { "LE" }
        )
    }
}

/// Convert a frame index to a byte offset within one channel array
pub fn frames_to_channel_bytes(frames: u64) -> u64 {
    frames * BYTES_PER_CHANNEL_FRAME as u64
}

/// Convert a byte offset within one channel array to a frame index
pub fn channel_bytes_to_frames(bytes: u64) -> u64 {
    bytes / BYTES_PER_CHANNEL_FRAME as u64
}

/// Convert seconds to a byte offset within one channel array
///
/// Truncates to a whole frame so the offset is always sample-aligned.
pub fn seconds_to_channel_bytes(seconds: f64) -> u64 {
    let frames = (seconds * SAMPLE_RATE as f64).max(0.0) as u64;
    frames_to_channel_bytes(frames)
}

/// Convert a byte offset within one channel array to seconds
pub fn channel_bytes_to_seconds(bytes: u64) -> f64 {
    channel_bytes_to_frames(bytes) as f64 / SAMPLE_RATE as f64
}

//! Platform format conversion
//!
//! Converts interleaved PCM between a decoder's native layout and a target
//! layout at the canonical rate. Channel counts are never changed here; the
//! normalizer duplicates mono itself. 8-bit sources can only be converted
//! to 8-bit targets; wider integer and float sources only to 16-bit.

use crate::audio::resampler::Resampler;
use crate::error::{Error, Result};
use pcmix_common::format::SAMPLE_RATE;
use pcmix_common::{PcmFormat, SampleEncoding};
use tracing::debug;

/// Format conversion capability queries and execution
pub struct FormatConverter;

impl FormatConverter {
    /// True if [`FormatConverter::convert`] can turn `source` into `target`
    pub fn is_conversion_supported(target: &PcmFormat, source: &PcmFormat) -> bool {
        if target.sample_rate != SAMPLE_RATE
            || target.encoding != SampleEncoding::Signed
            || target.big_endian
        {
            return false;
        }
        if source.channels != target.channels || !(1..=2).contains(&source.channels) {
            return false;
        }
        if source.sample_rate == 0 || !Self::is_decodable(source) {
            return false;
        }

        match source.bits_per_sample {
            8 => target.bits_per_sample == 8,
            _ => target.bits_per_sample == 16,
        }
    }

    /// Convert interleaved `bytes` in `source` layout to `target` layout.
    ///
    /// A trailing partial frame is dropped.
    ///
    /// # Errors
    /// `UnsupportedFormat` if the conversion is not supported
    pub fn convert(target: &PcmFormat, source: &PcmFormat, bytes: &[u8]) -> Result<Vec<u8>> {
        if !Self::is_conversion_supported(target, source) {
            return Err(Error::UnsupportedFormat(format!(
                "No conversion from [{}] to [{}]",
                source, target
            )));
        }

        let usable = bytes.len() - bytes.len() % source.frame_size();
        let samples = Self::decode_samples(source, &bytes[..usable]);

        debug!(
            "Converting {} samples from [{}] to [{}]",
            samples.len(),
            source,
            target
        );

        let samples = Resampler::resample(&samples, source.sample_rate, source.channels)?;

        Ok(match target.bits_per_sample {
            8 => samples.iter().map(|&s| Self::encode_8(s) as u8).collect(),
            _ => {
                let mut out = Vec::with_capacity(samples.len() * 2);
                for &s in &samples {
                    out.extend_from_slice(&Self::encode_16(s).to_le_bytes());
                }
                out
            }
        })
    }

    fn is_decodable(format: &PcmFormat) -> bool {
        match format.encoding {
            SampleEncoding::Float => matches!(format.bits_per_sample, 32 | 64),
            SampleEncoding::Signed | SampleEncoding::Unsigned => {
                matches!(format.bits_per_sample, 8 | 16 | 24 | 32)
            }
        }
    }

    /// Decode interleaved samples to f32 in [-1.0, 1.0]
    fn decode_samples(format: &PcmFormat, bytes: &[u8]) -> Vec<f32> {
        let width = format.bytes_per_sample();
        bytes
            .chunks_exact(width)
            .map(|raw| Self::decode_one(format, raw))
            .collect()
    }

    fn decode_one(format: &PcmFormat, raw: &[u8]) -> f32 {
        let be = format.big_endian;
        match (format.encoding, format.bits_per_sample) {
            (SampleEncoding::Signed, 8) => raw[0] as i8 as f32 / 128.0,
            (SampleEncoding::Unsigned, 8) => (raw[0] as f32 - 128.0) / 128.0,
            (SampleEncoding::Signed, 16) => {
                let bytes = [raw[0], raw[1]];
                let v = if be { i16::from_be_bytes(bytes) } else { i16::from_le_bytes(bytes) };
                v as f32 / 32768.0
            }
            (SampleEncoding::Unsigned, 16) => {
                let bytes = [raw[0], raw[1]];
                let v = if be { u16::from_be_bytes(bytes) } else { u16::from_le_bytes(bytes) };
                (v as f32 - 32768.0) / 32768.0
            }
            (encoding, 24) => {
                let (lo, mid, hi) = if be { (raw[2], raw[1], raw[0]) } else { (raw[0], raw[1], raw[2]) };
                let unsigned = (lo as u32) | ((mid as u32) << 8) | ((hi as u32) << 16);
                let v = if encoding == SampleEncoding::Unsigned {
                    unsigned as i32 - 0x80_0000
                } else {
                    // sign-extend from 24 bits
                    ((unsigned << 8) as i32) >> 8
                };
                v as f32 / 8_388_608.0
            }
            (SampleEncoding::Signed, 32) => {
                let bytes = [raw[0], raw[1], raw[2], raw[3]];
                let v = if be { i32::from_be_bytes(bytes) } else { i32::from_le_bytes(bytes) };
                (v as f64 / 2_147_483_648.0) as f32
            }
            (SampleEncoding::Unsigned, 32) => {
                let bytes = [raw[0], raw[1], raw[2], raw[3]];
                let v = if be { u32::from_be_bytes(bytes) } else { u32::from_le_bytes(bytes) };
                ((v as f64 - 2_147_483_648.0) / 2_147_483_648.0) as f32
            }
            (SampleEncoding::Float, 32) => {
                let bytes = [raw[0], raw[1], raw[2], raw[3]];
                if be { f32::from_be_bytes(bytes) } else { f32::from_le_bytes(bytes) }
            }
            (SampleEncoding::Float, 64) => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&raw[..8]);
                (if be { f64::from_be_bytes(bytes) } else { f64::from_le_bytes(bytes) }) as f32
            }
            _ => 0.0,
        }
    }

    fn encode_16(sample: f32) -> i16 {
        (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }

    fn encode_8(sample: f32) -> i8 {
        (sample * 128.0).round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
    }
}

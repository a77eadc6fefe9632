//! Format normalization
//!
//! Turns a decoded [`PcmStream`] of any supported layout into
//! [`CanonicalPcm`]. The conversion path is chosen in this order:
//!
//! 1. Canonical stereo or canonical-rate 16-bit mono: used as is
//! 2. Direct conversion to canonical stereo
//! 3. Conversion to 16-bit mono, duplicated to both channels
//! 4. 8-bit sources: conversion to 8-bit, then manual upconversion to 16-bit
//! 5. Otherwise the stream is rejected as unsupported

use crate::audio::convert::FormatConverter;
use crate::audio::types::{CanonicalPcm, PcmStream};
use crate::error::{Error, Result};
use pcmix_common::PcmFormat;
use tracing::{debug, info};

/// Largest frame count a canonical buffer may hold
pub const MAX_FRAMES: u64 = i32::MAX as u64;

/// Normalize a decoded stream to canonical stereo.
///
/// # Errors
/// - `ResourceTooLarge` if the declared or actual frame count exceeds [`MAX_FRAMES`]
/// - `UnsupportedFormat` if no conversion path exists
/// - `Io` if reading the stream fails
pub fn normalize(stream: PcmStream) -> Result<CanonicalPcm> {
    let format = stream.format();

    if let Some(frames) = stream.declared_frames() {
        check_frame_count(frames)?;
    }

    if format.is_directly_usable() {
        debug!("Stream already canonical: [{}]", format);
        let bytes = read_checked(stream)?;
        return split_channels(bytes, format.channels);
    }

    if FormatConverter::is_conversion_supported(&PcmFormat::CANONICAL, &format) {
        debug!("Converting [{}] directly to canonical", format);
        let bytes = read_checked(stream)?;
        let converted = FormatConverter::convert(&PcmFormat::CANONICAL, &format, &bytes)?;
        return split_channels(converted, 2);
    }

    if FormatConverter::is_conversion_supported(&PcmFormat::MONO_16, &format) {
        debug!("Converting [{}] to 16-bit mono", format);
        let bytes = read_checked(stream)?;
        let converted = FormatConverter::convert(&PcmFormat::MONO_16, &format, &bytes)?;
        return split_channels(converted, 1);
    }

    if let Some(intermediate) = eight_bit_intermediate(&format) {
        debug!("Converting [{}] via [{}]", format, intermediate);
        let bytes = read_checked(stream)?;
        let eight_bit = if format.matches(&intermediate) {
            bytes
        } else {
            FormatConverter::convert(&intermediate, &format, &bytes)?
        };
        let upconverted = upconvert_8_bit(&eight_bit)?;
        return split_channels(upconverted, intermediate.channels);
    }

    info!("No conversion path for [{}]", format);
    Err(Error::UnsupportedFormat(format!(
        "Cannot convert [{}] to [{}]",
        format,
        PcmFormat::CANONICAL
    )))
}

/// Pick the 8-bit layout a stream can reach, stereo preferred
fn eight_bit_intermediate(format: &PcmFormat) -> Option<PcmFormat> {
    [PcmFormat::STEREO_8, PcmFormat::MONO_8]
        .into_iter()
        .find(|candidate| {
            format.matches(candidate) || FormatConverter::is_conversion_supported(candidate, format)
        })
}

/// Read a stream fully and check its actual frame count
fn read_checked(stream: PcmStream) -> Result<Vec<u8>> {
    let frame_size = stream.format().frame_size().max(1);
    let bytes = stream.read_all()?;
    check_frame_count((bytes.len() / frame_size) as u64)?;
    Ok(bytes)
}

fn check_frame_count(frames: u64) -> Result<()> {
    if frames > MAX_FRAMES {
        return Err(Error::ResourceTooLarge(format!(
            "{} frames exceeds the limit of {}",
            frames, MAX_FRAMES
        )));
    }
    Ok(())
}

/// Manually upconvert signed 8-bit samples to 16-bit little-endian.
///
/// Each sample is scaled to [-1.0, 1.0] with asymmetric divisors (128 for
/// negatives, 127 for positives) so both extremes reach full scale.
pub fn upconvert_8_bit(samples: &[u8]) -> Result<Vec<u8>> {
    let size = samples.len().checked_mul(2).ok_or_else(|| {
        Error::ResourceTooLarge(format!("{} samples cannot be upconverted", samples.len()))
    })?;

    let mut out = Vec::with_capacity(size);
    for &byte in samples {
        let s = byte as i8;
        let f = if s < 0 { s as f64 / 128.0 } else { s as f64 / 127.0 };
        let value = (f.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

/// De-interleave 16-bit little-endian samples into left/right arrays.
///
/// Mono input is shared by both channels. A trailing partial frame is dropped.
pub fn split_channels(bytes: Vec<u8>, channels: u16) -> Result<CanonicalPcm> {
    match channels {
        1 => {
            let mut bytes = bytes;
            bytes.truncate(bytes.len() & !1);
            CanonicalPcm::from_mono(bytes)
        }
        2 => {
            let frames = bytes.len() / 4;
            let mut left = Vec::with_capacity(frames * 2);
            let mut right = Vec::with_capacity(frames * 2);
            for frame in bytes.chunks_exact(4) {
                left.extend_from_slice(&frame[0..2]);
                right.extend_from_slice(&frame[2..4]);
            }
            CanonicalPcm::new(left, right)
        }
        n => Err(Error::UnsupportedFormat(format!(
            "Cannot split {} channels into stereo",
            n
        ))),
    }
}

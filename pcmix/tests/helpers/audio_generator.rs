//! Audio test file generation
//!
//! Writes deterministic WAV files (and in-memory WAV images) with hound so
//! the decoder and normalizer can be exercised end to end.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::io::Cursor;
use std::path::Path;

/// Integer WAV layout
pub fn int_spec(sample_rate: u32, channels: u16, bits_per_sample: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format: SampleFormat::Int,
    }
}

/// Write a WAV where every sample of every channel holds `value`.
///
/// # Arguments
/// * `path` - Output file path
/// * `spec` - Layout; 8-bit and 16-bit integer are supported
/// * `value` - Sample value in the range of the bit depth
/// * `frames` - Number of frames
pub fn generate_constant_wav<P: AsRef<Path>>(
    path: P,
    spec: WavSpec,
    value: i32,
    frames: u32,
) -> Result<(), hound::Error> {
    let samples = vec![value; frames as usize * spec.channels as usize];
    generate_wav(path, spec, &samples)
}

/// Write interleaved samples to a WAV file
pub fn generate_wav<P: AsRef<Path>>(path: P, spec: WavSpec, samples: &[i32]) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec)?;
    write_samples(&mut writer, spec, samples)?;
    writer.finalize()
}

/// Build an in-memory WAV image of interleaved samples
pub fn wav_bytes(spec: WavSpec, samples: &[i32]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).expect("wav header");
        write_samples(&mut writer, spec, samples).expect("wav samples");
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

/// Write a 16-bit sine wave, same signal on every channel
///
/// # Arguments
/// * `path` - Output file path
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - 1 or 2
/// * `duration_ms` - Duration in milliseconds
/// * `frequency_hz` - Sine frequency (e.g. 440.0)
/// * `amplitude` - 0.0 to 1.0
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = int_spec(sample_rate, channels, 16);
    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = (sample_rate as u64 * duration_ms) / 1000;
    let peak = amplitude * i16::MAX as f32;

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / sample_rate as f32;
        let sample = ((2.0 * PI * frequency_hz * t).sin() * peak) as i16;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()
}

fn write_samples<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    spec: WavSpec,
    samples: &[i32],
) -> Result<(), hound::Error> {
    for &s in samples {
        match spec.bits_per_sample {
            8 => writer.write_sample(s as i8)?,
            16 => writer.write_sample(s as i16)?,
            _ => writer.write_sample(s)?,
        }
    }
    Ok(())
}

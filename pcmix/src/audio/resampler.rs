//! Sample rate conversion using rubato
//!
//! Brings decoded audio to the canonical 44.1kHz rate. Operates on
//! interleaved f32 samples; the converter handles integer encodings.

use crate::error::{Error, Result};
use pcmix_common::format::SAMPLE_RATE;
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio to the canonical rate.
    ///
    /// # Arguments
    /// - `input`: Interleaved audio samples
    /// - `input_rate`: Input sample rate
    /// - `channels`: Number of channels
    ///
    /// # Returns
    /// Resampled interleaved audio at 44.1kHz. Input already at 44.1kHz is
    /// returned as a copy.
    pub fn resample(input: &[f32], input_rate: u32, channels: u16) -> Result<Vec<f32>> {
        let output_rate = SAMPLE_RATE;

        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }
        if input_rate == 0 || channels == 0 {
            return Err(Error::UnsupportedFormat(format!(
                "Cannot resample {} channels at {}Hz",
                channels, input_rate
            )));
        }

        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();
        if input_frames == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz ({} channels)",
            input_frames, input_rate, output_rate, channels
        );

        let mut resampler = Self::create_resampler(input_rate, output_rate, channels, input_frames)?;

        let mut planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::UnsupportedFormat(format!("Resampling failed: {}", e)))?;

        // Flush the filter tail, then drop the leading delay so output lines up with input
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| Error::UnsupportedFormat(format!("Resampling failed: {}", e)))?;
        let delay = resampler.output_delay();
        let expected_frames =
            (input_frames as f64 * output_rate as f64 / input_rate as f64).round() as usize;
        for (channel, tail) in planar_output.iter_mut().zip(tail) {
            channel.extend(tail);
            channel.drain(..delay.min(channel.len()));
            channel.truncate(expected_frames);
        }

        let interleaved_output = Self::interleave(planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved_output.len() / channels as usize
        );

        Ok(interleaved_output)
    }

    /// Create a rubato resampler sized to process the whole input at once.
    fn create_resampler(
        input_rate: u32,
        output_rate: u32,
        channels: u16,
        chunk_size: usize,
    ) -> Result<FastFixedIn<f32>> {
        FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // no runtime ratio changes
            PolynomialDegree::Septic,
            chunk_size,
            channels as usize,
        )
        .map_err(|e| Error::UnsupportedFormat(format!("Failed to create resampler: {}", e)))
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, L, R, ...]
    /// Output: [[L, L, L, ...], [R, R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;

        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (ch_idx, &sample) in frame.iter().enumerate() {
                planar[ch_idx].push(sample);
            }
        }

        planar
    }

    /// Convert planar samples to interleaved format.
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}

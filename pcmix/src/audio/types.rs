//! Core audio data types
//!
//! Defines the decoded-but-not-yet-normalized stream handed over by the
//! decoder, and the canonical per-channel arrays every reference plays from.

use crate::audio::accumulator::ByteAccumulator;
use crate::error::{Error, Result};
use pcmix_common::format::{BYTES_PER_CHANNEL_FRAME, SAMPLE_RATE};
use pcmix_common::PcmFormat;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;

/// A PCM byte stream in some declared format.
///
/// The format may be anything the decoder produced; the normalizer turns it
/// into [`CanonicalPcm`].
pub struct PcmStream {
    format: PcmFormat,
    reader: Box<dyn Read + Send>,
    declared_frames: Option<u64>,
}

impl PcmStream {
    /// Wrap a reader producing interleaved samples in `format`
    pub fn new(format: PcmFormat, reader: Box<dyn Read + Send>) -> Self {
        Self {
            format,
            reader,
            declared_frames: None,
        }
    }

    /// Wrap interleaved samples already held in memory
    pub fn from_bytes(format: PcmFormat, bytes: Vec<u8>) -> Self {
        let frames = if format.frame_size() == 0 {
            0
        } else {
            (bytes.len() / format.frame_size()) as u64
        };
        Self {
            format,
            reader: Box::new(Cursor::new(bytes)),
            declared_frames: Some(frames),
        }
    }

    /// Attach the frame count the producer declared for this stream
    pub fn with_declared_frames(mut self, frames: u64) -> Self {
        self.declared_frames = Some(frames);
        self
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn declared_frames(&self) -> Option<u64> {
        self.declared_frames
    }

    /// Pull the whole stream into memory
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let capacity = self
            .declared_frames
            .and_then(|f| usize::try_from(f).ok())
            .and_then(|f| f.checked_mul(self.format.frame_size()))
            .unwrap_or(0);
        let mut acc = ByteAccumulator::with_capacity(capacity);
        acc.read_to_end(&mut self.reader)?;
        Ok(acc.finish())
    }
}

impl fmt::Debug for PcmStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmStream")
            .field("format", &self.format)
            .field("declared_frames", &self.declared_frames)
            .finish_non_exhaustive()
    }
}

/// Canonical audio split into separate left/right arrays.
///
/// Each array holds 16-bit signed little-endian samples. Mono sources share
/// one allocation between both channels.
#[derive(Clone)]
pub struct CanonicalPcm {
    left: Arc<[u8]>,
    right: Arc<[u8]>,
}

impl CanonicalPcm {
    /// Build from two channel arrays
    ///
    /// # Errors
    /// `InvalidArgument` if the arrays differ in length or hold a partial sample
    pub fn new(left: Vec<u8>, right: Vec<u8>) -> Result<Self> {
        if left.len() != right.len() {
            return Err(Error::InvalidArgument(format!(
                "Channel lengths differ: left={} right={}",
                left.len(),
                right.len()
            )));
        }
        if left.len() % BYTES_PER_CHANNEL_FRAME != 0 {
            return Err(Error::InvalidArgument(format!(
                "Channel length {} is not a whole number of samples",
                left.len()
            )));
        }
        Ok(Self {
            left: left.into(),
            right: right.into(),
        })
    }

    /// Build from a single channel played on both sides
    pub fn from_mono(samples: Vec<u8>) -> Result<Self> {
        if samples.len() % BYTES_PER_CHANNEL_FRAME != 0 {
            return Err(Error::InvalidArgument(format!(
                "Channel length {} is not a whole number of samples",
                samples.len()
            )));
        }
        let shared: Arc<[u8]> = samples.into();
        Ok(Self {
            left: Arc::clone(&shared),
            right: shared,
        })
    }

    /// Build from interleaved 16-bit sample values (test and tooling helper)
    pub fn from_frames(frames: &[(i16, i16)]) -> Self {
        let mut left = Vec::with_capacity(frames.len() * 2);
        let mut right = Vec::with_capacity(frames.len() * 2);
        for &(l, r) in frames {
            left.extend_from_slice(&l.to_le_bytes());
            right.extend_from_slice(&r.to_le_bytes());
        }
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn left(&self) -> &[u8] {
        &self.left
    }

    pub fn right(&self) -> &[u8] {
        &self.right
    }

    /// Bytes per channel
    pub fn channel_len(&self) -> u64 {
        self.left.len() as u64
    }

    /// Number of stereo frames
    pub fn frames(&self) -> u64 {
        (self.left.len() / BYTES_PER_CHANNEL_FRAME) as u64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / SAMPLE_RATE as f64
    }

    /// True if both channels point at the same data
    pub fn is_shared_mono(&self) -> bool {
        Arc::ptr_eq(&self.left, &self.right)
    }

    /// Sample pair at a channel byte offset
    pub fn sample_pair(&self, position: usize) -> Option<(i16, i16)> {
        let l = self.left.get(position..position + 2)?;
        let r = self.right.get(position..position + 2)?;
        Some((
            i16::from_le_bytes([l[0], l[1]]),
            i16::from_le_bytes([r[0], r[1]]),
        ))
    }
}

impl fmt::Debug for CanonicalPcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalPcm")
            .field("frames", &self.frames())
            .field("shared_mono", &self.is_shared_mono())
            .finish()
    }
}

//! Sample storage behind an audio reference
//!
//! A reference reads sample pairs by channel byte offset and never knows
//! whether they come from memory or from a scratch file.

use crate::audio::scratch::ScratchFile;
use crate::audio::types::CanonicalPcm;
use pcmix_common::format::{BYTES_PER_CHANNEL_FRAME, FRAME_SIZE};
use std::io;
use std::sync::Arc;

/// Random-access canonical sample storage
pub trait SampleSource: Send {
    /// Bytes per channel
    fn channel_len(&self) -> u64;

    /// Sample pair at a channel byte offset. `position` is sample-aligned
    /// and less than [`SampleSource::channel_len`].
    fn read_pair(&mut self, position: u64) -> io::Result<(i16, i16)>;

    /// Drop any held data or file handle
    fn release(&mut self);
}

/// Samples held fully in memory
pub struct MemorySource {
    pcm: CanonicalPcm,
}

impl MemorySource {
    pub fn new(pcm: CanonicalPcm) -> Self {
        Self { pcm }
    }
}

impl SampleSource for MemorySource {
    fn channel_len(&self) -> u64 {
        self.pcm.channel_len()
    }

    fn read_pair(&mut self, position: u64) -> io::Result<(i16, i16)> {
        usize::try_from(position)
            .ok()
            .and_then(|p| self.pcm.sample_pair(p))
            .ok_or_else(|| out_of_range(position))
    }

    fn release(&mut self) {
        self.pcm = CanonicalPcm::from_frames(&[]);
    }
}

/// Samples read from a scratch file in fixed-size chunks.
///
/// A pair outside the buffered window triggers one seek and one chunk read,
/// so sequential playback touches the file once per chunk and a loop wrap
/// costs a single seek.
pub struct StreamedSource {
    file: Option<Arc<ScratchFile>>,
    channel_len: u64,
    chunk: Vec<u8>,
    /// Channel byte offset of the first buffered frame
    chunk_start: u64,
    /// Valid bytes in `chunk`
    valid: usize,
}

impl StreamedSource {
    pub fn new(file: Arc<ScratchFile>, chunk_frames: usize) -> Self {
        let channel_len = file.channel_len();
        Self {
            file: Some(file),
            channel_len,
            chunk: vec![0; chunk_frames.max(1) * FRAME_SIZE],
            chunk_start: 0,
            valid: 0,
        }
    }

    fn refill(&mut self, position: u64) -> io::Result<()> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "scratch file released"))?;
        self.valid = file.read_frames(position, &mut self.chunk)?;
        self.chunk_start = position;
        Ok(())
    }

    /// Offset into `chunk` of the frame at `position`, if buffered
    fn buffered_offset(&self, position: u64) -> Option<usize> {
        let channel_offset = position.checked_sub(self.chunk_start)?;
        let offset = usize::try_from(channel_offset).ok()? * (FRAME_SIZE / BYTES_PER_CHANNEL_FRAME);
        (offset + FRAME_SIZE <= self.valid).then_some(offset)
    }
}

impl SampleSource for StreamedSource {
    fn channel_len(&self) -> u64 {
        self.channel_len
    }

    fn read_pair(&mut self, position: u64) -> io::Result<(i16, i16)> {
        let offset = match self.buffered_offset(position) {
            Some(offset) => offset,
            None => {
                self.refill(position)?;
                self.buffered_offset(position)
                    .ok_or_else(|| out_of_range(position))?
            }
        };
        let frame = &self.chunk[offset..offset + FRAME_SIZE];
        Ok((
            i16::from_le_bytes([frame[0], frame[1]]),
            i16::from_le_bytes([frame[2], frame[3]]),
        ))
    }

    fn release(&mut self) {
        self.file = None;
        self.chunk = Vec::new();
        self.valid = 0;
    }
}

fn out_of_range(position: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("no sample at channel offset {}", position),
    )
}

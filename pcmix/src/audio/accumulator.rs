//! Growable byte accumulator
//!
//! Collects a decoded stream of unknown length into one contiguous array.
//! Reads happen one second of canonical audio at a time; the final array is
//! trimmed to its exact length once the source reports end of stream.

use pcmix_common::format::{FRAME_SIZE, SAMPLE_RATE};
use std::io::{ErrorKind, Read};

/// One second of canonical audio
pub const READ_CHUNK_BYTES: usize = SAMPLE_RATE as usize * FRAME_SIZE;

/// Append-only byte buffer with amortized growth
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    data: Vec<u8>,
}

impl ByteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an initial capacity hint (e.g. a declared stream length)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.data.push(byte);
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drain a reader until end of stream.
    ///
    /// # Returns
    /// Number of bytes appended by this call
    pub fn read_to_end<R: Read + ?Sized>(&mut self, reader: &mut R) -> std::io::Result<usize> {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        let mut total = 0;

        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    self.data.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(total)
    }

    /// Finalize to an exact-length array
    pub fn finish(mut self) -> Vec<u8> {
        self.data.shrink_to_fit();
        self.data
    }
}

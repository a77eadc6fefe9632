//! Scratch files for streamed playback
//!
//! Canonical audio that should not stay resident is written to an unnamed
//! temporary file, interleaved as 4-byte frames. The operating system
//! reclaims the file once the last handle is dropped, so no cleanup pass is
//! needed at shutdown or after a crash.

use crate::audio::types::CanonicalPcm;
use crate::error::Result;
use pcmix_common::format::{BYTES_PER_CHANNEL_FRAME, FRAME_SIZE};
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const WRITE_BUFFER_BYTES: usize = 512 * 1024;

/// Factory for scratch files in one directory
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write canonical audio to a fresh scratch file
    pub fn persist(&self, pcm: &CanonicalPcm) -> Result<Arc<ScratchFile>> {
        std::fs::create_dir_all(&self.dir)?;
        let file = tempfile::tempfile_in(&self.dir)?;

        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);
        for (l, r) in pcm
            .left()
            .chunks_exact(BYTES_PER_CHANNEL_FRAME)
            .zip(pcm.right().chunks_exact(BYTES_PER_CHANNEL_FRAME))
        {
            writer.write_all(l)?;
            writer.write_all(r)?;
        }
        let mut file = writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;

        debug!(
            "Wrote {} frames to scratch file in {}",
            pcm.frames(),
            self.dir.display()
        );

        Ok(Arc::new(ScratchFile {
            file: Mutex::new(file),
            channel_len: pcm.channel_len(),
        }))
    }
}

/// Interleaved canonical audio on disk, shared by every voice reading it
#[derive(Debug)]
pub struct ScratchFile {
    file: Mutex<File>,
    channel_len: u64,
}

impl ScratchFile {
    /// Bytes per channel, as for in-memory audio
    pub fn channel_len(&self) -> u64 {
        self.channel_len
    }

    /// Read interleaved frames starting at a channel byte offset.
    ///
    /// # Returns
    /// Bytes read; less than `buf.len()` only at end of file
    pub fn read_frames(&self, channel_offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(channel_offset * (FRAME_SIZE / BYTES_PER_CHANNEL_FRAME) as u64))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

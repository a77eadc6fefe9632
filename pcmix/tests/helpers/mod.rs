//! Test helper modules for pcmix integration tests
//!
//! - audio_generator: WAV files and in-memory WAV images via hound
//! - capture_device: output device recording everything the scheduler writes

#![allow(dead_code)]

pub mod audio_generator;
pub mod capture_device;

pub use audio_generator::{generate_constant_wav, generate_sine_wav, generate_wav, int_spec, wav_bytes};
pub use capture_device::{to_frames, CaptureDevice, CaptureHandle};

use pcmix::{CanonicalPcm, Engine, EngineConfig, PcmFormat, PcmStream, Source};

/// Engine running on a capture device, scratch files under `scratch_dir`
pub fn capture_engine(scratch_dir: &std::path::Path) -> (Engine, CaptureHandle) {
    let config = EngineConfig {
        scratch_dir: Some(scratch_dir.to_path_buf()),
        max_block_frames: 64,
        stream_chunk_frames: 16,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config);
    let (device, handle) = CaptureDevice::new();
    engine.init_with_device(device).expect("init with capture device");
    (engine, handle)
}

/// Canonical stereo source from explicit frames
pub fn pcm_source(frames: &[(i16, i16)]) -> Source {
    let mut bytes = Vec::with_capacity(frames.len() * 4);
    for &(l, r) in frames {
        bytes.extend_from_slice(&l.to_le_bytes());
        bytes.extend_from_slice(&r.to_le_bytes());
    }
    Source::Pcm(PcmStream::from_bytes(PcmFormat::CANONICAL, bytes))
}

/// Canonical stereo source holding `frames` copies of one value
pub fn constant_source(value: i16, frames: usize) -> Source {
    pcm_source(&vec![(value, value); frames])
}

/// Left/right pairs of normalized audio
pub fn pcm_frames(pcm: &CanonicalPcm) -> Vec<(i16, i16)> {
    (0..pcm.frames() as usize)
        .filter_map(|f| pcm.sample_pair(f * 2))
        .collect()
}

//! # pcmix
//!
//! Software audio engine for interactive applications.
//!
//! **Purpose:** Load audio from files, resources or streams, normalize it to
//! one canonical format (44.1kHz, 16-bit signed, stereo) and mix any number
//! of music streams and overlapping sound effects into a single output.
//!
//! **Architecture:** symphonia decoding + rubato resampling into in-memory or
//! scratch-file backed references; a dedicated playback thread mixes blocks
//! and feeds a cpal output stream through a lock-free ring buffer.
//!
//! ```no_run
//! use pcmix::{Engine, EngineConfig};
//!
//! # fn main() -> pcmix::Result<()> {
//! let engine = Engine::new(EngineConfig::default());
//! engine.init()?;
//! let music = engine.load_music("theme.ogg", false)?;
//! music.play(true);
//! # engine.shutdown()
//! # }
//! ```

pub mod audio;
pub mod engine;
pub mod error;
pub mod music;
pub mod playback;
pub mod sound;
pub mod source;

pub use audio::output::OutputDevice;
pub use audio::types::{CanonicalPcm, PcmStream};
pub use engine::Engine;
pub use error::{Error, Result};
pub use music::Music;
pub use pcmix_common::events::{
    EventListener, MusicAction, MusicEvent, MusicId, SoundAction, SoundEvent, SoundId,
};
pub use pcmix_common::{EngineConfig, PcmFormat, SampleEncoding};
pub use sound::Sound;
pub use source::Source;

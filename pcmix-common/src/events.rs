//! Playback event types
//!
//! Events are raised by the engine when a voice changes state: it starts
//! playing, stops (explicitly or by running out of data), or wraps around
//! its loop window. They are delivered synchronously on the thread that
//! caused the transition, which for end-of-data and loop wraps is the
//! mixing thread itself. Listeners must therefore return quickly.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a loaded music asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MusicId(Uuid);

impl MusicId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MusicId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MusicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "music-{}", self.0)
    }
}

/// Identity of a loaded sound asset (shared by every voice it spawns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundId(Uuid);

impl SoundId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound-{}", self.0)
    }
}

/// Music state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicAction {
    Play,
    Stop,
    /// Playback wrapped from the loop end back to the loop start
    Loop,
}

/// Sound voice state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundAction {
    Play,
    Stop,
}

/// Notification about a music asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicEvent {
    pub source: MusicId,
    pub action: MusicAction,
}

/// Notification about one voice of a sound asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub source: SoundId,
    /// Sequence number of the voice within its sound (1 for the first play)
    pub voice: u64,
    pub action: SoundAction,
}

/// Receiver of engine events.
///
/// Both methods default to doing nothing so listeners only implement what
/// they care about. Implementations run on the mixing thread for
/// engine-generated events and must not block.
pub trait EventListener: Send + Sync {
    fn on_music_event(&self, _event: &MusicEvent) {}

    fn on_sound_event(&self, _event: &SoundEvent) {}
}

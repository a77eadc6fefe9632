//! Sound handles
//!
//! A [`Sound`] is a template. Each play spawns a new one-shot voice over the
//! shared audio data, so several plays overlap; the mixer retires each voice
//! when it reaches its end.

use crate::audio::scratch::ScratchFile;
use crate::audio::types::CanonicalPcm;
use crate::playback::backing::{MemorySource, SampleSource, StreamedSource};
use crate::playback::mixer::Mixer;
use crate::playback::reference::{AudioReference, VoiceKind};
use pcmix_common::events::SoundId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Audio data shared by every voice of a sound
pub(crate) enum SoundData {
    Memory(CanonicalPcm),
    Streamed(Arc<ScratchFile>),
}

/// Loaded sound effect
pub struct Sound {
    id: SoundId,
    data: SoundData,
    mixer: Arc<Mixer>,
    next_voice: AtomicU64,
    stream_chunk_frames: usize,
}

impl Sound {
    pub(crate) fn new(
        id: SoundId,
        data: SoundData,
        mixer: Arc<Mixer>,
        stream_chunk_frames: usize,
    ) -> Self {
        Self {
            id,
            data,
            mixer,
            next_voice: AtomicU64::new(1),
            stream_chunk_frames,
        }
    }

    /// Identity used as the source of this sound's events
    pub fn id(&self) -> SoundId {
        self.id
    }

    /// Start a new voice at full volume, centered
    pub fn play(&self) -> u64 {
        self.play_with_volume_and_pan(1.0, 0.0)
    }

    pub fn play_with_volume(&self, volume: f64) -> u64 {
        self.play_with_volume_and_pan(volume, 0.0)
    }

    /// Start a new voice.
    ///
    /// Out-of-range volume or pan leave the defaults (1.0, 0.0) in place.
    ///
    /// # Returns
    /// Sequence number of the new voice, as carried by its events
    pub fn play_with_volume_and_pan(&self, volume: f64, pan: f64) -> u64 {
        let voice = self.next_voice.fetch_add(1, Ordering::Relaxed);
        let source: Box<dyn SampleSource> = match &self.data {
            SoundData::Memory(pcm) => Box::new(MemorySource::new(pcm.clone())),
            SoundData::Streamed(file) => {
                Box::new(StreamedSource::new(Arc::clone(file), self.stream_chunk_frames))
            }
        };

        let reference = Arc::new(AudioReference::new(
            VoiceKind::Sound { id: self.id, voice },
            source,
            Arc::clone(self.mixer.dispatcher()),
        ));
        reference.set_volume(volume);
        reference.set_pan(pan);

        // Playing before registration, so no tick can retire it unstarted
        reference.set_playing(true);
        self.mixer.register_sound(reference);
        trace!("Started voice {} of {}", voice, self.id);
        voice
    }

    /// Stop and retire every voice of this sound
    pub fn stop(&self) {
        let voices = self.mixer.unregister_sounds_of(self.id);
        debug!("Stopping {} voices of {}", voices.len(), self.id);
        for voice in voices {
            voice.dispose();
        }
    }

    /// Number of voices of this sound still registered with the mixer
    pub fn active_voices(&self) -> usize {
        self.mixer.sound_voices_of(self.id)
    }

    /// Stop every voice and release the audio data
    pub fn unload(self) {
        self.stop();
        debug!("Unloaded {}", self.id);
    }
}

impl std::fmt::Debug for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backing = match self.data {
            SoundData::Memory(_) => "memory",
            SoundData::Streamed(_) => "streamed",
        };
        f.debug_struct("Sound")
            .field("id", &self.id)
            .field("backing", &backing)
            .finish()
    }
}

//! Voice mixer
//!
//! Holds the active music and sound references and produces canonical
//! output blocks by summing every playing voice.
//!
//! # Per-frame algorithm
//!
//! 1. Pull the next frame from each playing reference
//! 2. Scale by the reference volume and apply its pan
//! 3. Sum into 64-bit float accumulators
//! 4. Scale the sum by the global volume and saturate to 16 bits
//!
//! Sound references that finished during a block are retired once the
//! block is complete. Music references stay registered until unloaded.

use crate::playback::dispatcher::EventDispatcher;
use crate::playback::reference::{AudioReference, VoiceFrame, VoiceKind};
use crate::playback::{lock, read, write};
use pcmix_common::events::SoundId;
use pcmix_common::format::FRAME_SIZE;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace};

/// Mixer for all active voices
pub struct Mixer {
    music: RwLock<Vec<Arc<AudioReference>>>,
    sounds: RwLock<Vec<Arc<AudioReference>>>,
    /// Global volume, never negative
    volume: Mutex<f64>,
    dispatcher: Arc<EventDispatcher>,
    /// Voices visited by the block in progress (reused between blocks)
    tick_voices: Mutex<Vec<Arc<AudioReference>>>,
}

impl Mixer {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            music: RwLock::new(Vec::new()),
            sounds: RwLock::new(Vec::new()),
            volume: Mutex::new(1.0),
            dispatcher,
            tick_voices: Mutex::new(Vec::new()),
        }
    }

    /// Dispatcher shared with every reference this mixer plays
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn volume(&self) -> f64 {
        *lock(&self.volume)
    }

    /// Set the global volume. Negative and NaN values are ignored.
    pub fn set_volume(&self, volume: f64) {
        if volume >= 0.0 {
            *lock(&self.volume) = volume;
        }
    }

    pub fn register_music(&self, reference: Arc<AudioReference>) {
        write(&self.music).push(reference);
    }

    /// # Returns
    /// true if the reference was registered
    pub fn unregister_music(&self, reference: &Arc<AudioReference>) -> bool {
        remove(&self.music, reference)
    }

    pub fn register_sound(&self, reference: Arc<AudioReference>) {
        write(&self.sounds).push(reference);
    }

    /// # Returns
    /// true if the reference was registered
    pub fn unregister_sound(&self, reference: &Arc<AudioReference>) -> bool {
        remove(&self.sounds, reference)
    }

    /// Remove every voice spawned from one sound.
    ///
    /// # Returns
    /// The removed references, still undisposed
    pub fn unregister_sounds_of(&self, id: SoundId) -> Vec<Arc<AudioReference>> {
        let mut sounds = write(&self.sounds);
        let (removed, kept): (Vec<_>, Vec<_>) = sounds.drain(..).partition(|r| {
            matches!(r.kind(), VoiceKind::Sound { id: owner, .. } if owner == id)
        });
        *sounds = kept;
        removed
    }

    /// Unregister and dispose every music reference
    pub fn clear_music(&self) {
        let drained = std::mem::take(&mut *write(&self.music));
        debug!("Clearing {} music references", drained.len());
        for reference in drained {
            reference.dispose();
        }
    }

    /// Unregister and dispose every sound voice
    pub fn clear_sounds(&self) {
        let drained = std::mem::take(&mut *write(&self.sounds));
        debug!("Clearing {} sound voices", drained.len());
        for reference in drained {
            reference.dispose();
        }
    }

    pub fn music_count(&self) -> usize {
        read(&self.music).len()
    }

    pub fn sound_count(&self) -> usize {
        read(&self.sounds).len()
    }

    /// Registered voices spawned from one sound
    pub fn sound_voices_of(&self, id: SoundId) -> usize {
        read(&self.sounds)
            .iter()
            .filter(|r| matches!(r.kind(), VoiceKind::Sound { id: owner, .. } if owner == id))
            .count()
    }

    /// Fill `out` with the next block of mixed canonical audio.
    ///
    /// Voices registered while the block is being mixed join at the next
    /// block. A trailing partial frame in `out` is zeroed.
    pub fn read(&self, out: &mut [u8]) {
        let mut voices = lock(&self.tick_voices);
        voices.clear();
        voices.extend(read(&self.music).iter().cloned());
        voices.extend(read(&self.sounds).iter().cloned());

        let global = self.volume();
        let mut frames = out.chunks_exact_mut(FRAME_SIZE);

        for frame in &mut frames {
            let mut left = 0.0f64;
            let mut right = 0.0f64;

            for voice in voices.iter() {
                if let Some(pulled) = voice.pull() {
                    let (l, r) = apply_gain(pulled);
                    left += l;
                    right += r;
                }
            }

            frame[0..2].copy_from_slice(&saturate(left * global).to_le_bytes());
            frame[2..4].copy_from_slice(&saturate(right * global).to_le_bytes());
        }
        frames.into_remainder().fill(0);

        let finished: Vec<Arc<AudioReference>> = voices
            .iter()
            .filter(|v| matches!(v.kind(), VoiceKind::Sound { .. }) && v.done())
            .cloned()
            .collect();
        voices.clear();
        drop(voices);

        self.retire(finished);
    }

    /// Unregister and dispose finished sound voices.
    ///
    /// `done()` takes the voice lock, which a listener may hold while it
    /// registers sounds, so it is never called under the registry lock.
    fn retire(&self, finished: Vec<Arc<AudioReference>>) {
        if finished.is_empty() {
            return;
        }
        write(&self.sounds).retain(|s| !finished.iter().any(|f| Arc::ptr_eq(f, s)));

        trace!("Retired {} finished sound voices", finished.len());
        for reference in finished {
            reference.dispose();
        }
    }
}

/// Apply volume and linear pan to a pulled frame
fn apply_gain(frame: VoiceFrame) -> (f64, f64) {
    let mut left = frame.left as f64 * frame.volume;
    let mut right = frame.right as f64 * frame.volume;
    if frame.pan < 0.0 {
        right *= 1.0 + frame.pan;
    } else if frame.pan > 0.0 {
        left *= 1.0 - frame.pan;
    }
    (left, right)
}

fn saturate(sample: f64) -> i16 {
    sample.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn remove(registry: &RwLock<Vec<Arc<AudioReference>>>, reference: &Arc<AudioReference>) -> bool {
    let mut entries = write(registry);
    let before = entries.len();
    entries.retain(|r| !Arc::ptr_eq(r, reference));
    entries.len() != before
}

//! Music handles
//!
//! A [`Music`] owns one reference that stays registered with the mixer from
//! load until [`Music::unload`]. Stopping rewinds but keeps it registered,
//! so the same music can be played again or resumed at any time.

use crate::playback::mixer::Mixer;
use crate::playback::reference::AudioReference;
use pcmix_common::events::MusicId;
use pcmix_common::format::{
    channel_bytes_to_frames, channel_bytes_to_seconds, frames_to_channel_bytes,
    seconds_to_channel_bytes,
};
use std::sync::Arc;
use tracing::debug;

/// Loaded music
pub struct Music {
    id: MusicId,
    reference: Arc<AudioReference>,
    mixer: Arc<Mixer>,
}

impl Music {
    pub(crate) fn new(id: MusicId, reference: Arc<AudioReference>, mixer: Arc<Mixer>) -> Self {
        Self { id, reference, mixer }
    }

    /// Identity used as the source of this music's events
    pub fn id(&self) -> MusicId {
        self.id
    }

    /// Play from the current position
    pub fn play(&self, looping: bool) {
        self.reference.set_loop(looping);
        self.reference.set_playing(true);
    }

    pub fn play_with_volume(&self, looping: bool, volume: f64) {
        self.reference.set_loop(looping);
        self.reference.set_volume(volume);
        self.reference.set_playing(true);
    }

    pub fn play_with_volume_and_pan(&self, looping: bool, volume: f64, pan: f64) {
        self.reference.set_loop(looping);
        self.reference.set_volume(volume);
        self.reference.set_pan(pan);
        self.reference.set_playing(true);
    }

    /// Stop and rewind to the start
    pub fn stop(&self) {
        self.reference.set_playing(false);
        self.reference.rewind();
    }

    /// Stop without moving the position
    pub fn pause(&self) {
        self.reference.set_playing(false);
    }

    pub fn resume(&self) {
        self.reference.set_playing(true);
    }

    pub fn rewind(&self) {
        self.reference.rewind();
    }

    /// Move to the start of the loop window
    pub fn rewind_to_loop_position(&self) {
        self.reference.rewind_to_loop_start();
    }

    pub fn playing(&self) -> bool {
        self.reference.playing()
    }

    /// True once playback has run off the end and stopped
    pub fn done(&self) -> bool {
        self.reference.done()
    }

    pub fn loop_enabled(&self) -> bool {
        self.reference.looping()
    }

    pub fn set_loop(&self, looping: bool) {
        self.reference.set_loop(looping);
    }

    pub fn loop_start_frame(&self) -> u64 {
        channel_bytes_to_frames(self.reference.loop_positions().0)
    }

    pub fn loop_end_frame(&self) -> u64 {
        channel_bytes_to_frames(self.reference.loop_positions().1)
    }

    pub fn loop_start_seconds(&self) -> f64 {
        channel_bytes_to_seconds(self.reference.loop_positions().0)
    }

    pub fn loop_end_seconds(&self) -> f64 {
        channel_bytes_to_seconds(self.reference.loop_positions().1)
    }

    /// Set the loop window in frames.
    ///
    /// An out-of-range start is ignored; an invalid end falls back to the
    /// end of the music.
    pub fn set_loop_positions_by_frame(&self, start_frame: u64, end_frame: u64) {
        self.reference.set_loop_positions(
            frames_to_channel_bytes(start_frame),
            frames_to_channel_bytes(end_frame),
        );
    }

    /// Set the loop window in seconds, truncated to whole frames
    pub fn set_loop_positions_by_seconds(&self, start_seconds: f64, end_seconds: f64) {
        if start_seconds < 0.0 || end_seconds.is_nan() {
            return;
        }
        self.reference.set_loop_positions(
            seconds_to_channel_bytes(start_seconds),
            seconds_to_channel_bytes(end_seconds),
        );
    }

    /// Current playback position in frames
    pub fn position_frames(&self) -> u64 {
        channel_bytes_to_frames(self.reference.position())
    }

    /// Length in frames
    pub fn frames(&self) -> u64 {
        channel_bytes_to_frames(self.reference.channel_len())
    }

    pub fn volume(&self) -> f64 {
        self.reference.volume()
    }

    /// Negative values are ignored
    pub fn set_volume(&self, volume: f64) {
        self.reference.set_volume(volume);
    }

    pub fn pan(&self) -> f64 {
        self.reference.pan()
    }

    /// Values outside `[-1.0, 1.0]` are ignored
    pub fn set_pan(&self, pan: f64) {
        self.reference.set_pan(pan);
    }

    /// Stop, unregister from the mixer and release the audio data
    pub fn unload(self) {
        self.mixer.unregister_music(&self.reference);
        self.reference.dispose();
        debug!("Unloaded {}", self.id);
    }
}

impl std::fmt::Debug for Music {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Music")
            .field("id", &self.id)
            .field("reference", &self.reference)
            .finish()
    }
}

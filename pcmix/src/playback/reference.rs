//! Audio references
//!
//! An [`AudioReference`] is one playback cursor over canonical audio: the
//! unit the mixer reads from. Every mutable field sits behind a single
//! per-reference lock, so a control call from any thread and a pull from
//! the mixing thread are linearizable and unrelated voices never contend.
//!
//! State transitions raise events while the lock is held and before the new
//! state is applied: a listener observes the value being replaced. The lock
//! is re-entrant, so a listener may call back into the same reference from
//! the notifying thread. No `RefCell` borrow is held across a dispatch.

use crate::playback::backing::SampleSource;
use crate::playback::dispatcher::EventDispatcher;
use parking_lot::ReentrantMutex;
use pcmix_common::events::{
    MusicAction, MusicEvent, MusicId, SoundAction, SoundEvent, SoundId,
};
use pcmix_common::format::BYTES_PER_CHANNEL_FRAME;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

const SAMPLE_BYTES: u64 = BYTES_PER_CHANNEL_FRAME as u64;

/// What a reference plays for, and thus which events it raises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    Music(MusicId),
    Sound { id: SoundId, voice: u64 },
}

/// One frame pulled from a reference, with the gain to apply to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceFrame {
    pub left: i16,
    pub right: i16,
    pub volume: f64,
    pub pan: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Play,
    Stop,
    Loop,
}

struct ReferenceState {
    /// None once disposed
    source: Option<Box<dyn SampleSource>>,
    channel_len: u64,
    playing: bool,
    looping: bool,
    loop_start: u64,
    loop_end: u64,
    position: u64,
    volume: f64,
    pan: f64,
}

impl ReferenceState {
    fn bytes_remaining(&self) -> u64 {
        self.channel_len.saturating_sub(self.position)
    }
}

/// Where a pull stands once the sample under the cursor has been read
enum Advance {
    Frame(VoiceFrame),
    Wrapped(VoiceFrame),
    Ended(VoiceFrame),
}

/// Playback cursor over one audio asset
pub struct AudioReference {
    kind: VoiceKind,
    state: ReentrantMutex<RefCell<ReferenceState>>,
    dispatcher: Arc<EventDispatcher>,
}

impl AudioReference {
    /// Create a stopped reference at position 0 with the loop window
    /// covering all of `source`.
    pub fn new(
        kind: VoiceKind,
        source: Box<dyn SampleSource>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        let channel_len = align(source.channel_len());
        Self {
            kind,
            state: ReentrantMutex::new(RefCell::new(ReferenceState {
                source: Some(source),
                channel_len,
                playing: false,
                looping: false,
                loop_start: 0,
                loop_end: channel_len,
                position: 0,
                volume: 1.0,
                pan: 0.0,
            })),
            dispatcher,
        }
    }

    /// Run `f` on the state under the lock. `f` must not dispatch events.
    fn with_state<R>(&self, f: impl FnOnce(&mut ReferenceState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let result = f(&mut *state);
        result
    }

    pub fn kind(&self) -> VoiceKind {
        self.kind
    }

    /// Bytes per channel
    pub fn channel_len(&self) -> u64 {
        self.with_state(|s| s.channel_len)
    }

    pub fn playing(&self) -> bool {
        self.with_state(|s| s.playing)
    }

    /// Start or stop; raises PLAY or STOP before the value changes
    pub fn set_playing(&self, playing: bool) {
        let guard = self.state.lock();
        self.change_playing(&guard, playing);
    }

    /// Caller holds the lock and no borrow of `state`
    fn change_playing(&self, state: &RefCell<ReferenceState>, playing: bool) {
        if state.borrow().playing == playing {
            return;
        }
        self.emit(if playing { Transition::Play } else { Transition::Stop });
        state.borrow_mut().playing = playing;
    }

    pub fn looping(&self) -> bool {
        self.with_state(|s| s.looping)
    }

    pub fn set_loop(&self, looping: bool) {
        self.with_state(|s| s.looping = looping);
    }

    /// Loop window as channel byte offsets
    pub fn loop_positions(&self) -> (u64, u64) {
        self.with_state(|s| (s.loop_start, s.loop_end))
    }

    /// Set the loop window in channel byte offsets.
    ///
    /// A `start` outside the data is ignored entirely. A valid `start`
    /// resets the end to the end of data, after which `end` is applied only
    /// if it lies in `(start, len]`.
    pub fn set_loop_positions(&self, start: u64, end: u64) {
        self.with_state(|s| {
            let start = align(start);
            if start >= s.channel_len {
                return;
            }
            s.loop_start = start;
            s.loop_end = s.channel_len;

            let end = align(end);
            if end > start && end <= s.channel_len {
                s.loop_end = end;
            }
        });
    }

    /// Cursor as a channel byte offset
    pub fn position(&self) -> u64 {
        self.with_state(|s| s.position)
    }

    /// Move the cursor; offsets outside `[0, len)` are ignored
    pub fn set_position(&self, position: u64) {
        self.with_state(|s| {
            if position < s.channel_len {
                s.position = align(position);
            }
        });
    }

    /// Move the cursor to the start of the data
    pub fn rewind(&self) {
        self.with_state(|s| {
            if s.source.is_some() {
                s.position = 0;
            }
        });
    }

    /// Move the cursor to the start of the loop window
    pub fn rewind_to_loop_start(&self) {
        self.with_state(|s| {
            if s.source.is_some() {
                s.position = s.loop_start;
            }
        });
    }

    pub fn volume(&self) -> f64 {
        self.with_state(|s| s.volume)
    }

    /// Negative and NaN volumes are ignored
    pub fn set_volume(&self, volume: f64) {
        if volume >= 0.0 {
            self.with_state(|s| s.volume = volume);
        }
    }

    pub fn pan(&self) -> f64 {
        self.with_state(|s| s.pan)
    }

    /// Pan outside `[-1.0, 1.0]` (or NaN) is ignored
    pub fn set_pan(&self, pan: f64) {
        if (-1.0..=1.0).contains(&pan) {
            self.with_state(|s| s.pan = pan);
        }
    }

    /// True once no samples remain and playback has stopped, or after dispose
    pub fn done(&self) -> bool {
        self.with_state(|s| {
            s.source.is_none() || (!s.playing && s.bytes_remaining() < SAMPLE_BYTES)
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.with_state(|s| s.source.is_none())
    }

    /// Stop (raising STOP if playing) and release the backing data.
    ///
    /// Serialized with [`AudioReference::pull`], so a pull in progress
    /// completes first and none follows.
    pub fn dispose(&self) {
        let guard = self.state.lock();
        self.change_playing(&guard, false);
        {
            let mut state = guard.borrow_mut();
            if let Some(mut source) = state.source.take() {
                source.release();
            }
            state.position = state.channel_len;
        }
        trace!("Disposed {:?}", self.kind);
    }

    /// Read the frame under the cursor and advance.
    ///
    /// After advancing, a looping reference that reached its loop end raises
    /// LOOP and jumps back to the loop start; otherwise reaching the end of
    /// data raises STOP and stops playback. A failed read stops playback
    /// and leaves the reference exhausted.
    ///
    /// # Returns
    /// None if not playing, disposed, or out of data
    pub fn pull(&self) -> Option<VoiceFrame> {
        let guard = self.state.lock();
        let state: &RefCell<ReferenceState> = &guard;

        let exhausted = {
            let s = state.borrow();
            if !s.playing || s.source.is_none() {
                return None;
            }
            s.bytes_remaining() < SAMPLE_BYTES
        };
        if exhausted {
            self.change_playing(state, false);
            return None;
        }

        let advance = {
            let mut s = state.borrow_mut();
            let s = &mut *s;
            let position = s.position;
            let source = s.source.as_mut()?;
            match source.read_pair(position) {
                Ok((left, right)) => {
                    s.position += SAMPLE_BYTES;
                    let frame = VoiceFrame {
                        left,
                        right,
                        volume: s.volume,
                        pan: s.pan,
                    };
                    Some(if s.looping && s.position >= s.loop_end {
                        Advance::Wrapped(frame)
                    } else if s.position >= s.channel_len {
                        Advance::Ended(frame)
                    } else {
                        Advance::Frame(frame)
                    })
                }
                Err(e) => {
                    warn!("Read failed for {:?} at {}: {}", self.kind, position, e);
                    s.position = s.channel_len;
                    None
                }
            }
        };

        match advance {
            Some(Advance::Frame(frame)) => Some(frame),
            Some(Advance::Wrapped(frame)) => {
                self.emit(Transition::Loop);
                let mut s = state.borrow_mut();
                s.position = s.loop_start;
                Some(frame)
            }
            Some(Advance::Ended(frame)) => {
                self.change_playing(state, false);
                Some(frame)
            }
            None => {
                self.change_playing(state, false);
                None
            }
        }
    }

    fn emit(&self, transition: Transition) {
        match self.kind {
            VoiceKind::Music(source) => {
                let action = match transition {
                    Transition::Play => MusicAction::Play,
                    Transition::Stop => MusicAction::Stop,
                    Transition::Loop => MusicAction::Loop,
                };
                self.dispatcher.fire_music_event(MusicEvent { source, action });
            }
            VoiceKind::Sound { id, voice } => {
                let action = match transition {
                    Transition::Play => SoundAction::Play,
                    Transition::Stop => SoundAction::Stop,
                    Transition::Loop => return,
                };
                self.dispatcher.fire_sound_event(SoundEvent {
                    source: id,
                    voice,
                    action,
                });
            }
        }
    }
}

impl fmt::Debug for AudioReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (playing, position, channel_len) =
            self.with_state(|s| (s.playing, s.position, s.channel_len));
        f.debug_struct("AudioReference")
            .field("kind", &self.kind)
            .field("playing", &playing)
            .field("position", &position)
            .field("channel_len", &channel_len)
            .finish()
    }
}

/// Round a channel byte offset down to a sample boundary
fn align(offset: u64) -> u64 {
    offset & !(SAMPLE_BYTES - 1)
}

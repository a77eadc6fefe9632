//! Engine lifecycle and loading
//!
//! An [`Engine`] owns the event dispatcher for its whole lifetime and, while
//! initialized, a mixer plus the playback thread feeding the output device.
//! Loading decodes and normalizes on the caller's thread; the new reference
//! is registered with the mixer only once everything else has succeeded.

use crate::audio::output::{CpalOutput, OutputDevice};
use crate::audio::scratch::ScratchStore;
use crate::audio::types::CanonicalPcm;
use crate::error::{Error, Result};
use crate::music::Music;
use crate::playback::backing::{MemorySource, SampleSource, StreamedSource};
use crate::playback::dispatcher::EventDispatcher;
use crate::playback::mixer::Mixer;
use crate::playback::reference::{AudioReference, VoiceKind};
use crate::playback::scheduler::{DeviceOpener, Scheduler, SchedulerConfig};
use crate::playback::lock;
use crate::sound::{Sound, SoundData};
use crate::source::Source;
use pcmix_common::events::{EventListener, MusicId, SoundId};
use pcmix_common::EngineConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Global volume reported while the engine is not initialized
pub const UNINITIALIZED_VOLUME: f64 = -1.0;

struct Running {
    mixer: Arc<Mixer>,
    scheduler: Scheduler,
    scratch: ScratchStore,
}

/// Audio engine instance
pub struct Engine {
    config: EngineConfig,
    dispatcher: Arc<EventDispatcher>,
    running: Mutex<Option<Running>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            dispatcher: Arc::new(EventDispatcher::new()),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of the available output devices
    pub fn list_devices() -> Result<Vec<String>> {
        CpalOutput::list_devices()
    }

    /// Open the configured (or default) output device and start playback.
    ///
    /// # Errors
    /// - `InvalidState` if already initialized
    /// - `AudioOutput` / `UnsupportedFormat` if no usable device can be opened
    pub fn init(&self) -> Result<()> {
        let device_name = self.config.device_name.clone();
        let buffer_frames = self.config.device_buffer_frames;
        let ring_frames = self.config.ring_buffer_frames;
        self.start(Box::new(move || {
            let device = CpalOutput::open(device_name.as_deref(), buffer_frames, ring_frames)?;
            Ok(Box::new(device) as Box<dyn OutputDevice>)
        }))
    }

    /// Start playback on a caller-provided device.
    ///
    /// # Errors
    /// - `InvalidState` if already initialized
    /// - any error from starting the device
    pub fn init_with_device(&self, device: Box<dyn OutputDevice + Send>) -> Result<()> {
        self.start(Box::new(move || Ok(device as Box<dyn OutputDevice>)))
    }

    fn start(&self, open_device: DeviceOpener) -> Result<()> {
        self.config.validate()?;

        let mut running = lock(&self.running);
        if running.is_some() {
            return Err(Error::InvalidState("Engine already initialized".to_string()));
        }

        let mixer = Arc::new(Mixer::new(Arc::clone(&self.dispatcher)));
        let scheduler = Scheduler::start(
            Arc::clone(&mixer),
            open_device,
            SchedulerConfig {
                max_block_frames: self.config.max_block_frames,
                tick_interval: Duration::from_millis(self.config.tick_interval_ms),
            },
        )?;

        *running = Some(Running {
            mixer,
            scheduler,
            scratch: ScratchStore::new(self.config.scratch_dir()),
        });
        info!("Engine initialized");
        Ok(())
    }

    /// Stop playback, release every loaded reference and drop all listeners.
    ///
    /// # Errors
    /// - `InvalidState` if not initialized
    /// - the device error that ended playback, if one did
    pub fn shutdown(&self) -> Result<()> {
        let running = lock(&self.running)
            .take()
            .ok_or_else(|| Error::InvalidState("Engine not initialized".to_string()))?;

        let result = running.scheduler.stop();
        running.mixer.clear_music();
        running.mixer.clear_sounds();
        self.dispatcher.unregister_all();

        match &result {
            Ok(()) => info!("Engine shut down"),
            Err(e) => warn!("Engine shut down after playback error: {}", e),
        }
        result
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Global volume, or [`UNINITIALIZED_VOLUME`] when not initialized
    pub fn global_volume(&self) -> f64 {
        lock(&self.running)
            .as_ref()
            .map_or(UNINITIALIZED_VOLUME, |r| r.mixer.volume())
    }

    /// Set the global volume. Negative values are ignored.
    ///
    /// # Errors
    /// `InvalidState` if not initialized
    pub fn set_global_volume(&self, volume: f64) -> Result<()> {
        let running = lock(&self.running);
        let running = running
            .as_ref()
            .ok_or_else(|| Error::InvalidState("Engine not initialized".to_string()))?;
        running.mixer.set_volume(volume);
        Ok(())
    }

    /// Load music and register it with the mixer, stopped at position 0.
    ///
    /// With `stream_from_file` the normalized audio is moved to a scratch
    /// file and read back in chunks during playback.
    ///
    /// # Errors
    /// - `InvalidState` if not initialized
    /// - `ResourceNotFound`, `UnsupportedFormat`, `ResourceTooLarge`, `Io`
    ///   from locating, decoding or normalizing the source
    pub fn load_music(&self, source: impl Into<Source>, stream_from_file: bool) -> Result<Music> {
        let (mixer, scratch) = self.loading_context()?;
        let pcm = source.into().load(&self.config.resource_root)?;
        let backing = self.backing(&scratch, pcm, stream_from_file)?;

        let id = MusicId::new();
        let reference = Arc::new(AudioReference::new(
            VoiceKind::Music(id),
            backing,
            Arc::clone(&self.dispatcher),
        ));
        mixer.register_music(Arc::clone(&reference));

        debug!("Loaded {} (streamed: {})", id, stream_from_file);
        Ok(Music::new(id, reference, mixer))
    }

    /// Load a sound template. Nothing is registered until it is played.
    ///
    /// # Errors
    /// As for [`Engine::load_music`]
    pub fn load_sound(&self, source: impl Into<Source>, stream_from_file: bool) -> Result<Sound> {
        let (mixer, scratch) = self.loading_context()?;
        let pcm = source.into().load(&self.config.resource_root)?;

        let data = if stream_from_file {
            SoundData::Streamed(scratch.persist(&pcm)?)
        } else {
            SoundData::Memory(pcm)
        };

        let id = SoundId::new();
        debug!("Loaded {} (streamed: {})", id, stream_from_file);
        Ok(Sound::new(id, data, mixer, self.config.stream_chunk_frames))
    }

    /// Add an event listener; false if it was already registered
    pub fn register_event_listener(&self, listener: Arc<dyn EventListener>) -> bool {
        self.dispatcher.register(listener)
    }

    /// Remove an event listener; removing an unknown listener is a no-op
    pub fn unregister_event_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.dispatcher.unregister(listener)
    }

    fn loading_context(&self) -> Result<(Arc<Mixer>, ScratchStore)> {
        lock(&self.running)
            .as_ref()
            .map(|r| (Arc::clone(&r.mixer), r.scratch.clone()))
            .ok_or_else(|| Error::InvalidState("Engine not initialized".to_string()))
    }

    fn backing(
        &self,
        scratch: &ScratchStore,
        pcm: CanonicalPcm,
        stream_from_file: bool,
    ) -> Result<Box<dyn SampleSource>> {
        Ok(if stream_from_file {
            let file = scratch.persist(&pcm)?;
            Box::new(StreamedSource::new(file, self.config.stream_chunk_frames))
        } else {
            Box::new(MemorySource::new(pcm))
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.is_initialized() {
            if let Err(e) = self.shutdown() {
                warn!("Shutdown on drop failed: {}", e);
            }
        }
    }
}

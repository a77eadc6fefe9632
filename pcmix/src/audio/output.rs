//! Audio output
//!
//! [`OutputDevice`] is the sink the scheduler feeds mixed canonical bytes
//! into. [`CpalOutput`] implements it on top of a cpal stream: the scheduler
//! writes into a lock-free ring buffer and the cpal callback drains it,
//! emitting silence on underrun.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use pcmix_common::format::{CHANNELS, FRAME_SIZE, SAMPLE_RATE};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sink for canonical interleaved stereo bytes.
///
/// Implementations need not be `Send`; the scheduler opens and drives the
/// device entirely on its own thread.
pub trait OutputDevice {
    /// Begin consuming written audio
    fn start(&mut self) -> Result<()>;

    /// Bytes that can be written without blocking or dropping audio
    fn available_bytes(&self) -> usize;

    /// Queue bytes for playback. `bytes.len()` must not exceed
    /// [`OutputDevice::available_bytes`].
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Discard audio written but not yet played
    fn flush(&mut self);

    /// Stop consuming audio and release the device
    fn stop(&mut self);

    fn name(&self) -> &str;
}

/// Output device backed by cpal.
pub struct CpalOutput {
    device: Device,
    device_name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    producer: HeapProd<i16>,
    consumer: Option<HeapCons<i16>>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    /// Set by flush, cleared by the data callback once the ring is drained
    discard: Arc<AtomicBool>,
}

impl CpalOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// # Arguments
    /// - `device_name`: Device to open (None = default device). An unknown
    ///   name falls back to the default device.
    /// - `buffer_frames`: Device callback size in frames (None = device default)
    /// - `ring_frames`: Capacity of the bridge between writer and callback
    ///
    /// # Errors
    /// - `AudioOutput` if no device is available
    /// - `UnsupportedFormat` if the device cannot play 44.1kHz stereo
    pub fn open(
        device_name: Option<&str>,
        buffer_frames: Option<u32>,
        ring_frames: usize,
    ) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let (mut config, sample_format) = Self::get_canonical_config(&device)?;

        if let Some(size) = buffer_frames {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        }

        info!(
            "Opened audio device '{}' ({:?}, buffer {:?})",
            device_name, sample_format, config.buffer_size
        );

        let (producer, consumer) = HeapRb::<i16>::new(ring_frames * CHANNELS as usize).split();

        Ok(Self {
            device,
            device_name,
            config,
            sample_format,
            stream: None,
            producer,
            consumer: Some(consumer),
            error_flag: Arc::new(AtomicBool::new(false)),
            discard: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Find a 44.1kHz stereo configuration in a sample format we can feed.
    fn get_canonical_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|config| {
                config.channels() == CHANNELS
                    && config.min_sample_rate().0 <= SAMPLE_RATE
                    && config.max_sample_rate().0 >= SAMPLE_RATE
            })
            .collect();

        for wanted in [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16] {
            if let Some(config) = supported.iter().find(|c| c.sample_format() == wanted) {
                let config = config.clone().with_sample_rate(cpal::SampleRate(SAMPLE_RATE));
                return Ok((config.config(), wanted));
            }
        }

        Err(Error::UnsupportedFormat(format!(
            "Device does not support {}Hz stereo output",
            SAMPLE_RATE
        )))
    }

    fn build_stream<T>(&self, mut consumer: HeapCons<i16>) -> Result<Stream>
    where
        T: SizedSample + FromSample<i16> + Send + 'static,
    {
        let error_flag = Arc::clone(&self.error_flag);
        let discard = Arc::clone(&self.discard);
        let silence = T::from_sample(0i16);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if discard.swap(false, Ordering::AcqRel) {
                        consumer.clear();
                    }
                    for out in data.iter_mut() {
                        *out = consumer.try_pop().map(T::from_sample).unwrap_or(silence);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

impl OutputDevice for CpalOutput {
    fn start(&mut self) -> Result<()> {
        let consumer = self
            .consumer
            .take()
            .ok_or_else(|| Error::InvalidState("Output stream already started".to_string()))?;

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(consumer)?,
            SampleFormat::I16 => self.build_stream::<i16>(consumer)?,
            SampleFormat::U16 => self.build_stream::<u16>(consumer)?,
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        self.stream = Some(stream);

        info!("Audio stream started on '{}'", self.device_name);
        Ok(())
    }

    fn available_bytes(&self) -> usize {
        vacant_bytes(self.producer.vacant_len())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.error_flag.load(Ordering::SeqCst) {
            return Err(Error::AudioOutput(format!(
                "Stream on '{}' reported an error",
                self.device_name
            )));
        }

        let mut dropped = 0;
        for sample in le_samples(bytes) {
            if self.producer.try_push(sample).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!("Output ring full, dropped {} samples", dropped);
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.discard.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Failed to pause stream: {}", e);
            }
            info!("Audio stream stopped on '{}'", self.device_name);
        }
    }

    fn name(&self) -> &str {
        &self.device_name
    }
}

/// Whole canonical frames worth of bytes for a number of free ring slots
fn vacant_bytes(vacant_samples: usize) -> usize {
    let frames = vacant_samples / CHANNELS as usize;
    frames * FRAME_SIZE
}

fn le_samples(bytes: &[u8]) -> impl Iterator<Item = i16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

//! Playback thread
//!
//! A single dedicated thread opens the output device, then repeatedly asks
//! the device how much it can take, mixes exactly that much (bounded by the
//! block size) and writes it. When the device is full nothing is mixed, so
//! no cursor advances: the device is the only source of backpressure.
//!
//! The device is opened on the playback thread itself because platform
//! streams are generally not `Send`.

use crate::audio::output::OutputDevice;
use crate::error::{Error, Result};
use crate::playback::mixer::Mixer;
use pcmix_common::format::FRAME_SIZE;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info};

const THREAD_NAME: &str = "pcmix-mixer";

/// Opens the output device on the playback thread
pub type DeviceOpener = Box<dyn FnOnce() -> Result<Box<dyn OutputDevice>> + Send>;

/// Scheduler timing parameters
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Upper bound on frames mixed per iteration
    pub max_block_frames: usize,
    /// Pause between iterations
    pub tick_interval: Duration,
}

/// Handle to the running playback thread
pub struct Scheduler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl Scheduler {
    /// Open the device and start the playback loop.
    ///
    /// Returns once the device has been opened and started.
    ///
    /// # Errors
    /// Any error from opening or starting the device; the thread has exited
    /// by the time it is returned.
    pub fn start(mixer: Arc<Mixer>, open_device: DeviceOpener, config: SchedulerConfig) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let mut device = match open_device().and_then(|mut d| d.start().map(|_| d)) {
                    Ok(device) => device,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return Ok(());
                    }
                };
                let _ = ready_tx.send(Ok(()));
                info!("Playback thread started on '{}'", device.name());

                let result = run_loop(&mixer, device.as_mut(), &thread_running, config);

                device.flush();
                device.stop();
                info!("Playback thread stopped");
                result
            })
            .map_err(|e| Error::InvalidState(format!("Failed to spawn playback thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                running,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::AudioOutput("Playback thread exited during startup".to_string()))
            }
        }
    }

    /// True until the loop exits (on stop or after a device fault)
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for the thread.
    ///
    /// # Errors
    /// The device error that ended the loop, if any
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::InvalidState("Playback thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            debug!("Playback thread ended with error during drop: {}", e);
        }
    }
}

fn run_loop(
    mixer: &Mixer,
    device: &mut dyn OutputDevice,
    running: &AtomicBool,
    config: SchedulerConfig,
) -> Result<()> {
    let max_bytes = config.max_block_frames * FRAME_SIZE;
    let mut block = vec![0u8; max_bytes];

    while running.load(Ordering::SeqCst) {
        let available = device.available_bytes().min(max_bytes);
        let len = available - available % FRAME_SIZE;

        if len > 0 {
            let out = &mut block[..len];
            mixer.read(out);
            if let Err(e) = device.write(out) {
                error!("Output device failed, stopping playback: {}", e);
                running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        std::thread::sleep(config.tick_interval);
    }

    Ok(())
}

//! Output device that records what the scheduler writes
//!
//! The device accepts nothing until the test grants it a byte budget, so the
//! exact span of mixed audio a test observes is under the test's control.
//! Optionally it fails on its first write to exercise fault propagation.

use pcmix::error::{Error, Result};
use pcmix::OutputDevice;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct CaptureState {
    bytes: Mutex<Vec<u8>>,
    budget: AtomicUsize,
    started: AtomicBool,
    stopped: AtomicBool,
    flushes: AtomicUsize,
    fail_writes: AtomicBool,
}

/// Device half, handed to the engine
pub struct CaptureDevice {
    state: Arc<CaptureState>,
}

/// Test half, used to grant budget and inspect captured audio
#[derive(Clone)]
pub struct CaptureHandle {
    state: Arc<CaptureState>,
}

impl CaptureDevice {
    pub fn new() -> (Box<CaptureDevice>, CaptureHandle) {
        let state = Arc::new(CaptureState::default());
        (
            Box::new(CaptureDevice {
                state: Arc::clone(&state),
            }),
            CaptureHandle { state },
        )
    }

    /// A device whose first write fails
    pub fn failing() -> (Box<CaptureDevice>, CaptureHandle) {
        let (device, handle) = Self::new();
        handle.state.fail_writes.store(true, Ordering::SeqCst);
        (device, handle)
    }
}

impl OutputDevice for CaptureDevice {
    fn start(&mut self) -> Result<()> {
        self.state.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn available_bytes(&self) -> usize {
        self.state.budget.load(Ordering::SeqCst)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::AudioOutput("capture device unplugged".to_string()));
        }
        self.state.bytes.lock().unwrap().extend_from_slice(bytes);
        self.state.budget.fetch_sub(bytes.len(), Ordering::SeqCst);
        Ok(())
    }

    fn flush(&mut self) {
        self.state.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "capture"
    }
}

impl CaptureHandle {
    /// Let the device accept `frames` more canonical frames
    pub fn grant_frames(&self, frames: usize) {
        self.state.budget.fetch_add(frames * 4, Ordering::SeqCst);
    }

    /// Grant `frames` and wait until they have all been written
    pub fn capture_frames(&self, frames: usize) -> Vec<(i16, i16)> {
        let before = self.captured_len();
        self.grant_frames(frames);
        assert!(
            self.wait_for_len(before + frames * 4, Duration::from_secs(5)),
            "timed out waiting for {} frames",
            frames
        );
        let bytes = self.state.bytes.lock().unwrap();
        to_frames(&bytes[before..before + frames * 4])
    }

    pub fn captured_len(&self) -> usize {
        self.state.bytes.lock().unwrap().len()
    }

    pub fn wait_for_len(&self, len: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.captured_len() >= len {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    pub fn started(&self) -> bool {
        self.state.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.state.flushes.load(Ordering::SeqCst)
    }
}

/// Decode canonical bytes into (left, right) pairs
pub fn to_frames(bytes: &[u8]) -> Vec<(i16, i16)> {
    bytes
        .chunks_exact(4)
        .map(|f| {
            (
                i16::from_le_bytes([f[0], f[1]]),
                i16::from_le_bytes([f[2], f[3]]),
            )
        })
        .collect()
}

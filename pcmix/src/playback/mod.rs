//! Voices, mixing and the playback thread

pub mod backing;
pub mod dispatcher;
pub mod mixer;
pub mod reference;
pub mod scheduler;

pub use backing::{MemorySource, SampleSource, StreamedSource};
pub use dispatcher::EventDispatcher;
pub use mixer::Mixer;
pub use reference::{AudioReference, VoiceFrame, VoiceKind};
pub use scheduler::{DeviceOpener, Scheduler};

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Guarded values are valid after any single write, so poisoned locks are
// taken over instead of propagated.

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

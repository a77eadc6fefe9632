//! Event fan-out to registered listeners
//!
//! The listener set is copy-on-write: registration swaps in a new list while
//! dispatch iterates the snapshot it started with. A listener added or
//! removed mid-dispatch therefore never disturbs the event in flight, and
//! listeners may themselves register or unregister from inside a callback.

use pcmix_common::events::{EventListener, MusicEvent, SoundEvent};
use crate::playback::{read, write};
use std::sync::{Arc, RwLock};
use tracing::debug;

type ListenerList = Arc<Vec<Arc<dyn EventListener>>>;

/// Thread-safe set of event listeners owned by one engine
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<ListenerList>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener.
    ///
    /// # Returns
    /// false if this listener was already registered (no change)
    pub fn register(&self, listener: Arc<dyn EventListener>) -> bool {
        let mut guard = write(&self.listeners);
        if guard.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
        debug!("Registered event listener ({} total)", guard.len());
        true
    }

    /// Remove a listener. Removing an unknown listener is a no-op.
    ///
    /// # Returns
    /// true if the listener was registered
    pub fn unregister(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut guard = write(&self.listeners);
        if !guard.iter().any(|l| same_listener(l, listener)) {
            return false;
        }
        let next: Vec<_> = guard
            .iter()
            .filter(|l| !same_listener(l, listener))
            .cloned()
            .collect();
        *guard = Arc::new(next);
        debug!("Unregistered event listener ({} remaining)", guard.len());
        true
    }

    pub fn unregister_all(&self) {
        let mut guard = write(&self.listeners);
        *guard = Arc::new(Vec::new());
    }

    pub fn listener_count(&self) -> usize {
        self.snapshot().len()
    }

    pub fn fire_music_event(&self, event: MusicEvent) {
        for listener in self.snapshot().iter() {
            listener.on_music_event(&event);
        }
    }

    pub fn fire_sound_event(&self, event: SoundEvent) {
        for listener in self.snapshot().iter() {
            listener.on_sound_event(&event);
        }
    }

    fn snapshot(&self) -> ListenerList {
        Arc::clone(&read(&self.listeners))
    }
}

/// Identity comparison on the listener object, ignoring vtable pointers
fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

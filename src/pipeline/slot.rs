//! Typed hand-off cells between pipeline nodes.

use std::sync::Mutex;

/// A single-value cell carrying one node's output to another node's
/// input.
///
/// The producer puts at most one value before the consumer runs; the
/// consumer takes it once. Serial execution means the two never touch
/// the slot concurrently, but the mutex keeps the type `Sync` so slots
/// can be shared across the spawned executor task.
#[derive(Default)]
pub struct Slot<T> {
    value: Mutex<Option<T>>,
}

impl<T> Slot<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Store a value, replacing any previous one.
    pub fn put(&self, value: T) {
        *self.lock() = Some(value);
    }

    /// Take the stored value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Whether a value is currently stored.
    pub fn is_filled(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        // No code path panics while holding the lock; recover the inner
        // value if it ever happens in tests.
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

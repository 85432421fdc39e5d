//! API-key ring: an ordered list of keys with a shared rotation pointer.
//!
//! The pointer is the only mutable state a provider carries. It advances
//! when the active key is rejected (auth, quota, rate limit); concurrent
//! failures observed on the same key advance it exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

pub struct KeyRing {
    keys: Vec<String>,
    active: AtomicUsize,
}

/// The key used for one call, and the pointer value it was read at.
#[derive(Debug, Clone, Copy)]
pub struct KeyLease<'a> {
    pub key: &'a str,
    position: usize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys: keys.into_iter().filter(|k| !k.is_empty()).collect(),
            active: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The currently active key, or `None` when the ring is empty.
    pub fn current(&self) -> Option<KeyLease<'_>> {
        if self.keys.is_empty() {
            return None;
        }
        let position = self.active.load(Ordering::Acquire);
        Some(KeyLease {
            key: &self.keys[position % self.keys.len()],
            position,
        })
    }

    /// Move past the key in `lease`. A no-op if someone already rotated past it.
    pub fn rotate(&self, lease: KeyLease<'_>) {
        if self.keys.len() < 2 {
            return;
        }
        let next = lease.position.wrapping_add(1);
        if self
            .active
            .compare_exchange(lease.position, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!(
                slot = lease.position % self.keys.len(),
                next_slot = next % self.keys.len(),
                "API key rejected, rotating"
            );
        }
    }

    /// Index of the active key within the ring.
    pub fn active_slot(&self) -> usize {
        if self.keys.is_empty() {
            0
        } else {
            self.active.load(Ordering::Acquire) % self.keys.len()
        }
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &self.keys.len())
            .field("active", &self.active_slot())
            .finish()
    }
}

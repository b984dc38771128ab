//! Object URLs for converted files.
//!
//! A [`BlobStore`] hands out one [`ObjectUrl`] per converted file. The URL
//! keeps the converted bytes reachable until it is released, and it is
//! released exactly once: either explicitly ([`ObjectUrl::revoke`], which a
//! completed download calls) or when the URL is dropped together with its
//! job. `ObjectUrl` is not `Clone`, so a second release cannot happen.
//!
//! ```text
//! job Done ──create──▶ blob:heic-converter/3 ──download──▶ released
//!                                │
//!                                └──job discarded──▶ released
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const URL_PREFIX: &str = "blob:heic-converter/";

/// Immutable converted bytes plus their mime type.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub mime_type: &'static str,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, mime_type: &'static str) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    live: BTreeMap<u64, Blob>,
    released: u64,
}

/// Registry of live object URLs. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    state: Arc<Mutex<StoreState>>,
}

/// Counters describing the store, for summaries and leak checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub created: u64,
    pub active: usize,
    pub released: u64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `blob` and return the URL that owns the registration.
    pub fn create(&self, blob: Blob) -> ObjectUrl {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id, blob);
        ObjectUrl {
            id,
            store: self.clone(),
        }
    }

    /// Bytes behind a URL string, if it is still live.
    pub fn resolve(&self, href: &str) -> Option<Blob> {
        let id: u64 = href.strip_prefix(URL_PREFIX)?.parse().ok()?;
        self.lock().live.get(&id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.lock();
        StoreStats {
            created: state.next_id,
            active: state.live.len(),
            released: state.released,
        }
    }

    fn release(&self, id: u64) {
        let mut state = self.lock();
        if state.live.remove(&id).is_some() {
            state.released += 1;
            tracing::debug!(id, "released object URL");
        }
    }
}

/// Owning handle to one live object URL.
#[derive(Debug)]
pub struct ObjectUrl {
    id: u64,
    store: BlobStore,
}

impl ObjectUrl {
    pub fn href(&self) -> String {
        format!("{URL_PREFIX}{}", self.id)
    }

    /// The bytes this URL points at.
    pub fn blob(&self) -> Option<Blob> {
        self.store.lock().live.get(&self.id).cloned()
    }

    /// Release now rather than at drop.
    pub fn revoke(self) {
        // Drop does the work
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.store.release(self.id);
    }
}

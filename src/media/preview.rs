use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::media::blob::MediaBlob;

#[derive(Debug, Default)]
struct PoolCounters {
    next_id: AtomicU64,
    allocated: AtomicU64,
    released: AtomicU64,
}

/// Allocator for displayable/seekable preview handles.
///
/// Handles release themselves on drop, so the pool only tracks counts. Cloning the pool shares
/// the same counters.
#[derive(Clone, Debug, Default)]
pub struct PreviewPool {
    counters: Arc<PoolCounters>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PreviewPoolStats {
    pub allocated: u64,
    pub released: u64,
}

impl PreviewPoolStats {
    pub fn live(self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

impl PreviewPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, blob: &MediaBlob) -> PreviewHandle {
        let id = self.counters.next_id.fetch_add(1, Ordering::Relaxed);
        self.counters.allocated.fetch_add(1, Ordering::Relaxed);
        PreviewHandle {
            id,
            uri: format!("preview://{id}/{}", blob.file_name),
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn stats(&self) -> PreviewPoolStats {
        PreviewPoolStats {
            allocated: self.counters.allocated.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
        }
    }

    /// Number of handles currently alive.
    pub fn live(&self) -> u64 {
        self.stats().live()
    }
}

/// Owned preview resource for one clip. Dropping it releases the resource.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    uri: String,
    counters: Arc<PoolCounters>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(preview = self.id, "preview released");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/preview.rs"]
mod tests;

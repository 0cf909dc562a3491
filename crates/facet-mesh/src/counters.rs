use std::sync::atomic::{AtomicI64, Ordering};

/// Process-wide advisory accounting of finished meshes. Never gates correctness.
#[derive(Debug, Default)]
pub struct MeshCounters {
    resident_bytes: AtomicI64,
    live_instances: AtomicI64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub resident_bytes: i64,
    pub live_instances: i64,
}

impl MeshCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mesh_created(&self, bytes: usize) {
        self.resident_bytes.fetch_add(bytes as i64, Ordering::Relaxed);
        self.live_instances.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mesh_destroyed(&self, bytes: usize) {
        self.resident_bytes.fetch_sub(bytes as i64, Ordering::Relaxed);
        self.live_instances.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn resident_bytes(&self) -> i64 {
        self.resident_bytes.load(Ordering::Relaxed)
    }

    pub fn live_instances(&self) -> i64 {
        self.live_instances.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            resident_bytes: self.resident_bytes(),
            live_instances: self.live_instances(),
        }
    }
}

use std::sync::{Arc, Mutex};

use crate::cas::Cas;
use crate::error::Result;
use crate::hash::Hash;

/// counters for operations against a wrapped store
#[derive(Clone, Debug, Default)]
pub struct WriteStats {
    /// total number of write calls
    pub total_writes: usize,
    /// writes that stored new data
    pub actual_writes: usize,
    /// writes skipped because the object already existed
    pub deduplicated_writes: usize,
    /// total number of read calls
    pub reads: usize,
    /// digests of objects that were actually written
    pub written: Vec<Hash>,
}

/// wraps a [`Cas`] and records write/read activity.
///
/// used by tests to observe structural sharing (how many nodes a rebuild
/// actually stores) and diff pruning (how many nodes a diff actually loads).
pub struct TrackingCas {
    inner: Arc<dyn Cas>,
    stats: Mutex<WriteStats>,
}

impl TrackingCas {
    pub fn new(inner: Arc<dyn Cas>) -> Self {
        Self {
            inner,
            stats: Mutex::new(WriteStats::default()),
        }
    }

    /// snapshot of the current counters
    pub fn stats(&self) -> WriteStats {
        self.stats.lock().expect("stats lock poisoned").clone()
    }

    /// clear all counters
    pub fn reset_stats(&self) {
        *self.stats.lock().expect("stats lock poisoned") = WriteStats::default();
    }
}

impl Cas for TrackingCas {
    fn write(&self, data: &[u8]) -> Result<Hash> {
        let existed_before = self.inner.exists(Hash::of(data));
        let hash = self.inner.write(data)?;

        let mut stats = self.stats.lock().expect("stats lock poisoned");
        stats.total_writes += 1;
        if existed_before {
            stats.deduplicated_writes += 1;
        } else {
            stats.actual_writes += 1;
            stats.written.push(hash);
        }

        Ok(hash)
    }

    fn read(&self, hash: Hash) -> Result<Vec<u8>> {
        self.stats.lock().expect("stats lock poisoned").reads += 1;
        self.inner.read(hash)
    }

    fn exists(&self, hash: Hash) -> bool {
        self.inner.exists(hash)
    }
}

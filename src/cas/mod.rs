//! content-addressed object storage
//!
//! every object is an opaque byte string addressed by the SHA-256 digest of
//! its contents. objects are immutable and deduplicated: writing the same
//! bytes twice stores them once.

mod file;
mod tracking;

pub use file::FileCas;
pub use tracking::{TrackingCas, WriteStats};

use crate::error::Result;
use crate::hash::Hash;

/// content-addressed storage operations
///
/// passed as an explicit collaborator to every higher component, so tests can
/// substitute wrappers like [`TrackingCas`].
pub trait Cas: Send + Sync {
    /// store `data` durably and return its digest. if an object with the same
    /// digest already exists the bytes are not rewritten.
    fn write(&self, data: &[u8]) -> Result<Hash>;

    /// retrieve an object by digest
    fn read(&self, hash: Hash) -> Result<Vec<u8>>;

    /// check whether a digest has a stored object
    fn exists(&self, hash: Hash) -> bool;
}

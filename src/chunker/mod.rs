//! content-defined chunking of sorted key/value pairs
//!
//! boundaries are chosen by a rolling hash over each pair's canonical
//! serialization, so the same pairs always split the same way no matter how
//! the data arrived at its current state. this is what makes tree structure
//! history-independent and diffs cheap.

pub mod rolling;

use serde::{Deserialize, Serialize};

use crate::tree::node::{encode_pair, Pair};

pub use rolling::Buzhash;

/// boundary parameters, in bytes of serialized pair content.
///
/// these are wire format together with the rolling hash table: changing any
/// of them changes every digest a store produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerParams {
    /// average chunk size (boundary when hash % target_size == 0)
    pub target_size: u32,
    /// prevents tiny chunks
    pub min_size: u32,
    /// prevents huge chunks
    pub max_size: u32,
}

impl Default for ChunkerParams {
    fn default() -> Self {
        Self {
            target_size: 4096,
            min_size: 512,
            max_size: 16384,
        }
    }
}

/// splits sorted pairs into contiguous chunks with content-defined boundaries
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    params: ChunkerParams,
}

impl Chunker {
    pub fn new(params: ChunkerParams) -> Self {
        Self { params }
    }

    /// split `pairs` into contiguous non-empty chunks whose concatenation is
    /// the input. identical input always produces identical chunks.
    ///
    /// each pair's serialization is fed byte-by-byte through the rolling
    /// hash; a chunk closes after the first pair at which the hasher reports
    /// a boundary (minimum and maximum sizes included).
    pub fn chunk<'a>(&self, pairs: &'a [Pair]) -> Vec<&'a [Pair]> {
        if pairs.is_empty() {
            return Vec::new();
        }

        let mut hasher = Buzhash::new(
            self.params.target_size,
            self.params.min_size,
            self.params.max_size,
        );

        let mut chunks = Vec::new();
        let mut start = 0;

        for (i, pair) in pairs.iter().enumerate() {
            for &byte in &encode_pair(&pair.key, &pair.value) {
                hasher.roll(byte);
            }

            if hasher.is_boundary() {
                chunks.push(&pairs[start..=i]);
                start = i + 1;
                hasher.reset();
            }
        }

        // the tail chunk, if any pairs remain past the last boundary
        if start < pairs.len() {
            chunks.push(&pairs[start..]);
        }

        chunks
    }
}

//! grove - versioned key-value store on a prolly tree
//!
//! an embedded, single-writer key-value store whose on-disk state is a
//! git-like history of immutable snapshots. every snapshot is a prolly tree:
//! sorted pairs chunked by a rolling hash, so identical data always produces
//! identical trees no matter how the data got there. that makes unchanged
//! subtrees deduplicate in storage and lets diffs skip them by comparing
//! digests.
//!
//! # Core concepts
//!
//! - **Pair**: opaque key/value byte strings, ordered by key
//! - **CAS**: immutable objects addressed by the SHA-256 of their bytes
//! - **Prolly tree**: content-defined chunks of sorted pairs, stored in CAS
//! - **Commit**: a tree root with a parent link, message, and timestamp
//! - **Branch**: a mutable named pointer to a commit
//! - **HEAD**: the current position, attached to a branch or detached at a
//!   commit
//!
//! # Example usage
//!
//! ```no_run
//! use grove::Store;
//! use std::path::Path;
//!
//! let store = Store::open(Path::new("/path/to/data")).unwrap();
//!
//! store.put(b"user:1", b"alice").unwrap();
//! store.put(b"user:2", b"bob").unwrap();
//! let c1 = store.commit("initial data").unwrap();
//!
//! store.put(b"user:1", b"alice_v2").unwrap();
//! let c2 = store.commit("edit").unwrap();
//!
//! // time travel and structural diff
//! assert_eq!(store.get_at(b"user:1", c1).unwrap(), b"alice");
//! let changes = store.diff(c1, c2).unwrap();
//! assert_eq!(changes.modified.len(), 1);
//! ```

mod config;
mod error;
mod fsutil;
mod hash;
mod store;

pub mod cas;
pub mod chunker;
pub mod commit;
pub mod refs;
pub mod tree;

pub use cas::{Cas, FileCas, TrackingCas};
pub use chunker::{Buzhash, Chunker, ChunkerParams};
pub use commit::{Commit, Commits};
pub use config::Config;
pub use error::{Error, Result};
pub use hash::Hash;
pub use refs::{Branches, Head, HeadFile};
pub use store::Store;
pub use tree::{
    ChildRef, DiffEngine, DiffResult, Modified, Node, Pair, TreeBuilder, TreeReader,
};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cas::Cas;
use crate::error::{Error, Result};
use crate::hash::Hash;

/// a snapshot record: tree root, parent link, message, wall-clock timestamp.
///
/// commits are stored in the object store like any other object; a commit's
/// identity is the digest of its canonical json encoding. field order is
/// fixed (root_hash, message, parent, timestamp) so equal logical commits
/// produce equal digests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// root digest of the tree snapshot
    pub root_hash: Hash,
    /// free-form utf-8 message
    pub message: String,
    /// parent commit digest; zero for the initial commit
    pub parent: Hash,
    /// unix timestamp in seconds
    pub timestamp: i64,
}

impl Commit {
    /// create a commit stamped with the current unix time
    pub fn new(root_hash: Hash, parent: Hash, message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self::with_timestamp(root_hash, parent, timestamp, message)
    }

    /// create a commit with an explicit timestamp
    pub fn with_timestamp(
        root_hash: Hash,
        parent: Hash,
        timestamp: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            root_hash,
            message: message.into(),
            parent,
            timestamp,
        }
    }

    /// is this the first commit in its history
    pub fn is_root(&self) -> bool {
        self.parent == Hash::ZERO
    }

    /// canonical json encoding
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// decode a commit; any parse failure is a corrupt object
    pub fn decode(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::CorruptObject(format!("commit: {e}")))
    }
}

/// commit storage and history walking over an object store
pub struct Commits {
    cas: Arc<dyn Cas>,
}

impl Commits {
    pub fn new(cas: Arc<dyn Cas>) -> Self {
        Self { cas }
    }

    /// create and persist a commit; returns the record and its digest
    pub fn create(&self, root_hash: Hash, message: &str, parent: Hash) -> Result<(Commit, Hash)> {
        let commit = Commit::new(root_hash, parent, message);
        let hash = self.cas.write(&commit.encode()?)?;
        Ok((commit, hash))
    }

    /// read a commit by digest
    pub fn read(&self, hash: Hash) -> Result<Commit> {
        let data = self.cas.read(hash).map_err(|e| match e {
            Error::ObjectNotFound(h) => Error::CommitNotFound(h),
            other => other,
        })?;
        Commit::decode(&data)
    }

    /// walk the parent chain from `hash` down to the zero digest, newest
    /// first
    pub fn walk(&self, hash: Hash) -> Result<Vec<(Hash, Commit)>> {
        let mut entries = Vec::new();

        let mut current = hash;
        while current != Hash::ZERO {
            let commit = self.read(current)?;
            let parent = commit.parent;
            entries.push((current, commit));
            current = parent;
        }

        Ok(entries)
    }
}

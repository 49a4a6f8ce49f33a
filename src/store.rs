use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

use crate::cas::{Cas, FileCas};
use crate::chunker::Chunker;
use crate::commit::{Commit, Commits};
use crate::config::Config;
use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::refs::{Branches, Head, HeadFile, DEFAULT_BRANCH};
use crate::tree::{DiffEngine, DiffResult, Pair, TreeBuilder, TreeReader};

/// mutable facade state guarded by the readers-writer lock
struct State {
    /// uncommitted edits, sorted by key
    working: BTreeMap<Vec<u8>, Vec<u8>>,
    /// cached effective head commit (zero in a fresh store)
    head: Hash,
}

/// the versioned key-value store
///
/// edits accumulate in an in-memory working map; `commit` snapshots it as a
/// prolly tree, records a commit object, and advances the current branch (or
/// a detached HEAD). reads at old commits, structural diffs, and git-style
/// branching all operate over the same content-addressed object store.
///
/// a single store instance supports one writer and many readers; a
/// readers-writer lock guards the working state, and an advisory file lock
/// keeps a second process off the data directory entirely.
pub struct Store {
    cas: Arc<dyn Cas>,
    builder: TreeBuilder,
    reader: TreeReader,
    differ: DiffEngine,
    commits: Commits,
    branches: Branches,
    head_file: HeadFile,
    state: RwLock<State>,
    _lock: StoreLock,
}

impl Store {
    /// open a store at `data_dir`, creating the directory layout on first
    /// use. a fresh store starts on a `main` branch with no commits.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).with_path(data_dir)?;
        let lock = StoreLock::acquire(data_dir)?;

        let config_path = data_dir.join("config.toml");
        let config = if config_path.exists() {
            Config::load(&config_path)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        let cas: Arc<dyn Cas> = Arc::new(FileCas::open(data_dir)?);
        let branches = Branches::open(data_dir)?;
        let head_file = HeadFile::new(data_dir);

        // bootstrap a fresh repository
        if branches.list()?.is_empty() {
            branches.create(DEFAULT_BRANCH, Hash::ZERO)?;
        }
        head_file.init(DEFAULT_BRANCH)?;

        let chunker = Chunker::new(config.chunker);
        let builder = TreeBuilder::new(Arc::clone(&cas), chunker);
        let reader = TreeReader::new(Arc::clone(&cas));
        let differ = DiffEngine::new(Arc::clone(&cas));
        let commits = Commits::new(Arc::clone(&cas));

        let head = head_file.read(&branches)?.commit();

        let store = Self {
            cas,
            builder,
            reader,
            differ,
            commits,
            branches,
            head_file,
            state: RwLock::new(State {
                working: BTreeMap::new(),
                head,
            }),
            _lock: lock,
        };

        if head != Hash::ZERO {
            let working = store.materialize(head)?;
            store.write_state().working = working;
        }

        Ok(store)
    }

    /// the object store backing this store
    pub fn cas(&self) -> &Arc<dyn Cas> {
        &self.cas
    }

    /// store a key-value pair in the working state
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        self.write_state().working.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// read a value from the working state
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        self.read_state()
            .working
            .get(key)
            .cloned()
            .ok_or(Error::KeyNotFound)
    }

    /// remove a key from the working state. there is no tombstone; the next
    /// committed tree simply lacks the key.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        match self.write_state().working.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::KeyNotFound),
        }
    }

    /// snapshot the working state as a new commit and return its digest.
    ///
    /// the tree and commit objects are durable before any pointer moves:
    /// an attached HEAD advances its branch, a detached HEAD moves itself.
    pub fn commit(&self, message: &str) -> Result<Hash> {
        let mut state = self.write_state();

        let pairs: Vec<Pair> = state
            .working
            .iter()
            .map(|(k, v)| Pair {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();

        let root = self.builder.build(&pairs)?;
        let (_, commit_hash) = self.commits.create(root, message, state.head)?;

        match self.head_file.read(&self.branches)? {
            Head::Attached { branch, .. } => self.branches.update(&branch, commit_hash)?,
            Head::Detached { .. } => self.head_file.set_detached(commit_hash)?,
        }

        state.head = commit_hash;
        debug!(commit = %commit_hash, message, "created commit");
        Ok(commit_hash)
    }

    /// read a key as it existed at a specific commit
    pub fn get_at(&self, key: &[u8], commit: Hash) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let _state = self.read_state();
        let record = self.commits.read(commit)?;
        self.reader.get(record.root_hash, key)
    }

    /// detach HEAD onto a commit and rebuild the working state from its tree
    pub fn checkout(&self, commit: Hash) -> Result<()> {
        let mut state = self.write_state();

        // validate the commit and materialize before touching HEAD, so a
        // failure leaves nothing half-moved
        let working = self.materialize(commit)?;
        self.head_file.set_detached(commit)?;

        state.working = working;
        state.head = commit;
        debug!(commit = %commit, "checked out commit, HEAD detached");
        Ok(())
    }

    /// detach HEAD onto a commit; same behavior as [`Store::checkout`]
    pub fn detach_head(&self, commit: Hash) -> Result<()> {
        self.checkout(commit)
    }

    /// attach HEAD to an existing branch and rebuild the working state from
    /// the branch's commit (empty if the branch has none)
    pub fn switch_branch(&self, name: &str) -> Result<()> {
        let mut state = self.write_state();

        let target = self.branches.get(name)?;
        let working = if target == Hash::ZERO {
            BTreeMap::new()
        } else {
            self.materialize(target)?
        };
        self.head_file.set_attached(&self.branches, name)?;

        state.working = working;
        state.head = target;
        debug!(branch = name, commit = %target, "switched branch");
        Ok(())
    }

    /// diff the trees of two commits
    pub fn diff(&self, a: Hash, b: Hash) -> Result<DiffResult> {
        let _state = self.read_state();
        let commit_a = self.commits.read(a)?;
        let commit_b = self.commits.read(b)?;
        self.differ.diff(commit_a.root_hash, commit_b.root_hash)
    }

    /// commit history from the current HEAD, newest first; empty in a fresh
    /// store
    pub fn log(&self) -> Result<Vec<(Hash, Commit)>> {
        let state = self.read_state();
        if state.head == Hash::ZERO {
            return Ok(Vec::new());
        }
        self.commits.walk(state.head)
    }

    /// the effective head commit digest (zero in a fresh store)
    pub fn head(&self) -> Hash {
        self.read_state().head
    }

    /// the full HEAD state: attached branch or detached commit
    pub fn head_state(&self) -> Result<Head> {
        let _state = self.read_state();
        self.head_file.read(&self.branches)
    }

    /// current branch name and detached flag; the name is `None` when HEAD
    /// is detached
    pub fn current_branch(&self) -> Result<(Option<String>, bool)> {
        match self.head_state()? {
            Head::Attached { branch, .. } => Ok((Some(branch), false)),
            Head::Detached { .. } => Ok((None, true)),
        }
    }

    /// create a branch at the current effective head
    pub fn create_branch(&self, name: &str) -> Result<()> {
        let state = self.read_state();
        self.branches.create(name, state.head)?;
        debug!(branch = name, commit = %state.head, "created branch");
        Ok(())
    }

    /// create a branch at a specific commit
    pub fn create_branch_at(&self, name: &str, commit: Hash) -> Result<()> {
        let _state = self.read_state();
        if commit != Hash::ZERO {
            self.commits.read(commit)?;
        }
        self.branches.create(name, commit)?;
        debug!(branch = name, commit = %commit, "created branch");
        Ok(())
    }

    /// delete a branch; the currently attached branch cannot be deleted
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let _state = self.write_state();

        if let Head::Attached { branch, .. } = self.head_file.read(&self.branches)? {
            if branch == name {
                return Err(Error::CannotDeleteCurrent(name.to_string()));
            }
        }

        self.branches.delete(name)?;
        debug!(branch = name, "deleted branch");
        Ok(())
    }

    /// all branch names, sorted
    pub fn list_branches(&self) -> Result<Vec<String>> {
        let _state = self.read_state();
        self.branches.list()
    }

    /// branch names matching a glob pattern
    pub fn list_branches_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let _state = self.read_state();
        self.branches.list_matching(pattern)
    }

    /// close the store, releasing the process lock. dropping the store has
    /// the same effect.
    pub fn close(self) -> Result<()> {
        Ok(())
    }

    /// working map for a commit's tree; empty map for the zero digest
    fn materialize(&self, commit: Hash) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        if commit == Hash::ZERO {
            return Ok(BTreeMap::new());
        }

        let record = self.commits.read(commit)?;
        let pairs = self.reader.get_all(record.root_hash)?;
        Ok(pairs.into_iter().map(|p| (p.key, p.value)).collect())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("state lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("state lock poisoned")
    }
}

/// advisory exclusive lock on the data directory, held for the lifetime of
/// the store and released on drop
struct StoreLock {
    _flock: Flock<File>,
}

impl StoreLock {
    fn acquire(data_dir: &Path) -> Result<Self> {
        let lock_path = data_dir.join(".lock");
        let file = File::create(&lock_path).with_path(&lock_path)?;

        let flock =
            Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|_| Error::StoreLocked)?;

        Ok(Self { _flock: flock })
    }
}

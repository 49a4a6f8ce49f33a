use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fsutil::write_atomic;
use crate::hash::Hash;
use crate::refs::branch::{validate_branch_name, Branches};

/// prefix marking an attached HEAD in the head file
const HEAD_REF_PREFIX: &str = "ref: refs/heads/";

/// name of the branch a fresh store starts on
pub const DEFAULT_BRANCH: &str = "main";

/// the store's current position
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Head {
    /// HEAD follows a branch; `commit` is the branch target, zero when the
    /// branch has no commits yet
    Attached { branch: String, commit: Hash },
    /// HEAD points directly at a commit
    Detached { commit: Hash },
}

impl Head {
    /// the effective commit digest
    pub fn commit(&self) -> Hash {
        match self {
            Head::Attached { commit, .. } | Head::Detached { commit } => *commit,
        }
    }

    /// branch name when attached
    pub fn branch(&self) -> Option<&str> {
        match self {
            Head::Attached { branch, .. } => Some(branch),
            Head::Detached { .. } => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached { .. })
    }
}

/// reads and writes the HEAD file
///
/// format: `ref: refs/heads/<name>\n` when attached, a bare 64-char hex
/// digest line when detached. surrounding whitespace is tolerated on read.
pub struct HeadFile {
    path: PathBuf,
    tmp_dir: PathBuf,
}

impl HeadFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("HEAD"),
            tmp_dir: data_dir.join("tmp"),
        }
    }

    /// read the current head state, resolving attached branches through
    /// `branches`. a missing file reads as attached to the default branch
    /// with no commit.
    pub fn read(&self, branches: &Branches) -> Result<Head> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Head::Attached {
                    branch: DEFAULT_BRANCH.to_string(),
                    commit: Hash::ZERO,
                });
            }
            Err(e) => {
                return Err(Error::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        parse_head(content.trim(), branches)
    }

    /// attach HEAD to an existing branch
    pub fn set_attached(&self, branches: &Branches, name: &str) -> Result<()> {
        validate_branch_name(name)?;

        if !branches.exists(name) {
            return Err(Error::BranchNotFound(name.to_string()));
        }

        write_atomic(
            &self.tmp_dir,
            &self.path,
            format!("{HEAD_REF_PREFIX}{name}\n").as_bytes(),
        )
    }

    /// detach HEAD directly onto a commit
    pub fn set_detached(&self, commit: Hash) -> Result<()> {
        write_atomic(
            &self.tmp_dir,
            &self.path,
            format!("{}\n", commit.to_hex()).as_bytes(),
        )
    }

    /// write an initial attached HEAD if the file does not exist yet
    pub fn init(&self, default_branch: &str) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        write_atomic(
            &self.tmp_dir,
            &self.path,
            format!("{HEAD_REF_PREFIX}{default_branch}\n").as_bytes(),
        )
    }
}

fn parse_head(content: &str, branches: &Branches) -> Result<Head> {
    if content.is_empty() {
        return Err(Error::InvalidHead("empty HEAD file".to_string()));
    }

    if let Some(name) = content.strip_prefix(HEAD_REF_PREFIX) {
        if name.is_empty() {
            return Err(Error::InvalidHead("missing branch name".to_string()));
        }

        // a fresh repository's branch may not have a target yet
        let commit = match branches.get(name) {
            Ok(hash) => hash,
            Err(Error::BranchNotFound(_)) => Hash::ZERO,
            Err(e) => return Err(e),
        };

        return Ok(Head::Attached {
            branch: name.to_string(),
            commit,
        });
    }

    if content.len() != 64 {
        return Err(Error::InvalidHead(format!(
            "expected a ref line or a 64-char digest, got {} bytes",
            content.len()
        )));
    }

    let commit = Hash::from_hex(content)
        .map_err(|_| Error::InvalidHead(format!("bad digest: {content}")))?;
    Ok(Head::Detached { commit })
}

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::fsutil::write_atomic;
use crate::hash::Hash;

/// characters that are never allowed in branch names
const INVALID_CHARS: &[char] = &[' ', '~', '^', ':', '?', '*', '[', '\\'];

/// validate a branch name:
/// - non-empty, not the reserved name `HEAD`
/// - no leading `-` or `.`, no `.lock` suffix
/// - no `..`, `//`, leading/trailing `/`, NUL, or any of ` ~ ^ : ? * [ \`
///
/// slashes are otherwise fine: nested names like `feature/add-login` map to
/// nested reference files.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidBranchName("empty branch name".to_string()));
    }

    if name == "HEAD" {
        return Err(Error::InvalidBranchName(
            "HEAD is a reserved name".to_string(),
        ));
    }

    if name.starts_with('-') || name.starts_with('.') {
        return Err(Error::InvalidBranchName(format!(
            "branch name cannot start with '-' or '.': {name}"
        )));
    }

    if name.ends_with(".lock") {
        return Err(Error::InvalidBranchName(format!(
            "branch name cannot end with '.lock': {name}"
        )));
    }

    if name.contains("..") || name.contains("//") {
        return Err(Error::InvalidBranchName(format!(
            "branch name cannot contain '..' or '//': {name}"
        )));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::InvalidBranchName(format!(
            "branch name cannot start or end with '/': {name}"
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidBranchName(format!(
            "branch name cannot contain a null byte: {name}"
        )));
    }

    if name.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(Error::InvalidBranchName(format!(
            "branch name contains a forbidden character: {name}"
        )));
    }

    Ok(())
}

/// persisted branch references under `refs/heads/`
///
/// each branch is a file holding one hex digest; nested branch names map to
/// nested directories, so the namespace has git's file-vs-directory conflict
/// rules.
pub struct Branches {
    refs_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl Branches {
    /// open (creating if needed) the branch store under `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        let refs_dir = data_dir.join("refs").join("heads");
        fs::create_dir_all(&refs_dir).with_path(&refs_dir)?;

        let tmp_dir = data_dir.join("tmp");
        fs::create_dir_all(&tmp_dir).with_path(&tmp_dir)?;

        Ok(Self { refs_dir, tmp_dir })
    }

    fn branch_path(&self, name: &str) -> PathBuf {
        self.refs_dir.join(name)
    }

    /// check if a branch exists
    pub fn exists(&self, name: &str) -> bool {
        self.branch_path(name).is_file()
    }

    /// create a new branch pointing at `hash`
    pub fn create(&self, name: &str, hash: Hash) -> Result<()> {
        validate_branch_name(name)?;

        if self.exists(name) {
            return Err(Error::BranchExists(name.to_string()));
        }

        self.check_path_conflict(name)?;
        self.write_ref(name, hash)
    }

    /// a branch file at any parent path blocks nested names (`foo` blocks
    /// `foo/bar`), and nested branches under the target block the flat name
    /// (`foo/bar` blocks `foo`)
    fn check_path_conflict(&self, name: &str) -> Result<()> {
        let parts: Vec<&str> = name.split('/').collect();
        for i in 1..parts.len() {
            let parent = parts[..i].join("/");
            if self.branch_path(&parent).is_file() {
                return Err(Error::BranchPathConflict(name.to_string()));
            }
        }

        if self.branch_path(name).is_dir() {
            return Err(Error::BranchPathConflict(name.to_string()));
        }

        Ok(())
    }

    /// read the commit digest a branch points at
    pub fn get(&self, name: &str) -> Result<Hash> {
        let path = self.branch_path(name);

        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::BranchNotFound(name.to_string())
            } else {
                Error::Io { path, source: e }
            }
        })?;

        Hash::from_hex(content.trim())
    }

    /// move an existing branch to a new commit
    pub fn update(&self, name: &str, hash: Hash) -> Result<()> {
        if !self.exists(name) {
            return Err(Error::BranchNotFound(name.to_string()));
        }
        self.write_ref(name, hash)
    }

    /// delete a branch, pruning directories its nesting no longer needs
    pub fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(Error::BranchNotFound(name.to_string()));
        }

        let path = self.branch_path(name);
        fs::remove_file(&path).with_path(&path)?;

        // remove now-empty parent directories up to refs/heads
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == self.refs_dir.as_path() || fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }

        Ok(())
    }

    /// list all branch names, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut branches = Vec::new();

        for entry in WalkDir::new(&self.refs_dir).min_depth(1) {
            let entry = entry.map_err(|e| Error::Io {
                path: self.refs_dir.clone(),
                source: e.into(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            if let Ok(rel) = entry.path().strip_prefix(&self.refs_dir) {
                branches.push(rel.to_string_lossy().into_owned());
            }
        }

        branches.sort();
        Ok(branches)
    }

    /// list branch names matching a glob pattern, e.g. `feature/*`
    pub fn list_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let glob =
            glob::Pattern::new(pattern).map_err(|e| Error::InvalidBranchName(e.to_string()))?;
        Ok(self
            .list()?
            .into_iter()
            .filter(|name| glob.matches(name))
            .collect())
    }

    fn write_ref(&self, name: &str, hash: Hash) -> Result<()> {
        let path = self.branch_path(name);
        write_atomic(&self.tmp_dir, &path, format!("{}\n", hash.to_hex()).as_bytes())
    }
}

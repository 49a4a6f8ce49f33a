use std::fs;
use std::path::{Path, PathBuf};

use crate::cas::Cas;
use crate::error::{Error, IoResultExt, Result};
use crate::fsutil::write_atomic;
use crate::hash::Hash;

/// filesystem-backed object store
///
/// objects live at `objects/<first-2-hex>/<remaining-62-hex>` under the data
/// directory; the two-level split keeps directory fan-out manageable. writes
/// stage through the store's tmp/ directory and rename into place, so a crash
/// leaves an object either fully present or absent.
pub struct FileCas {
    objects_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl FileCas {
    /// open (creating if needed) the object store under `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        let objects_dir = data_dir.join("objects");
        fs::create_dir_all(&objects_dir).with_path(&objects_dir)?;

        let tmp_dir = data_dir.join("tmp");
        fs::create_dir_all(&tmp_dir).with_path(&tmp_dir)?;

        Ok(Self {
            objects_dir,
            tmp_dir,
        })
    }

    /// filesystem path for an object
    fn object_path(&self, hash: Hash) -> PathBuf {
        let (dir, file) = hash.to_path_components();
        self.objects_dir.join(dir).join(file)
    }
}

impl Cas for FileCas {
    fn write(&self, data: &[u8]) -> Result<Hash> {
        let hash = Hash::of(data);
        let path = self.object_path(hash);

        // deduplication: same digest means same content
        if path.exists() {
            return Ok(hash);
        }

        write_atomic(&self.tmp_dir, &path, data)?;
        Ok(hash)
    }

    fn read(&self, hash: Hash) -> Result<Vec<u8>> {
        let path = self.object_path(hash);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ObjectNotFound(hash)
            } else {
                Error::Io { path, source: e }
            }
        })
    }

    fn exists(&self, hash: Hash) -> bool {
        self.object_path(hash).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_cas() -> (tempfile::TempDir, FileCas) {
        let dir = tempdir().unwrap();
        let cas = FileCas::open(dir.path()).unwrap();
        (dir, cas)
    }

    #[test]
    fn test_write_and_read() {
        let (_dir, cas) = test_cas();

        let hash = cas.write(b"hello, world!").unwrap();
        assert!(cas.exists(hash));
        assert_eq!(cas.read(hash).unwrap(), b"hello, world!");
    }

    #[test]
    fn test_write_returns_content_digest() {
        let (_dir, cas) = test_cas();

        let hash = cas.write(b"some bytes").unwrap();
        assert_eq!(hash, Hash::of(b"some bytes"));
    }

    #[test]
    fn test_deduplication() {
        let (_dir, cas) = test_cas();

        let h1 = cas.write(b"duplicate content").unwrap();
        let h2 = cas.write(b"duplicate content").unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_read_nonexistent() {
        let (_dir, cas) = test_cas();

        let result = cas.read(Hash::of(b"never written"));
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }

    #[test]
    fn test_exists() {
        let (_dir, cas) = test_cas();

        let hash = cas.write(b"present").unwrap();
        assert!(cas.exists(hash));
        assert!(!cas.exists(Hash::of(b"absent")));
    }

    #[test]
    fn test_sharded_layout() {
        let (dir, cas) = test_cas();

        let hash = cas.write(b"layout check").unwrap();
        let (shard, rest) = hash.to_path_components();
        assert!(dir.path().join("objects").join(shard).join(rest).is_file());
    }

    #[test]
    fn test_objects_survive_reopen() {
        let dir = tempdir().unwrap();

        let hash = {
            let cas = FileCas::open(dir.path()).unwrap();
            cas.write(b"persistent").unwrap()
        };

        let cas = FileCas::open(dir.path()).unwrap();
        assert_eq!(cas.read(hash).unwrap(), b"persistent");
    }

    #[test]
    fn test_empty_object() {
        let (_dir, cas) = test_cas();

        let hash = cas.write(b"").unwrap();
        assert_eq!(cas.read(hash).unwrap(), Vec::<u8>::new());
    }
}

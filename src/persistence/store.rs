//! Durable key→JSON store with advisory file locks.
//!
//! Keys are relative paths under the store root. Writers never leave a
//! partially written file behind: values are written to a sibling temp file
//! and renamed into place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MintrunnerError, Result};

/// Filesystem-backed store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a store key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Read and deserialize a JSON value, `None` if the key does not exist.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Write a JSON value atomically: serialize to `<key>.tmp`, then rename
    /// over the destination so a concurrent reader sees old or new, never a
    /// torn write.
    pub fn write_json_atomic<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key);
        Self::ensure_parent(&path)?;

        let tmp = path.with_extension("tmp");
        let body = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        debug!(key, "wrote json");
        Ok(())
    }

    /// Append one JSON object as a single line to an append-only log.
    pub fn append_jsonl<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key);
        Self::ensure_parent(&path)?;

        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        Ok(())
    }

    /// Acquire an advisory lock by creating the lock file exclusively.
    ///
    /// A pre-existing lock file means another invocation owns the strategy:
    /// the caller gets `LockBusy` and must abort without side effects. The
    /// returned guard removes the file on drop, so the lock is released on
    /// every exit path including errors and panics.
    pub fn acquire_lock(&self, key: &str) -> Result<LockGuard> {
        let path = self.path(key);
        Self::ensure_parent(&path)?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // Owner pid doubles as a liveness hint for operators.
                let _ = write!(file, "{}", std::process::id());
                debug!(path = %path.display(), "lock acquired");
                Ok(LockGuard {
                    path,
                    released: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(MintrunnerError::LockBusy(path))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Scoped ownership of an advisory lock file.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

impl LockGuard {
    /// Remove the lock file. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        n: u32,
    }

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn read_missing_key_is_none() {
        let (_dir, store) = store();
        let got: Option<Doc> = store.read_json("state/missing.json").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn write_then_read_round_trip() {
        let (_dir, store) = store();
        let doc = Doc {
            name: "s1".into(),
            n: 7,
        };
        store.write_json_atomic("state/s1.json", &doc).unwrap();
        let got: Doc = store.read_json("state/s1.json").unwrap().unwrap();
        assert_eq!(got, doc);
        // No temp file left behind.
        assert!(!store.path("state/s1.tmp").exists());
    }

    #[test]
    fn append_jsonl_accumulates_lines() {
        let (_dir, store) = store();
        store
            .append_jsonl("runs/s1.jsonl", &serde_json::json!({"t": 1}))
            .unwrap();
        store
            .append_jsonl("runs/s1.jsonl", &serde_json::json!({"t": 2}))
            .unwrap();
        let text = fs::read_to_string(store.path("runs/s1.jsonl")).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn second_lock_acquisition_is_busy() {
        let (_dir, store) = store();
        let guard = store.acquire_lock("state/s1.lock").unwrap();
        let busy = store.acquire_lock("state/s1.lock");
        assert!(matches!(busy, Err(MintrunnerError::LockBusy(_))));
        drop(guard);
        // Released on drop; reacquirable.
        let _guard2 = store.acquire_lock("state/s1.lock").unwrap();
    }

    #[test]
    fn lock_release_is_idempotent() {
        let (_dir, store) = store();
        let mut guard = store.acquire_lock("state/s1.lock").unwrap();
        guard.release();
        guard.release();
        assert!(!store.path("state/s1.lock").exists());
    }
}

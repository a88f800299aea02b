use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod client_state;
pub mod config;
pub mod logs;
pub mod writer;

pub use config::ScopeConfig;
pub use logs::{filter_sessions, list_sessions, read_all_events, session_events};
pub use writer::StructuredLogger;

/// Errors a caller may want to tell apart from plain I/O failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("logs path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Return the per-user store root: `<data_dir>/ragscope/`
/// (falls back to `~/.ragscope/`).
pub fn store_root() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("ragscope")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".ragscope")
    } else {
        PathBuf::from(".ragscope-store")
    }
}

/// Directory for small client-side state files.
pub fn state_dir(root: &Path) -> PathBuf {
    root.join("state")
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// File-based exclusive lock guard.
pub struct LockGuard {
    _file: fs::File,
}

/// Acquire an exclusive file lock. Creates the lock file if needed.
pub fn lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(LockGuard { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_root_is_not_empty() {
        let root = store_root();
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn write_atomic_creates_parent_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("test.txt");
        write_atomic(&path, b"hello world").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.txt");
        write_atomic(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn lock_file_acquires_and_drops() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("test.lock");
        let guard = lock_file(&lock_path).unwrap();
        assert!(lock_path.exists());
        drop(guard);
        let _again = lock_file(&lock_path).unwrap();
    }

    #[test]
    fn state_dir_is_under_root() {
        let root = Path::new("/tmp/ragscope");
        assert_eq!(state_dir(root), root.join("state"));
    }
}

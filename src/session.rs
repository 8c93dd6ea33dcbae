//! Session persistence for the Telegram client
//!
//! Provides:
//! - Stable per-phone session keys (SHA-256 of the phone string)
//! - Whole-file load and atomic save of the opaque session blob
//! - Per-phone lock file to keep two runs off the same session

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const SESSION_EXTENSION: &str = "session";
pub const LOCK_EXTENSION: &str = "lock";

/// Opaque serialized authentication state.
#[derive(Clone, PartialEq, Eq)]
pub struct Session(Vec<u8>);

impl Session {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Session bytes carry auth keys; never print them.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({} bytes)", self.0.len())
    }
}

/// Filesystem-safe key derived from a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_phone(phone: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(phone.as_bytes())))
    }

    /// Lowercase hex digest, always 64 characters.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, SESSION_EXTENSION)
    }

    fn lock_name(&self) -> String {
        format!("{}.{}", self.0, LOCK_EXTENSION)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory of `<key>.session` files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open the store, creating the directory if it does not exist yet.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            info!(dir = %dir.display(), "created sessions directory");
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Read the stored session, if any.
    pub fn load(&self, key: &SessionKey) -> Result<Option<Session>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => {
                warn!(path = %path.display(), "session file is empty, ignoring it");
                Ok(None)
            }
            Ok(bytes) => {
                debug!(session = %key, len = bytes.len(), "loaded session");
                Ok(Some(Session::new(bytes)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(session = %key, "no stored session");
                Ok(None)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Replace the stored session atomically: temp file in the same directory,
    /// fsync, rename over the destination.
    pub fn save(&self, key: &SessionKey, session: &Session) -> Result<()> {
        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(session.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        info!(session = %key, len = session.len(), "session saved");
        Ok(())
    }

    /// Take the exclusive per-phone lock for the duration of a run.
    pub fn lock(&self, key: &SessionKey) -> Result<SessionLock> {
        SessionLock::acquire(self.dir.join(key.lock_name()))
    }
}

/// Session lock guard that ensures exclusive access to one phone's session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock on `path`, failing fast if it is held.
    pub fn acquire<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                warn!(path = %path.display(), "session lock is held by another process");
                Err(Error::SessionLocked)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

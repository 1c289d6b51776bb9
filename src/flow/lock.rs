//! Advisory per-file locks shared by concurrent `scrivener flow` processes.
//!
//! A lock is a file under `<git-dir>/scrivener-locks/` named after the
//! SHA-256 of the normalized path, created with `create_new` so only one
//! process wins. Contention is not an error: the caller skips the file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::commit::changeset::normalize_path;
use crate::error::LockError;

pub const LOCK_DIR_NAME: &str = "scrivener-locks";

/// Locks older than this are reclaimable even if their owner is alive.
pub const STALE_AFTER_SECS: i64 = 30 * 60;

/// Parsed contents of a lock file: `pid\nepoch\npath\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    pub created_at: i64,
    pub file: String,
}

impl LockRecord {
    pub fn parse(contents: &str) -> Option<Self> {
        let mut lines = contents.lines();
        let pid = lines.next()?.trim().parse().ok()?;
        let created_at = lines.next()?.trim().parse().ok()?;
        let file = lines.next().unwrap_or_default().to_string();
        Some(Self {
            pid,
            created_at,
            file,
        })
    }

    fn render(&self) -> String {
        format!("{}\n{}\n{}\n", self.pid, self.created_at, self.file)
    }
}

/// Whether a lock may be reclaimed: too old, or its owner is gone.
pub fn lock_is_stale(record: &LockRecord, now: i64, is_alive: impl Fn(u32) -> bool) -> bool {
    if now - record.created_at > STALE_AFTER_SECS {
        return true;
    }
    !is_alive(record.pid)
}

/// Probe a process with signal 0. "Not permitted" means it exists under
/// another user, so it counts as alive.
///
/// Pid 0 never owns a lock: `kill -0 0` would probe our own process group.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let output = Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(Stdio::null())
        .output();
    match output {
        Ok(out) if out.status.success() => true,
        Ok(out) => String::from_utf8_lossy(&out.stderr)
            .to_lowercase()
            .contains("not permitted"),
        // Cannot probe; treat as alive and let the age limit decide.
        Err(_) => true,
    }
}

#[cfg(not(unix))]
pub fn pid_alive(pid: u32) -> bool {
    pid != 0
}

#[derive(Debug, Clone)]
pub struct LockManager {
    dir: PathBuf,
}

impl LockManager {
    /// Locks live under `git_dir`, invisible to the working tree.
    pub fn new(git_dir: &Path) -> Self {
        Self {
            dir: git_dir.join(LOCK_DIR_NAME),
        }
    }

    pub fn lock_path(&self, file: &str) -> PathBuf {
        let digest = Sha256::digest(normalize_path(file).as_bytes());
        self.dir.join(format!("{}.lock", hex::encode(digest)))
    }

    /// Try to take the lock for `file`. `Ok(None)` means another live
    /// process holds it.
    pub fn acquire(&self, file: &str) -> Result<Option<FileLock>, LockError> {
        fs::create_dir_all(&self.dir).map_err(|source| LockError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.lock_path(file);
        if self.try_create(&path, file)? {
            return Ok(Some(FileLock::new(path)));
        }

        let now = Utc::now().timestamp();
        let stale = match fs::read_to_string(&path).ok().and_then(|c| LockRecord::parse(&c)) {
            Some(record) => lock_is_stale(&record, now, pid_alive),
            // The owner may still be writing the record; only age can tell.
            None => file_age(&path, now).is_none_or(|age| age > STALE_AFTER_SECS),
        };
        if !stale {
            debug!("{} is locked by another process", file);
            return Ok(None);
        }

        info!("Reclaiming stale lock for {}", file);
        remove_if_present(&path)?;
        if self.try_create(&path, file)? {
            Ok(Some(FileLock::new(path)))
        } else {
            // Someone else reclaimed it first.
            Ok(None)
        }
    }

    pub fn release(&self, mut lock: FileLock) -> Result<(), LockError> {
        lock.released = true;
        remove_if_present(&lock.path)
    }

    fn try_create(&self, path: &Path, file: &str) -> Result<bool, LockError> {
        let handle = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(source) => {
                return Err(LockError::Write {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let record = LockRecord {
            pid: std::process::id(),
            created_at: Utc::now().timestamp(),
            file: normalize_path(file),
        };
        write_record(path, handle, &record)?;
        Ok(true)
    }
}

/// Fill a freshly created lock file. On failure the file is removed, since
/// an empty lock would look held until it ages out.
fn write_record(path: &Path, mut handle: impl Write, record: &LockRecord) -> Result<(), LockError> {
    if let Err(source) = handle.write_all(record.render().as_bytes()) {
        drop(handle);
        if let Err(e) = remove_if_present(path) {
            warn!("{}", e);
        }
        return Err(LockError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Seconds since `path` was last written, `None` if it is gone.
fn file_age(path: &Path, now: i64) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let modified = chrono::DateTime::<Utc>::from(modified).timestamp();
    Some(now - modified)
}

fn remove_if_present(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A held lock. Dropping it without [`LockManager::release`] still removes
/// the file, so early returns cannot leak locks.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    released: bool,
}

impl FileLock {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = remove_if_present(&self.path)
        {
            warn!("{}", e);
        }
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! File-based primitives shared by every worker: aged-file scanning,
//! archive-by-move/archive-by-truncate, JSON-lines append/load, and a
//! cross-process advisory lock for the shared spot log.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error archiving {0}: {1}")]
    Io(PathBuf, std::io::Error),
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to open lock file {0}: {1}")]
    Open(PathBuf, std::io::Error),
    #[error("failed to acquire lock on {0}: {1}")]
    Acquire(PathBuf, std::io::Error),
}

/// How [`archive_file`] disposes of the original file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMethod {
    /// Rename the original to the archive destination.
    Move,
    /// Copy to the archive destination, then empty the original in place
    /// (preserves permissions/inode, e.g. for a PID file another process
    /// still has open).
    Truncate,
}

/// List entries of `dir` whose name matches `filter` and whose mtime is
/// older than `age_secs`, sorted lexicographically (processing order
/// follows filename, which embeds a recording timestamp).
pub fn find_aged_files<F>(dir: &Path, age_secs: u64, filter: F) -> std::io::Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let now = SystemTime::now();
    let mut out = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !filter(name) {
            continue;
        }
        let meta = entry.metadata()?;
        let age = now
            .duration_since(meta.modified()?)
            .unwrap_or_default()
            .as_secs_f64();
        if age > age_secs as f64 {
            out.push(entry.path());
        }
    }

    out.sort();
    Ok(out)
}

/// Empty a file in place without removing it.
pub fn truncate_file(path: &Path) -> Result<(), ArchiveError> {
    File::create(path).map_err(|e| ArchiveError::Io(path.to_path_buf(), e))?;
    Ok(())
}

/// Archive `path` by moving or truncate-copying it to `archive_dir` (or
/// alongside itself, if `archive_dir` is `None`), suffixed with the
/// current local datetime to millisecond precision.
pub fn archive_file(
    path: &Path,
    archive_dir: Option<&Path>,
    method: ArchiveMethod,
) -> Result<PathBuf, ArchiveError> {
    if !path.exists() {
        return Err(ArchiveError::Io(
            path.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "archive source missing"),
        ));
    }

    let dt_suffix = Local::now().format("%Y%m%d_%H%M%S%.3f").to_string();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let archived_name = format!("{file_name}.{dt_suffix}");

    let dest = match archive_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| ArchiveError::Io(dir.to_path_buf(), e))?;
            dir.join(archived_name)
        }
        None => path
            .parent()
            .map(|p| p.join(&archived_name))
            .unwrap_or_else(|| PathBuf::from(&archived_name)),
    };

    match method {
        ArchiveMethod::Move => {
            fs::rename(path, &dest).map_err(|e| ArchiveError::Io(path.to_path_buf(), e))?;
        }
        ArchiveMethod::Truncate => {
            fs::copy(path, &dest).map_err(|e| ArchiveError::Io(path.to_path_buf(), e))?;
            truncate_file(path)?;
        }
    }

    Ok(dest)
}

/// Write each (non-empty) string in `items` to `path`, creating it if
/// necessary and appending unless `append` is false.
pub fn write_strings_to_file<S: AsRef<str>>(
    path: &Path,
    items: &[S],
    append: bool,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    for item in items {
        file.write_all(item.as_ref().as_bytes())?;
    }
    Ok(())
}

/// Append one JSON object per line to `path`.
pub fn append_json_lines<T: Serialize>(path: &Path, items: &[T]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for item in items {
        let line =
            serde_json::to_string(item).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Load every well-formed JSON line from `path`; malformed lines are
/// logged and skipped rather than failing the whole load.
pub fn load_json_lines<T: DeserializeOwned>(path: &Path) -> std::io::Result<Vec<T>> {
    let file = File::open(path)?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(v) => out.push(v),
            Err(e) => tracing::warn!("invalid decode message: [{}] ignored: {}", line, e),
        }
    }
    Ok(out)
}

/// A held exclusive advisory lock (`flock(LOCK_EX)`) on a file, released
/// when dropped. Used to serialize concurrent worker appends to the
/// shared spot log across processes.
pub struct SpotLogLock {
    _file: File,
}

impl SpotLogLock {
    /// Open (creating if needed) and exclusively lock `path`, blocking
    /// until acquired.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LockError::Open(path.to_path_buf(), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if ret != 0 {
                return Err(LockError::Acquire(path.to_path_buf(), std::io::Error::last_os_error()));
            }
        }

        Ok(SpotLogLock { _file: file })
    }
}

impl Drop for SpotLogLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self._file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn finds_only_aged_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.wav"), b"x").unwrap();
        sleep(Duration::from_millis(50));
        let cutoff = 0.02;
        let found = find_aged_files(dir.path(), 0, |n| n.ends_with(".wav")).unwrap();
        assert_eq!(found.len(), 1);
        let _ = cutoff;
    }

    #[test]
    fn archive_move_relocates_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("foo.pid");
        fs::write(&src, b"123").unwrap();
        let dest = archive_file(&src, None, ArchiveMethod::Move).unwrap();
        assert!(!src.exists());
        assert!(dest.exists());
        assert!(dest.file_name().unwrap().to_str().unwrap().starts_with("foo.pid."));
    }

    #[test]
    fn archive_truncate_keeps_original_path() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("spot.log");
        fs::write(&src, b"hello\n").unwrap();
        let dest = archive_file(&src, None, ArchiveMethod::Truncate).unwrap();
        assert!(src.exists());
        assert_eq!(fs::metadata(&src).unwrap().len(), 0);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello\n");
    }

    #[test]
    fn json_lines_round_trip_and_skip_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        append_json_lines(&path, &[1, 2, 3]).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not json\n")
            .unwrap();
        append_json_lines(&path, &[4]).unwrap();

        let loaded: Vec<i32> = load_json_lines(&path).unwrap();
        assert_eq!(loaded, vec![1, 2, 3, 4]);
    }

    #[test]
    fn lock_is_reentrant_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spot.lock");
        {
            let _l1 = SpotLogLock::acquire(&path).unwrap();
        }
        let _l2 = SpotLogLock::acquire(&path).unwrap();
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The control process's own PID sidecar (`js8decoder.pid`), written
//! once at `decode start` and read back by `stop`/`status`/rebuild.
//!
//! Grounded on the reference tool's `saveDecoderPid`/`loadDecoderPid`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecoderPidError {
    #[error("I/O error on decoder pid file {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("malformed decoder pid file: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderPid {
    pub pid: u32,
    pub timestamp: i64,
}

pub fn decoder_pid_path(data_root: &Path) -> PathBuf {
    data_root.join("js8decoder.pid")
}

pub fn save_decoder_pid(path: &Path, pid: u32, timestamp: i64) -> Result<(), DecoderPidError> {
    fs::write(path, format!("{pid},{timestamp}\n")).map_err(|e| DecoderPidError::Io(path.to_path_buf(), e))
}

pub fn load_decoder_pid(path: &Path) -> Result<Option<DecoderPid>, DecoderPidError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| DecoderPidError::Io(path.to_path_buf(), e))?;
    let line = content.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut parts = line.split(',');
    let pid: u32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DecoderPidError::Malformed(line.to_string()))?;
    let timestamp: i64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DecoderPidError::Malformed(line.to_string()))?;
    Ok(Some(DecoderPid { pid, timestamp }))
}

/// `true` if a process with this PID currently exists (`kill(pid, 0)`).
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = decoder_pid_path(dir.path());
        save_decoder_pid(&path, 4242, 1_700_000_000).unwrap();
        let loaded = load_decoder_pid(&path).unwrap().unwrap();
        assert_eq!(loaded.pid, 4242);
        assert_eq!(loaded.timestamp, 1_700_000_000);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = decoder_pid_path(dir.path());
        assert!(load_decoder_pid(&path).unwrap().is_none());
    }

    #[test]
    fn own_pid_is_alive() {
        assert!(process_alive(std::process::id()));
    }
}

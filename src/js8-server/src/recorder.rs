// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Spawns and supervises `pcmrecord` subprocesses, one per (freq,
//! submode), and persists their PIDs in a CSV sidecar so `stop`/`status`
//! can find them again from a fresh process invocation.
//!
//! Grounded on the reference tool's `startRecorder`/`loadRecordPids`/
//! `saveRecordPids`/`stopRecorder` (PID CSV shape, SIGTERM semantics),
//! and on the subprocess-wrapper idiom of wrapping `Command` with an
//! explicit argv and redirected stdio.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use js8_core::{ssrc_for_freq_khz, Submode};
use thiserror::Error;

use crate::mode_config::ModeConfig;

pub const PCMRECORD_BIN_DEFAULT: &str = "/usr/local/bin/pcmrecord";

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("unknown frequency {0} kHz has no configured SSRC")]
    UnknownFreq(u32),
    #[error("failed to open log file {0}: {1}")]
    LogOpen(PathBuf, std::io::Error),
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("I/O error on PID file {0}: {1}")]
    PidFile(PathBuf, std::io::Error),
    #[error("malformed PID file record: {0}")]
    MalformedRecord(String),
}

/// One row of the `pcmrecord.pids` sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderPid {
    pub freq_khz: u32,
    pub freq_hz: u64,
    pub submode: Submode,
    pub duration_secs: u32,
    pub mcast_addr: String,
    pub pid: Option<u32>,
    pub timestamp: i64,
    pub ret_code: Option<i32>,
}

impl RecorderPid {
    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}\n",
            self.freq_khz,
            self.freq_hz,
            self.submode.name(),
            self.duration_secs,
            self.mcast_addr,
            opt_to_str(self.pid),
            self.timestamp,
            opt_to_str(self.ret_code),
        )
    }

    fn from_csv_line(line: &str) -> Result<Self, RecorderError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 8 {
            return Err(RecorderError::MalformedRecord(line.to_string()));
        }
        let bad = || RecorderError::MalformedRecord(line.to_string());
        Ok(RecorderPid {
            freq_khz: fields[0].parse().map_err(|_| bad())?,
            freq_hz: fields[1].parse().map_err(|_| bad())?,
            submode: Submode::parse(fields[2]).ok_or_else(bad)?,
            duration_secs: fields[3].parse().map_err(|_| bad())?,
            mcast_addr: fields[4].to_string(),
            pid: opt_from_str(fields[5]),
            timestamp: fields[6].parse().map_err(|_| bad())?,
            ret_code: opt_from_str(fields[7]),
        })
    }
}

fn opt_to_str<T: std::fmt::Display>(v: Option<T>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

fn opt_from_str<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s == "None" {
        None
    } else {
        s.parse().ok()
    }
}

/// Spawn one detached `pcmrecord` subprocess for `mc`, returning the PID
/// row to persist. Non-blocking: the call returns as soon as the child
/// is spawned.
pub fn start_recorder(mc: &ModeConfig, pcmrecord_bin: &str) -> Result<RecorderPid, RecorderError> {
    let ssrc = ssrc_for_freq_khz(mc.freq_khz).ok_or(RecorderError::UnknownFreq(mc.freq_khz))?;

    let log_path = mc.pcmrecord_log_path();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| RecorderError::LogOpen(log_path.clone(), e))?;
    let log_stderr = log_file
        .try_clone()
        .map_err(|e| RecorderError::LogOpen(log_path.clone(), e))?;

    let duration = mc.submode.duration_secs();
    let child = Command::new(pcmrecord_bin)
        .arg("-L")
        .arg(duration.to_string())
        .arg("-d")
        .arg(&mc.rec_dir)
        .arg("-W")
        .arg("-S")
        .arg(ssrc.to_string())
        .arg("--jt")
        .arg(&mc.mcast_addr)
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_stderr))
        .spawn()
        .map_err(|e| RecorderError::Spawn(pcmrecord_bin.to_string(), e))?;

    Ok(RecorderPid {
        freq_khz: mc.freq_khz,
        freq_hz: mc.freq_hz,
        submode: mc.submode,
        duration_secs: duration,
        mcast_addr: mc.mcast_addr.clone(),
        pid: Some(child.id()),
        timestamp: chrono::Utc::now().timestamp(),
        ret_code: None,
    })
}

/// Send SIGTERM to the recorder's PID.
pub fn stop_recorder(rec: &RecorderPid) {
    let Some(pid) = rec.pid else { return };
    unsafe {
        if libc::kill(pid as libc::pid_t, libc::SIGTERM) != 0 {
            tracing::warn!(
                "failed to signal pcmrecord pid {} for freq {} submode {}: {}",
                pid,
                rec.freq_khz,
                rec.submode,
                std::io::Error::last_os_error()
            );
        }
    }
}

pub fn load_record_pids(path: &Path) -> Result<Vec<RecorderPid>, RecorderError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(|e| RecorderError::PidFile(path.to_path_buf(), e))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| RecorderError::PidFile(path.to_path_buf(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(RecorderPid::from_csv_line(&line)?);
    }
    Ok(out)
}

pub fn save_record_pids(path: &Path, recs: &[RecorderPid]) -> Result<(), RecorderError> {
    let mut file = File::create(path).map_err(|e| RecorderError::PidFile(path.to_path_buf(), e))?;
    for rec in recs {
        file.write_all(rec.to_csv_line().as_bytes())
            .map_err(|e| RecorderError::PidFile(path.to_path_buf(), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trips() {
        let rec = RecorderPid {
            freq_khz: 7078,
            freq_hz: 7_078_000,
            submode: Submode::Fast,
            duration_secs: 10,
            mcast_addr: "js8-pcm.local".to_string(),
            pid: Some(1234),
            timestamp: 1_700_000_000,
            ret_code: None,
        };
        let line = rec.to_csv_line();
        assert_eq!(line.trim(), "7078,7078000,fast,10,js8-pcm.local,1234,1700000000,None");
        let parsed = RecorderPid::from_csv_line(&line).unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcmrecord.pids");
        let recs = vec![RecorderPid {
            freq_khz: 14078,
            freq_hz: 14_078_000,
            submode: Submode::Slow,
            duration_secs: 30,
            mcast_addr: "js8-pcm.local".to_string(),
            pid: Some(42),
            timestamp: 1,
            ret_code: Some(0),
        }];
        save_record_pids(&path, &recs).unwrap();
        let loaded = load_record_pids(&path).unwrap();
        assert_eq!(loaded, recs);
    }

    #[test]
    fn missing_pid_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pids");
        assert_eq!(load_record_pids(&path).unwrap(), Vec::new());
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Drives [`FrameParser`] over one decode file, inferring (record_time,
//! freq, radio_mode) from the recording's filename and cross-checking
//! them against any values already set on the parser.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use thiserror::Error;

use crate::model::FrameRecord;
use crate::parser::{FrameParser, ParseError};

#[derive(Debug, Error)]
pub enum DecodeFileError {
    #[error("filename does not match the expected recording pattern: {0}")]
    BadFilename(String),
    #[error("filename-derived freq_khz {from_name} does not match parser state {from_parser}")]
    FreqMismatch { from_name: u32, from_parser: u32 },
    #[error("filename-derived radio mode {from_name} does not match parser state {from_parser}")]
    ModeMismatch { from_name: String, from_parser: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("I/O error reading decode file: {0}")]
    Io(#[from] std::io::Error),
}

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{8}T\d{6}Z)_(\d{7,})_(usb|lsb)").expect("valid recording filename regex")
    })
}

struct FilenameInfo {
    record_time: chrono::DateTime<Utc>,
    freq_khz: u32,
    radio_mode: String,
}

fn parse_filename(fname: &str) -> Result<FilenameInfo, DecodeFileError> {
    let caps = filename_re()
        .captures(fname)
        .ok_or_else(|| DecodeFileError::BadFilename(fname.to_string()))?;
    let ts_str = &caps[1];
    let freq_hz: u32 = caps[2].parse().map_err(|_| DecodeFileError::BadFilename(fname.to_string()))?;
    let radio_mode = caps[3].to_string();

    let naive = NaiveDateTime::parse_from_str(ts_str, "%Y%m%dT%H%M%SZ")
        .map_err(|_| DecodeFileError::BadFilename(fname.to_string()))?;
    let record_time = Utc.from_utc_datetime(&naive);

    Ok(FilenameInfo {
        record_time,
        freq_khz: freq_hz / 1000,
        radio_mode,
    })
}

/// Parse every line of `path` into [`FrameRecord`]s, attaching
/// `decode_file` to each. `parser` is reset to the filename-derived
/// (freq_khz, radio_mode, record_time) before use, failing if it was
/// already set to something that conflicts with the filename.
pub fn process_decode_file(
    parser: &mut FrameParser,
    path: &Path,
) -> Result<Vec<FrameRecord>, DecodeFileError> {
    let fname = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DecodeFileError::BadFilename(path.display().to_string()))?;
    let info = parse_filename(fname)?;

    if let Some(existing) = parser.freq_khz() {
        if existing != info.freq_khz {
            return Err(DecodeFileError::FreqMismatch {
                from_name: info.freq_khz,
                from_parser: existing,
            });
        }
    } else {
        parser.set_freq_khz(info.freq_khz);
    }

    if let Some(existing) = parser.radio_mode() {
        if existing != info.radio_mode {
            return Err(DecodeFileError::ModeMismatch {
                from_name: info.radio_mode,
                from_parser: existing.to_string(),
            });
        }
    } else {
        parser.set_radio_mode(&info.radio_mode)?;
    }

    parser.set_record_time(info.record_time);

    let content = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in content.lines() {
        match parser.parse(line) {
            Ok(Some(mut record)) => {
                record.decode_file = Some(path.to_path_buf());
                out.push(record);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("error while parsing js8 message: [{}]. {}", line, e);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recording_filename() {
        let info = parse_filename("20251026T192630Z_10130000_usb.wav.decode").unwrap();
        assert_eq!(info.freq_khz, 10130);
        assert_eq!(info.radio_mode, "usb");
        assert_eq!(info.record_time.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-10-26 19:26:30");
    }

    #[test]
    fn rejects_unrecognized_filename() {
        assert!(parse_filename("not_a_recording.txt").is_err());
    }

    #[test]
    fn processes_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20251026T192630Z_10130000_usb.wav.decode");
        std::fs::write(&path, "-10 0.2 1500 ~ HB:3 VK4TMZ QG62\n<DecodeFinished>\n").unwrap();

        let mut parser = FrameParser::new();
        let records = process_decode_file(&mut parser, &path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].callsign.as_deref(), Some("VK4TMZ"));
        assert_eq!(records[0].decode_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn rejects_filename_that_conflicts_with_parser_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20251026T192630Z_10130000_usb.wav.decode");
        std::fs::write(&path, "<DecodeFinished>\n").unwrap();

        let mut parser = FrameParser::new();
        parser.set_freq_khz(14078);
        let err = process_decode_file(&mut parser, &path).unwrap_err();
        assert!(matches!(err, DecodeFileError::FreqMismatch { from_name: 10130, from_parser: 14078 }));
    }
}

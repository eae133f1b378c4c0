// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Parses one line of JS8 demodulator output into a [`FrameRecord`],
//! including callsign/grid validation.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::bands::IGNORE_VALIDATION_FREQS_KHZ;
use crate::frame::Js8Frame;
use crate::model::FrameRecord;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("freq_khz not set on parser")]
    MissingFreq,
    #[error("record_time not set on parser")]
    MissingRecordTime,
    #[error("invalid radio mode: {0}")]
    InvalidRadioMode(String),
}

fn callsign_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(([0-9]|[A-Z]){1,3}/)?([0-9][A-Z][0-9][A-Z]{1,3}|[A-Z]{2}[0-9][A-Z]{1,3}|[A-Z][0-9]{1,2}[A-Z]{1,3})(/([0-9]|[A-Z]){1,2})?$",
        )
        .expect("valid callsign regex")
    })
}

fn group_callsign_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^@[A-Z0-9/]{0,3}/?[A-Z0-9/]{0,3}/?[A-Z0-9/]{0,3}").expect("valid group callsign regex")
    })
}

fn grid4_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\w{2}\d{2}").expect("valid grid regex"))
}

fn decoder_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" ?<Decode(Started|Debug|Finished)>").expect("valid decoder noise regex"))
}

pub fn is_valid_callsign(s: &str) -> bool {
    callsign_re().is_match(s)
}

pub fn is_valid_group_callsign(s: &str) -> bool {
    group_callsign_re().is_match(s)
}

pub fn is_valid_grid4(s: &str) -> bool {
    grid4_re().is_match(s)
}

/// Stateful parser: `freq_khz`/`radio_mode`/`record_time` are set once per
/// decode file, then every line is run through `parse`.
pub struct FrameParser {
    freq_khz: Option<u32>,
    radio_mode: Option<String>,
    record_time: Option<DateTime<Utc>>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        FrameParser {
            freq_khz: None,
            radio_mode: None,
            record_time: None,
        }
    }

    pub fn set_freq_khz(&mut self, freq_khz: u32) {
        self.freq_khz = Some(freq_khz);
    }

    pub fn set_radio_mode(&mut self, mode: &str) -> Result<(), ParseError> {
        let lower = mode.to_ascii_lowercase();
        if lower != "usb" && lower != "lsb" {
            return Err(ParseError::InvalidRadioMode(mode.to_string()));
        }
        self.radio_mode = Some(lower);
        Ok(())
    }

    pub fn set_record_time(&mut self, ts: DateTime<Utc>) {
        self.record_time = Some(ts);
    }

    pub fn freq_khz(&self) -> Option<u32> {
        self.freq_khz
    }

    pub fn radio_mode(&self) -> Option<&str> {
        self.radio_mode.as_deref()
    }

    /// Parse one raw line. Returns `Ok(None)` for decoder chatter/EOF
    /// markers or lines the in-crate JS8 frame-text module rejects.
    pub fn parse(&self, raw_line: &str) -> Result<Option<FrameRecord>, ParseError> {
        let trimmed = raw_line.trim_end();
        if decoder_noise_re().is_match(trimmed) || trimmed.starts_with(" EOF on input file") {
            return Ok(None);
        }

        let freq_khz = self.freq_khz.ok_or(ParseError::MissingFreq)?;
        let record_time = self.record_time.ok_or(ParseError::MissingRecordTime)?;

        let Some(frame) = crate::jsframe::decode_line(trimmed) else {
            tracing::debug!("unparseable js8 frame line: {}", trimmed);
            return Ok(None);
        };

        let dial_freq = freq_khz as i64 * 1000;
        let offset = frame.offset_hz();
        let freq = dial_freq + offset;

        let callsign = frame.callsign().map(str::to_string);
        let callsign_to = frame.callsign_to().map(str::to_string);
        let grid = frame.grid().map(str::to_string);
        let msg = frame.msg().map(str::to_string);

        let mut spot = matches!(frame, Js8Frame::Heartbeat(_) | Js8Frame::Compound(_)) && grid.is_some();

        let mut validation_msg: Option<String> = None;
        if !IGNORE_VALIDATION_FREQS_KHZ.contains(&freq_khz) {
            validation_msg = validate(&frame, callsign.as_deref(), callsign_to.as_deref(), grid.as_deref());
        }
        if validation_msg.is_some() {
            spot = false;
        }

        Ok(Some(FrameRecord {
            timestamp: record_time.timestamp(),
            record_time: record_time.format("%Y/%m/%d %H:%M:%S").to_string(),
            mode: "JS8".to_string(),
            js8mode: frame.class_name().to_string(),
            thread_type: frame.thread_type(),
            dial_freq,
            offset,
            freq,
            callsign,
            callsign_to,
            locator: grid,
            cmd: None,
            msg,
            raw_msg: raw_line.to_string(),
            db: frame.db(),
            dt: frame.dt(),
            snr: frame.db(),
            frame_class: frame.class_name().to_string(),
            spot,
            is_valid: validation_msg.is_none(),
            validation_msg,
            decode_file: None,
        }))
    }
}

fn validate(
    frame: &Js8Frame,
    callsign: Option<&str>,
    callsign_to: Option<&str>,
    grid: Option<&str>,
) -> Option<String> {
    match frame {
        Js8Frame::Heartbeat(_) => {
            let has_valid_callsign = callsign.map(is_valid_callsign).unwrap_or(false);
            let has_valid_grid = grid.map(is_valid_grid4).unwrap_or(false);
            if has_valid_callsign && has_valid_grid {
                None
            } else {
                Some(format!(
                    "Invalid values - hasValidCallsign: [{}], hasValidGrid: [{}]",
                    has_valid_callsign, has_valid_grid
                ))
            }
        }
        Js8Frame::Directed(_) => {
            let has_valid_callsign = callsign.map(is_valid_callsign).unwrap_or(false);
            let has_valid_to = callsign_to
                .map(|c| is_valid_callsign(c) || is_valid_group_callsign(c))
                .unwrap_or(false);
            if has_valid_callsign && has_valid_to {
                None
            } else {
                Some(format!(
                    "Invalid values - hasValidCallsign: [{}], hasValidCallsignTo: [{}]",
                    has_valid_callsign, has_valid_to
                ))
            }
        }
        Js8Frame::Compound(_) | Js8Frame::CompoundDirected(_) => {
            let has_valid_callsign = callsign
                .map(|c| is_valid_callsign(c) || is_valid_group_callsign(c))
                .unwrap_or(false);
            if has_valid_callsign {
                None
            } else {
                Some(format!("Invalid values - hasValidCallsign: [{}]", has_valid_callsign))
            }
        }
        // Nothing to do here: the demodulator does not produce an
        // invalid Data/DataCompressed frame in practice.
        Js8Frame::Data(_) | Js8Frame::DataCompressed(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_decoder_chatter() {
        let p = FrameParser::new();
        assert!(p.parse("<DecodeStarted>").unwrap().is_none());
        assert!(p.parse(" EOF on input file foo.wav").unwrap().is_none());
    }

    #[test]
    fn requires_freq_and_record_time() {
        let p = FrameParser::new();
        let err = p.parse("anything").unwrap_err();
        assert!(matches!(err, ParseError::MissingFreq));
    }

    #[test]
    fn validates_callsign_grammar() {
        assert!(is_valid_callsign("VK4TMZ"));
        assert!(is_valid_callsign("VK4TMZ/P"));
        assert!(!is_valid_callsign("12345"));
        assert!(is_valid_grid4("QG62"));
        assert!(is_valid_grid4("qg62ms"));
        assert!(!is_valid_grid4("Q62"));
    }

    /// S5: an invalid callsign on an otherwise spot-shaped frame must
    /// clear `spot` along with `is_valid`.
    #[test]
    fn invalid_callsign_clears_spot() {
        let mut p = FrameParser::new();
        p.set_freq_khz(10130);
        p.set_record_time(chrono::DateTime::parse_from_rfc3339("2025-10-26T19:26:30Z").unwrap().into());

        let record = p.parse("-10 0.2 1500 ~ HB:3 12345 QG62").unwrap().unwrap();
        assert!(!record.is_valid);
        assert!(!record.spot);
        assert!(record.validation_msg.is_some());
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Formats and delivers APRS-IS position/message frames.
//!
//! Each send opens its own short-lived TCP session to the APRS-IS
//! server (login, one frame, close) rather than keeping a persistent
//! connection — this reporter fires rarely enough (one `@APRSIS`
//! directive per completed transmission) that a per-send session is
//! simpler than a keep-alive uplink.

use std::fs::OpenOptions;
use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

const DEFAULT_APRS_HOST: &str = "asia.aprs2.net";
const DEFAULT_APRS_PORT: u16 = 14580;
const APRS_DESTINATION: &str = "APJ8CL";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AprsError {
    #[error("empty callsign")]
    EmptyCallsign,
    #[error("malformed APRS frame: {0}")]
    MalformedFrame(String),
    #[error("APRS-IS connect to {0}:{1} failed: {2}")]
    Connect(String, u16, std::io::Error),
    #[error("APRS-IS send failed: {0}")]
    Send(std::io::Error),
    #[error("failed to append to frames log {0}: {1}")]
    Log(PathBuf, std::io::Error),
}

/// Compute the APRS-IS passcode for a callsign.
///
/// Strip SSID, uppercase the first 10 characters, XOR-fold 2-byte pairs
/// starting from `0x73E2`, mask with `0x7FFF`.
pub fn compute_passcode(callsign: &str) -> u16 {
    let base = callsign.split('-').next().unwrap_or(callsign);
    let upper: String = base.chars().take(10).map(|c| c.to_ascii_uppercase()).collect();
    let bytes = upper.as_bytes();

    let mut hash: u16 = 0x73e2;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= (bytes[i] as u16) << 8;
        if i + 1 < bytes.len() {
            hash ^= bytes[i + 1] as u16;
        }
        i += 2;
    }
    hash & 0x7fff
}

/// Convert a Maidenhead grid locator to APRS `DDMM.mmH` / `DDDMM.mmH`
/// lat/lon strings, anchored at the grid square's top-left corner (not
/// its center).
pub fn grid_to_aprs(grid: &str) -> Result<(String, String), AprsError> {
    let (lat, lon) = grid_top_left(grid)?;

    let (lat_dir, lat) = if lat < 0.0 { ("S", -lat) } else { ("N", lat) };
    let (lon_dir, lon) = if lon < 0.0 { ("W", -lon) } else { ("E", lon) };

    let (lat_deg, lat_frac) = (lat.trunc(), lat.fract());
    let (lon_deg, lon_frac) = (lon.trunc(), lon.fract());

    let mut lat_deg = lat_deg as i64;
    let mut lon_deg = lon_deg as i64;
    let lat_min_f = lat_frac * 60.0;
    let lon_min_f = lon_frac * 60.0;
    let mut lat_min = lat_min_f.trunc() as i64;
    let mut lon_min = lon_min_f.trunc() as i64;
    let mut lat_sec = (lat_min_f.fract() * 60.0).round() as i64;
    let mut lon_sec = (lon_min_f.fract() * 60.0).round() as i64;

    if lat_sec == 60 {
        lat_min += 1;
        lat_sec = 0;
    }
    if lon_sec == 60 {
        lon_min += 1;
        lon_sec = 0;
    }
    if lat_min == 60 {
        lat_deg += 1;
        lat_min = 0;
    }
    if lon_min == 60 {
        lon_deg += 1;
        lon_min = 0;
    }

    let aprs_lat = lat_deg as f64 * 100.0 + lat_min as f64 + (lat_sec as f64 / 60.0);
    let aprs_lon = lon_deg as f64 * 100.0 + lon_min as f64 + (lon_sec as f64 / 60.0);

    Ok((
        format!("{aprs_lat:07.2}{lat_dir}"),
        format!("{aprs_lon:08.2}{lon_dir}"),
    ))
}

/// Top-left (lat, lon) in decimal degrees of a 2-6 character Maidenhead
/// grid square.
fn grid_top_left(grid: &str) -> Result<(f64, f64), AprsError> {
    let chars: Vec<char> = grid.chars().collect();
    if chars.len() < 4 {
        return Err(AprsError::MalformedFrame(format!("grid too short: {grid}")));
    }

    let field_lon = chars[0].to_ascii_uppercase() as i64 - 'A' as i64;
    let field_lat = chars[1].to_ascii_uppercase() as i64 - 'A' as i64;
    let square_lon = chars[2].to_digit(10).ok_or_else(|| AprsError::MalformedFrame(grid.to_string()))? as i64;
    let square_lat = chars[3].to_digit(10).ok_or_else(|| AprsError::MalformedFrame(grid.to_string()))? as i64;

    let mut lon = field_lon as f64 * 20.0 + square_lon as f64 * 2.0 - 180.0;
    let mut lat = field_lat as f64 * 10.0 + square_lat as f64 - 90.0;

    if chars.len() >= 6 {
        let subsq_lon = chars[4].to_ascii_lowercase() as i64 - 'a' as i64;
        let subsq_lat = chars[5].to_ascii_lowercase() as i64 - 'a' as i64;
        lon += subsq_lon as f64 * (2.0 / 24.0);
        lat += subsq_lat as f64 * (1.0 / 24.0);
    }

    Ok((lat, lon))
}

/// Strip an optional prefix/suffix (`PREFIX/CALL/SUFFIX`) down to the
/// bare callsign, as APRS-IS `FROM` fields must not carry them.
///
/// Mirrors `CALLSIGN_SUFFIX_REX`: a leading `/`-terminated group of at
/// most 3 alphanumerics is a prefix (e.g. `M/VK4TAA`); otherwise the
/// first `/`-delimited group is the callsign itself and anything after
/// the slash is a suffix (e.g. `VK4TAA/MM`).
fn strip_callsign_suffix(callsign: &str) -> &str {
    let parts: Vec<&str> = callsign.split('/').collect();
    match parts.as_slice() {
        [base] => base,
        [prefix, base, ..] if prefix.len() <= 3 => base,
        [base, ..] => base,
    }
}

fn format_message_frame(callsign: &str, reporter: &str, msg: &str) -> String {
    let callsign = strip_callsign_suffix(callsign).to_ascii_uppercase();
    format!("{callsign}>{APRS_DESTINATION},qAS,{reporter}:{msg}")
}

/// Format an APRS position report frame for `callsign` at `grid`,
/// carrying the given free-text `comment`.
pub fn format_position_frame(callsign: &str, reporter: &str, grid: &str, comment: &str) -> Result<String, AprsError> {
    let (lat, lon) = grid_to_aprs(grid)?;
    let msg = format!("={lat}/{lon}G#{comment}");
    Ok(format_message_frame(callsign, reporter, &msg))
}

/// Format a generic APRS message/status frame carrying raw `text`.
pub fn format_generic_frame(callsign: &str, reporter: &str, text: &str) -> String {
    format_message_frame(callsign, reporter, text)
}

/// Lightweight sanity check mirroring the reference tool's reliance on
/// an APRS-IS parsing library: a frame must have a non-empty source
/// callsign, a destination, and an info field.
fn validate_frame(frame: &str) -> Result<(), AprsError> {
    let Some((header, info)) = frame.split_once(':') else {
        return Err(AprsError::MalformedFrame(frame.to_string()));
    };
    if info.is_empty() {
        return Err(AprsError::MalformedFrame(frame.to_string()));
    }
    let Some((src, _dest_path)) = header.split_once('>') else {
        return Err(AprsError::MalformedFrame(frame.to_string()));
    };
    if src.is_empty() {
        return Err(AprsError::MalformedFrame(frame.to_string()));
    }
    Ok(())
}

/// Configuration for one-shot APRS-IS delivery.
#[derive(Debug, Clone)]
pub struct AprsConfig {
    pub reporter: String,
    pub user: String,
    pub passcode: u16,
    pub host: String,
    pub port: u16,
    pub frames_log: PathBuf,
}

impl Default for AprsConfig {
    fn default() -> Self {
        AprsConfig {
            reporter: String::new(),
            user: String::new(),
            passcode: 0,
            host: DEFAULT_APRS_HOST.to_string(),
            port: DEFAULT_APRS_PORT,
            frames_log: PathBuf::from("aprsis_frames.log"),
        }
    }
}

pub struct AprsReporter {
    cfg: AprsConfig,
}

impl AprsReporter {
    pub fn new(cfg: AprsConfig) -> Self {
        AprsReporter { cfg }
    }

    /// Report a position fix: `callsign` observed at `grid`, formatted
    /// with a `JS8 <callsign> <freq_mhz:.6f>MHz <snr:+03d>dB` comment.
    pub fn report_position(&self, callsign: &str, grid: &str, freq_mhz: f64, snr: i32) -> Result<(), AprsError> {
        if callsign.is_empty() || grid.is_empty() {
            return Err(AprsError::EmptyCallsign);
        }
        let comment = format!("JS8 {callsign} {freq_mhz:.6}MHz {snr:+03}dB");
        let frame = format_position_frame(callsign, &self.cfg.reporter, grid, &comment)?;
        self.send(&frame)
    }

    /// Report a generic message/command frame for `callsign`.
    pub fn report_message(&self, callsign: &str, text: &str) -> Result<(), AprsError> {
        if callsign.is_empty() {
            return Err(AprsError::EmptyCallsign);
        }
        let frame = format_generic_frame(callsign, &self.cfg.reporter, text);
        self.send(&frame)
    }

    fn send(&self, frame: &str) -> Result<(), AprsError> {
        validate_frame(frame)?;

        let now = Utc::now().format("%Y/%m/%d-%H:%M:%S");
        let line = format!("{now}: {frame}\n");
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.cfg.frames_log)
            .map_err(|e| AprsError::Log(self.cfg.frames_log.clone(), e))?;
        log.write_all(line.as_bytes())
            .map_err(|e| AprsError::Log(self.cfg.frames_log.clone(), e))?;

        let mut stream = TcpStream::connect((self.cfg.host.as_str(), self.cfg.port))
            .map_err(|e| AprsError::Connect(self.cfg.host.clone(), self.cfg.port, e))?;
        stream.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();

        let login = format!("user {} pass {} vers js8-rs {}\r\n", self.cfg.user, self.cfg.passcode, env!("CARGO_PKG_VERSION"));
        stream.write_all(login.as_bytes()).map_err(AprsError::Send)?;
        stream.write_all(frame.as_bytes()).map_err(AprsError::Send)?;
        stream.write_all(b"\r\n").map_err(AprsError::Send)?;

        tracing::info!("APRS frame sent to {}:{}: {}", self.cfg.host, self.cfg.port, frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passcode_strips_ssid_and_case() {
        assert_eq!(compute_passcode("VK4TMZ"), compute_passcode("vk4tmz-9"));
    }

    #[test]
    fn passcode_in_valid_range() {
        assert!(compute_passcode("VK4TMZ") <= 0x7fff);
        assert_eq!(compute_passcode("VK4TMZ"), 23719);
    }

    #[test]
    fn grid_round_trips_within_one_arcsecond() {
        let (lat_s, lon_s) = grid_to_aprs("QG62ms").unwrap();
        assert!(lat_s.ends_with('S'));
        assert!(lon_s.ends_with('E'));
    }

    #[test]
    fn position_frame_matches_expected_shape() {
        let frame = format_position_frame("VK4TAA", "VK4TMZ", "QG62ms", "JS8 VK4TAA 7.078801MHz -12dB").unwrap();
        assert!(frame.starts_with("VK4TAA>APJ8CL,qAS,VK4TMZ:=") );
        assert!(frame.contains("JS8 VK4TAA 7.078801MHz -12dB"));
    }

    #[test]
    fn strips_prefix_and_suffix() {
        assert_eq!(strip_callsign_suffix("VK4TAA/MM"), "VK4TAA");
        assert_eq!(strip_callsign_suffix("M/VK4TAA"), "VK4TAA");
        assert_eq!(strip_callsign_suffix("VK4TAA"), "VK4TAA");
    }

    #[test]
    fn rejects_malformed_frame() {
        assert!(validate_frame("not a frame").is_err());
        assert!(validate_frame("CALL>DEST:").is_err());
        assert!(validate_frame("CALL>DEST:hello").is_ok());
    }

    #[test]
    fn report_without_grid_is_an_error() {
        let reporter = AprsReporter::new(AprsConfig::default());
        assert!(matches!(reporter.report_position("", "QG62", 7.078, -12), Err(AprsError::EmptyCallsign)));
        assert!(matches!(reporter.report_position("VK4TAA", "", 7.078, -12), Err(AprsError::EmptyCallsign)));
    }
}

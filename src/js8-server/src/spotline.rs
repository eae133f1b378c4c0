// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Formats [`FrameRecord`]s eligible for the shared spot log.

use js8_core::FrameRecord;

/// Render one spot line, or `None` if `record` is not a spot.
///
/// `"{record_time} {db:>5} {dt:>4} {js8mode} {freq_mhz:>9} {callsign:>9}
/// {locator:>4} ~ {msg}"`, with frequency printed in MHz.
pub fn format_spot_line(record: &FrameRecord) -> Option<String> {
    if !(record.spot && record.is_valid) {
        return None;
    }

    let freq_mhz = record.freq as f64 / 1_000_000.0;
    let callsign = record.callsign.as_deref().unwrap_or("");
    let locator = record.locator.as_deref().unwrap_or("");
    let msg = record.msg.as_deref().unwrap_or("");

    Some(format!(
        "{} {:>5.0} {:>4.1} {} {:>9.6} {:>9} {:>4} ~ {}\n",
        record.record_time, record.db, record.dt, record.js8mode, freq_mhz, callsign, locator, msg,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(spot: bool, is_valid: bool) -> FrameRecord {
        FrameRecord {
            timestamp: 0,
            record_time: "2025/10/26 19:26:30".to_string(),
            mode: "JS8".to_string(),
            js8mode: "Js8FrameHeartbeat".to_string(),
            thread_type: 3,
            dial_freq: 10_130_000,
            offset: 1500,
            freq: 10_131_500,
            callsign: Some("VK4TMZ".to_string()),
            callsign_to: None,
            locator: Some("QG62".to_string()),
            cmd: None,
            msg: Some("HELLO".to_string()),
            raw_msg: String::new(),
            db: -10.0,
            dt: 0.2,
            snr: -10.0,
            frame_class: "Heartbeat".to_string(),
            spot,
            is_valid,
            validation_msg: None,
            decode_file: None,
        }
    }

    #[test]
    fn formats_known_spot() {
        let line = format_spot_line(&record(true, true)).unwrap();
        assert!(line.starts_with("2025/10/26 19:26:30 "));
        assert!(line.contains("10.131500"));
        assert!(line.contains("VK4TMZ"));
        assert!(line.ends_with("~ HELLO\n"));
    }

    #[test]
    fn skips_non_spot_or_invalid_records() {
        assert!(format_spot_line(&record(false, true)).is_none());
        assert!(format_spot_line(&record(true, false)).is_none());
    }
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Persisted/exchanged record shapes: one parsed line (`FrameRecord`),
//! one reassembled transmission (`ActivityRecord`), one per-callsign
//! history (`CallsignRecord`).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of decoder output, parsed and (possibly) validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: i64,
    pub record_time: String,
    pub mode: String,
    pub js8mode: String,
    pub thread_type: u8,
    pub dial_freq: i64,
    pub offset: i64,
    pub freq: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub raw_msg: String,
    pub db: f32,
    pub dt: f32,
    pub snr: f32,
    pub frame_class: String,
    pub spot: bool,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_file: Option<PathBuf>,
}

impl FrameRecord {
    /// `freq == dial_freq + offset` must hold for every emitted record.
    pub fn invariant_freq_holds(&self) -> bool {
        self.freq == self.dial_freq + self.offset
    }
}

/// One reassembled over-the-air transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub first_ts: i64,
    pub last_ts: i64,
    pub offset: i64,
    pub offset_total: i64,
    pub msgs: Vec<FrameRecord>,
    pub seen_first: bool,
    pub seen_last: bool,
    pub is_complete: bool,
    pub is_expired: bool,

    pub timestamp: Option<i64>,
    pub callsign: Option<String>,
    pub locator: Option<String>,
    pub dial_freq: Option<i64>,
    pub freq: Option<i64>,
    pub full_msg: Option<String>,
    pub snr: Option<f32>,
}

impl ActivityRecord {
    pub fn new(first: &FrameRecord) -> Self {
        ActivityRecord {
            id: Uuid::new_v4(),
            first_ts: first.timestamp,
            last_ts: first.timestamp,
            offset: first.offset,
            offset_total: first.offset,
            msgs: vec![first.clone()],
            seen_first: false,
            seen_last: false,
            is_complete: false,
            is_expired: false,
            timestamp: None,
            callsign: None,
            locator: None,
            dial_freq: None,
            freq: None,
            full_msg: None,
            snr: None,
        }
    }

    /// Absorbing-state check: `is_complete` and `is_expired` are
    /// mutually exclusive and, once set, never unset.
    pub fn is_settled(&self) -> bool {
        self.is_complete || self.is_expired
    }
}

/// Per-callsign rollup of completed activities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallsignRecord {
    pub first_ts: i64,
    pub last_ts: i64,
    pub last_freq: i64,
    pub activity: Vec<Uuid>,
    /// Activity ids indexed by `"YYYY-MM-DD|HH|dial_freq"`, for quick
    /// "what did this callsign do in this hour on this band" lookups.
    /// JSON object keys must be strings, so the `(date, hour, dial_freq)`
    /// triple is joined into one string rather than kept as a tuple key.
    #[serde(default)]
    pub activity_by_hour: HashMap<String, Vec<Uuid>>,
}

impl CallsignRecord {
    /// Record `activity_id` under the `(date, hour, dial_freq)` bucket
    /// derived from `record_time` (`"YYYY/MM/DD HH:MM:SS"`).
    pub fn index_activity(&mut self, record_time: &str, dial_freq: i64, activity_id: Uuid) {
        let Some(key) = hour_bucket_key(record_time, dial_freq) else { return };
        self.activity_by_hour.entry(key).or_default().push(activity_id);
    }
}

/// Build the `"YYYY-MM-DD|HH|dial_freq"` index key from a
/// `"YYYY/MM/DD HH:MM:SS"` record time.
fn hour_bucket_key(record_time: &str, dial_freq: i64) -> Option<String> {
    let (date_part, time_part) = record_time.split_once(' ')?;
    let hour = time_part.split(':').next()?;
    let date = date_part.replace('/', "-");
    Some(format!("{date}|{hour}|{dial_freq}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_activity_by_date_hour_and_freq() {
        let mut rec = CallsignRecord::default();
        let id = Uuid::new_v4();
        rec.index_activity("2025/10/26 19:26:30", 7078000, id);
        assert_eq!(rec.activity_by_hour.get("2025-10-26|19|7078000"), Some(&vec![id]));
    }
}

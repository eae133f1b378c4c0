// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Aggregates a stream of [`FrameRecord`]s into complete transmissions.
//!
//! Activities live in a single arena (`Vec<ActivityRecord>`); the
//! per-frequency and per-callsign indices refer to them by position so
//! no reference counting is needed across the two indices.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{ActivityRecord, CallsignRecord, FrameRecord};

/// Default match window on audio offset, in Hz.
pub const DEFAULT_BANDWIDTH_HZ: i64 = 3;
/// Match window on elapsed time against an activity's first/last seen
/// timestamp, in seconds.
const TIME_WINDOW_SECS: i64 = 60;

/// One dispatch the reassembler asks the caller to perform after an
/// activity carrying an `@APRSIS` directive completes.
#[derive(Debug, Clone, PartialEq)]
pub enum AprsDispatch {
    Position {
        callsign: String,
        grid: String,
        freq_hz: i64,
        snr: f32,
    },
    Message {
        callsign: String,
        text: String,
    },
}

// The `[GRID]`/`[CMD]` brackets in §4.5 are meta-notation for the
// keyword, not literal characters the demodulator emits (confirmed by
// S4's concrete `@APRSIS GRID QG62ms`); the brackets are matched as
// optional so either form is accepted.
fn aprsis_grid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@APRSIS\s+\[?GRID\]?\s+(\S+)").expect("valid aprsis grid regex"))
}

fn aprsis_cmd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@APRSIS\s+\[?CMD\]?\s+:(\S+)\s+:(\S+)\s+(.*)$").expect("valid aprsis cmd regex")
    })
}

pub struct FrameReassembler {
    bandwidth_hz: i64,
    by_freq: HashMap<i64, Vec<ActivityRecord>>,
    by_freq_incomplete: HashMap<i64, Vec<ActivityRecord>>,
    callsigns: HashMap<String, CallsignRecord>,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_BANDWIDTH_HZ)
    }
}

impl FrameReassembler {
    pub fn new(bandwidth_hz: i64) -> Self {
        FrameReassembler {
            bandwidth_hz,
            by_freq: HashMap::new(),
            by_freq_incomplete: HashMap::new(),
            callsigns: HashMap::new(),
        }
    }

    pub fn callsign(&self, call: &str) -> Option<&CallsignRecord> {
        self.callsigns.get(call)
    }

    pub fn open_activities(&self, dial_freq: i64) -> &[ActivityRecord] {
        self.by_freq.get(&dial_freq).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn incomplete_activities(&self, dial_freq: i64) -> &[ActivityRecord] {
        self.by_freq_incomplete
            .get(&dial_freq)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Feed one frame record through the matching rule and completion
    /// state machine. Returns any APRS dispatch triggered by completion.
    pub fn ingest(&mut self, record: FrameRecord) -> Option<AprsDispatch> {
        let dial_freq = record.dial_freq;
        let bucket = self.by_freq.entry(dial_freq).or_default();

        let mut matched_idx = None;
        for (idx, activity) in bucket.iter_mut().enumerate() {
            let offset_close = (activity.offset - record.offset).abs() <= self.bandwidth_hz;
            let time_close = (record.timestamp - activity.first_ts).abs() <= TIME_WINDOW_SECS
                || (record.timestamp - activity.last_ts).abs() <= TIME_WINDOW_SECS;

            if matched_idx.is_none() && offset_close && time_close {
                matched_idx = Some(idx);
                continue;
            }

            if !activity.is_settled()
                && !(activity.seen_first && activity.seen_last)
                && (activity.last_ts - record.timestamp).abs() > TIME_WINDOW_SECS
            {
                activity.is_expired = true;
            }
        }

        let idx = match matched_idx {
            Some(idx) => {
                let activity = &mut bucket[idx];
                activity.msgs.push(record.clone());
                activity.first_ts = activity.first_ts.min(record.timestamp);
                activity.last_ts = activity.last_ts.max(record.timestamp);
                activity.offset_total += record.offset;
                activity.offset = activity.offset_total / activity.msgs.len() as i64;
                idx
            }
            None => {
                bucket.push(ActivityRecord::new(&record));
                bucket.len() - 1
            }
        };

        let dispatch = self.apply_completion(dial_freq, idx, &record);
        dispatch
    }

    fn apply_completion(&mut self, dial_freq: i64, idx: usize, record: &FrameRecord) -> Option<AprsDispatch> {
        let bucket = self.by_freq.get_mut(&dial_freq)?;
        let activity = bucket.get_mut(idx)?;
        if activity.is_settled() {
            return None;
        }

        let class = record.frame_class.as_str();
        let tt = record.thread_type;
        match (class, tt) {
            ("Directed", 3) | ("Heartbeat", 3) => {
                activity.seen_first = true;
                activity.seen_last = true;
                activity.is_complete = true;
                if activity.locator.is_none() {
                    activity.locator = record.locator.clone();
                }
            }
            ("Directed", 1) => activity.seen_first = true,
            ("DataCompressed", 0) | ("Data", 0) => {}
            ("DataCompressed", 2) | ("Data", 2) => {
                activity.seen_last = true;
                activity.is_complete = activity.seen_first;
            }
            ("Compound", 1) => {
                activity.seen_first = true;
                if activity.locator.is_none() {
                    activity.locator = record.locator.clone();
                }
            }
            ("CompoundDirected", 0) => {}
            ("CompoundDirected", 2) => {
                activity.seen_last = true;
                activity.is_complete = activity.seen_first;
            }
            _ => {
                // Unexpected (frame_class, thread_type) combination: the
                // just-appended message is marked invalid in place, but the
                // activity itself is left open.
                if let Some(last) = activity.msgs.last_mut() {
                    last.is_valid = false;
                    last.validation_msg = Some("Unexpected frame_class/thread_type combination".to_string());
                }
                return None;
            }
        }

        if !activity.is_complete {
            return None;
        }

        self.finalize(dial_freq, idx)
    }

    fn finalize(&mut self, dial_freq: i64, idx: usize) -> Option<AprsDispatch> {
        let bucket = self.by_freq.get_mut(&dial_freq)?;
        let activity = bucket.get_mut(idx)?;

        let mut full_msg = String::new();
        let mut callsign = None;
        let mut timestamp = None;
        let mut snr = None;
        for m in &activity.msgs {
            if !m.is_valid {
                continue;
            }
            if callsign.is_none() {
                callsign = m.callsign.clone();
            }
            if timestamp.is_none() {
                timestamp = Some(m.timestamp);
            }
            if snr.is_none() {
                snr = Some(m.db);
            }
            if let Some(msg) = &m.msg {
                full_msg.push_str(msg);
                if matches!(m.frame_class.as_str(), "Compound" | "CompoundDirected") {
                    full_msg.push(' ');
                }
            }
        }

        activity.callsign = callsign.clone();
        activity.timestamp = timestamp;
        activity.snr = snr;
        activity.dial_freq = Some(dial_freq);
        activity.freq = Some(dial_freq + activity.offset);
        activity.full_msg = Some(full_msg.clone());

        if let Some(call) = &callsign {
            let record_time = activity.msgs.first().map(|m| m.record_time.clone()).unwrap_or_default();
            let entry = self.callsigns.entry(call.clone()).or_default();
            entry.last_ts = activity.last_ts.max(entry.last_ts);
            if entry.first_ts == 0 {
                entry.first_ts = activity.first_ts;
            }
            entry.last_freq = dial_freq;
            entry.activity.push(activity.id);
            entry.index_activity(&record_time, dial_freq, activity.id);
        }

        if full_msg.contains("@APRSIS") {
            return parse_aprsis_directive(&full_msg, callsign, activity.freq.unwrap_or(dial_freq), snr.unwrap_or(0.0));
        }
        None
    }

    /// Move every `is_expired` activity from the open list to the
    /// incomplete archive. Idempotent.
    pub fn cleanup(&mut self) {
        for (freq, bucket) in self.by_freq.iter_mut() {
            let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(bucket)
                .into_iter()
                .partition(|a| a.is_expired);
            *bucket = kept;
            self.by_freq_incomplete.entry(*freq).or_default().extend(expired);
        }
    }
}

fn parse_aprsis_directive(
    full_msg: &str,
    callsign: Option<String>,
    freq_hz: i64,
    snr: f32,
) -> Option<AprsDispatch> {
    if let Some(caps) = aprsis_grid_re().captures(full_msg) {
        let grid = caps.get(1)?.as_str().to_string();
        let call = callsign?;
        if call.is_empty() || grid.is_empty() {
            return None;
        }
        return Some(AprsDispatch::Position {
            callsign: call,
            grid,
            freq_hz,
            snr,
        });
    }
    if let Some(caps) = aprsis_cmd_re().captures(full_msg) {
        let from = caps.get(1)?.as_str().to_string();
        let text = caps.get(3)?.as_str().to_string();
        if from.is_empty() || text.is_empty() {
            return None;
        }
        return Some(AprsDispatch::Message {
            callsign: from,
            text,
        });
    }
    tracing::debug!("unrecognized @APRSIS directive: {}", full_msg);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        class: &str,
        tt: u8,
        dial_freq: i64,
        offset: i64,
        ts: i64,
        callsign: Option<&str>,
        locator: Option<&str>,
        msg: Option<&str>,
    ) -> FrameRecord {
        FrameRecord {
            timestamp: ts,
            record_time: "2025/10/26 19:26:30".to_string(),
            mode: "JS8".to_string(),
            js8mode: class.to_string(),
            thread_type: tt,
            dial_freq,
            offset,
            freq: dial_freq + offset,
            callsign: callsign.map(str::to_string),
            callsign_to: None,
            locator: locator.map(str::to_string),
            cmd: None,
            msg: msg.map(str::to_string),
            raw_msg: String::new(),
            db: -12.0,
            dt: 0.1,
            snr: -12.0,
            frame_class: class.to_string(),
            spot: false,
            is_valid: true,
            validation_msg: None,
            decode_file: None,
        }
    }

    #[test]
    fn reassembles_compound_directed_transmission() {
        let mut r = FrameReassembler::default();
        r.ingest(frame("Compound", 1, 7078000, 800, 100, Some("VK4TAA"), Some("QG62"), None));
        r.ingest(frame("CompoundDirected", 0, 7078000, 801, 110, None, None, None));
        let dispatch = r.ingest(frame(
            "CompoundDirected",
            2,
            7078000,
            802,
            120,
            None,
            None,
            Some("HELLO"),
        ));
        assert!(dispatch.is_none());

        let activity = &r.open_activities(7078000)[0];
        assert!(activity.is_complete);
        assert_eq!(activity.callsign.as_deref(), Some("VK4TAA"));
        assert_eq!(activity.locator.as_deref(), Some("QG62"));
        assert_eq!(activity.offset, 801);
        assert_eq!(activity.freq, Some(7078801));
        assert!(activity.full_msg.as_deref().unwrap().trim_end().ends_with("HELLO"));
    }

    #[test]
    fn expires_unfinished_activity_on_timeout() {
        let mut r = FrameReassembler::default();
        r.ingest(frame("Directed", 1, 14078000, 500, 1000, Some("VK4TMZ"), None, None));
        r.ingest(frame("Heartbeat", 3, 14078000, 9000, 1100, Some("VK4TBB"), Some("QG62"), None));
        r.cleanup();

        assert!(r.open_activities(14078000).iter().all(|a| !a.is_expired));
        assert_eq!(r.incomplete_activities(14078000).len(), 1);
        assert!(r.incomplete_activities(14078000)[0].is_expired);
    }

    #[test]
    fn marks_unexpected_frame_class_thread_type_invalid_without_disturbing_activity() {
        let mut r = FrameReassembler::default();
        r.ingest(frame("Directed", 1, 3578000, 200, 500, Some("VK4TMZ"), None, None));
        let dispatch = r.ingest(frame("Heartbeat", 1, 3578000, 201, 510, Some("VK4TMZ"), None, None));
        assert!(dispatch.is_none());

        let activity = &r.open_activities(3578000)[0];
        assert!(!activity.is_complete);
        assert!(!activity.msgs.last().unwrap().is_valid);
        assert_eq!(
            activity.msgs.last().unwrap().validation_msg.as_deref(),
            Some("Unexpected frame_class/thread_type combination")
        );
    }

    #[test]
    fn dispatches_aprsis_position() {
        let mut r = FrameReassembler::default();
        r.ingest(frame("Compound", 1, 7078000, 800, 100, Some("VK4TAA"), Some("QG62"), None));
        let dispatch = r.ingest(frame(
            "CompoundDirected",
            2,
            7078000,
            801,
            120,
            None,
            None,
            Some("@APRSIS [GRID] QG62ms"),
        ));
        assert_eq!(
            dispatch,
            Some(AprsDispatch::Position {
                callsign: "VK4TAA".to_string(),
                grid: "QG62ms".to_string(),
                freq_hz: 7078801,
                snr: -12.0,
            })
        );
    }

    /// S4: the bare `GRID` keyword (no brackets) must dispatch too.
    #[test]
    fn dispatches_aprsis_position_with_bare_keyword() {
        let mut r = FrameReassembler::default();
        r.ingest(frame("Compound", 1, 7078000, 800, 100, Some("VK4TAA"), Some("QG62"), None));
        let dispatch = r.ingest(frame(
            "CompoundDirected",
            2,
            7078000,
            801,
            120,
            None,
            None,
            Some("@APRSIS GRID QG62ms"),
        ));
        assert_eq!(
            dispatch,
            Some(AprsDispatch::Position {
                callsign: "VK4TAA".to_string(),
                grid: "QG62ms".to_string(),
                freq_hz: 7078801,
                snr: -12.0,
            })
        );
    }
}

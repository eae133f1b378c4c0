// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Minimal decoder for the JS8 demodulator's per-line text output.
//!
//! The demodulator (`js8`) itself is an external subprocess and its
//! on-air signal processing is out of scope here; this module only
//! understands the line it prints per decoded frame:
//!
//! ```text
//! <snr> <dt> <offset_hz> ~ <class>:<thread_type> <payload...>
//! ```
//!
//! where `<class>` is one of `HB`, `CD`, `CDD`, `DIR`, `DATA`, `DATAC`
//! and `<payload>` is class-dependent whitespace-separated fields.

use crate::frame::{
    CompoundDirectedFields, CompoundFields, DataFields, DirectedFields, HeartbeatFields, Js8Frame,
};

pub fn decode_line(line: &str) -> Option<Js8Frame> {
    let mut parts = line.splitn(5, ' ');
    let snr: f32 = parts.next()?.parse().ok()?;
    let dt: f32 = parts.next()?.parse().ok()?;
    let offset_hz: i64 = parts.next()?.parse().ok()?;
    let marker = parts.next()?;
    if marker != "~" {
        return None;
    }
    let rest = parts.next().unwrap_or("").trim();

    let (tag, payload) = rest.split_once(' ').unwrap_or((rest, ""));
    let (class, thread_str) = tag.split_once(':')?;
    let thread_type: u8 = thread_str.parse().ok()?;
    let fields: Vec<&str> = payload.split_whitespace().collect();

    let frame = match class {
        "HB" => Js8Frame::Heartbeat(HeartbeatFields {
            thread_type,
            offset_hz,
            db: snr,
            dt,
            callsign: fields.first().map(|s| s.to_string()),
            grid: fields.get(1).map(|s| s.to_string()),
        }),
        "CD" => Js8Frame::Compound(CompoundFields {
            thread_type,
            offset_hz,
            db: snr,
            dt,
            callsign_from: fields.first().map(|s| s.to_string()),
            grid: fields.get(1).map(|s| s.to_string()),
        }),
        "CDD" => Js8Frame::CompoundDirected(CompoundDirectedFields {
            thread_type,
            offset_hz,
            db: snr,
            dt,
            callsign_from: fields.first().map(|s| s.to_string()),
            callsign_to: fields.get(1).map(|s| s.to_string()),
            text: if fields.len() > 2 {
                Some(fields[2..].join(" "))
            } else {
                None
            },
        }),
        "DIR" => {
            if fields.len() < 3 {
                return None;
            }
            Js8Frame::Directed(DirectedFields {
                thread_type,
                offset_hz,
                db: snr,
                dt,
                callsign: Some(fields[0].to_string()),
                callsign_to: Some(fields[1].to_string()),
                cmd: fields[2..].join(" "),
            })
        }
        "DATA" => Js8Frame::Data(DataFields {
            thread_type,
            offset_hz,
            db: snr,
            dt,
            text: fields.join(" "),
        }),
        "DATAC" => Js8Frame::DataCompressed(DataFields {
            thread_type,
            offset_hz,
            db: snr,
            dt,
            text: fields.join(" "),
        }),
        _ => return None,
    };

    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_heartbeat() {
        let frame = decode_line("-10 0.2 1500 ~ HB:3 VK4TMZ QG62").unwrap();
        assert_eq!(frame.class_name(), "Heartbeat");
        assert_eq!(frame.offset_hz(), 1500);
        assert_eq!(frame.callsign(), Some("VK4TMZ"));
        assert_eq!(frame.grid(), Some("QG62"));
    }

    #[test]
    fn decodes_directed_command() {
        let frame = decode_line("-5 0.1 800 ~ DIR:1 VK4TAA VK4TBB HELLO THERE").unwrap();
        assert_eq!(frame.msg(), Some("HELLO THERE"));
        assert_eq!(frame.callsign_to(), Some("VK4TBB"));
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(decode_line("not a frame line").is_none());
        assert!(decode_line("-5 0.1 800 # HB:3 VK4TMZ QG62").is_none());
    }
}

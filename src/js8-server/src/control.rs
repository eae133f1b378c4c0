// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Top-level supervisor: dispatches `record`/`decode`/`rebuild-*`
//! subcommands, fanning out across the configured freq×submode grid.
//!
//! Grounded on the reference tool's `main()` dispatch table and its
//! `start/stop/check{Recorders,Decoders}` functions.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use js8_app::{archive_file, ArchiveMethod};
use js8_core::{process_decode_file, ActivityRecord, CallsignRecord, FrameParser, FrameReassembler, Submode};

use crate::config::Js8ServerConfig;
use crate::decoder_pid::{decoder_pid_path, load_decoder_pid, process_alive, save_decoder_pid, DecoderPid};
use crate::decoder_worker::{run_decoder_loop, AprsSink, NullAprsSink};
use crate::error::PipelineError;
use crate::mode_config::ModeConfig;
use crate::recorder::{load_record_pids, save_record_pids, start_recorder, stop_recorder, RecorderPid};
use crate::spotline::format_spot_line;

/// One (freq_khz, submode) cell the control process fans commands out to.
pub struct WorkItem {
    pub freq_khz: u32,
    pub submode: Submode,
}

pub fn work_items(freqs_khz: &[u32], submodes: &[Submode]) -> Vec<WorkItem> {
    freqs_khz
        .iter()
        .flat_map(|&freq_khz| submodes.iter().map(move |&submode| WorkItem { freq_khz, submode }))
        .collect()
}

fn mode_config_for(cfg: &Js8ServerConfig, item: &WorkItem) -> ModeConfig {
    ModeConfig::new(
        item.freq_khz,
        item.submode,
        cfg.general.data_dir.clone(),
        cfg.general.mcast_addr.clone(),
        cfg.general.spot_log_path.clone(),
    )
}

fn recorder_pids_path(data_root: &Path) -> PathBuf {
    data_root.join("pcmrecord.pids")
}

pub fn record_start(cfg: &Js8ServerConfig, items: &[WorkItem]) -> Result<(), PipelineError> {
    let pids_path = recorder_pids_path(&cfg.general.data_dir);
    let existing = load_record_pids(&pids_path)?;
    if existing.iter().any(|r| r.pid.is_some()) {
        tracing::warn!("recorders already started; run record stop first");
        return Ok(());
    }

    let mut recs: Vec<RecorderPid> = Vec::with_capacity(items.len());
    for item in items {
        let mc = mode_config_for(cfg, item);
        mc.ensure_dirs()?;
        let rec = start_recorder(&mc, &cfg.general.pcmrecord_bin)?;
        tracing::info!(freq_khz = item.freq_khz, submode = %item.submode, pid = ?rec.pid, "recorder started");
        recs.push(rec);
    }
    save_record_pids(&pids_path, &recs)?;
    Ok(())
}

pub fn record_stop(cfg: &Js8ServerConfig) -> Result<(), PipelineError> {
    let pids_path = recorder_pids_path(&cfg.general.data_dir);
    let recs = load_record_pids(&pids_path)?;
    if recs.is_empty() {
        tracing::info!("no recorders running, nothing to do");
        return Ok(());
    }
    for rec in &recs {
        stop_recorder(rec);
    }
    archive_file(&pids_path, None, ArchiveMethod::Move)?;
    Ok(())
}

pub fn record_status(cfg: &Js8ServerConfig) -> Result<Vec<(RecorderPid, bool)>, PipelineError> {
    let pids_path = recorder_pids_path(&cfg.general.data_dir);
    let recs = load_record_pids(&pids_path)?;
    Ok(recs
        .into_iter()
        .map(|r| {
            let alive = r.pid.map(process_alive).unwrap_or(false);
            (r, alive)
        })
        .collect())
}

/// Launches one long-lived decoder thread per work item. Never returns;
/// callers run this as the process's main body after writing the
/// control PID file.
pub fn decode_start(cfg: &Js8ServerConfig, items: Vec<WorkItem>) -> Result<(), PipelineError> {
    let pid_path = decoder_pid_path(&cfg.general.data_dir);
    if let Some(existing) = load_decoder_pid(&pid_path)? {
        if process_alive(existing.pid) {
            tracing::warn!(pid = existing.pid, "decoder already running; run decode stop first");
            return Ok(());
        }
    }
    save_decoder_pid(&pid_path, std::process::id(), chrono::Utc::now().timestamp())?;

    let aprs_reporter = if cfg.aprsis.enabled {
        Some(std::sync::Arc::new(js8_aprs::AprsReporter::new(cfg.aprsis.to_aprs_config())))
    } else {
        None
    };

    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let mc = mode_config_for(cfg, &item);
        mc.ensure_dirs()?;
        let demod_bin = cfg.general.demodulator_bin.clone();
        let aprs_reporter = aprs_reporter.clone();
        handles.push(thread::spawn(move || {
            let sink: Box<dyn AprsSink> = match aprs_reporter {
                Some(reporter) => Box::new(ReporterSink { reporter }),
                None => Box::new(NullAprsSink),
            };
            let spot_log_path = mc.spot_log_path.clone();
            run_decoder_loop(&mc, &demod_bin, &spot_log_path, sink.as_ref());
        }));
    }

    // Worker threads run forever; the process exits via SIGTERM, not by
    // joining these handles (no graceful drain, matching the loop's
    // intended lifecycle).
    for h in handles {
        let _ = h.join();
    }
    Ok(())
}

struct ReporterSink {
    reporter: std::sync::Arc<js8_aprs::AprsReporter>,
}

impl AprsSink for ReporterSink {
    fn dispatch(&self, d: js8_core::AprsDispatch) {
        let result = match d {
            js8_core::AprsDispatch::Position { callsign, grid, freq_hz, snr } => {
                let freq_mhz = freq_hz as f64 / 1_000_000.0;
                self.reporter.report_position(&callsign, &grid, freq_mhz, snr.round() as i32)
            }
            js8_core::AprsDispatch::Message { callsign, text } => self.reporter.report_message(&callsign, &text),
        };
        if let Err(e) = result {
            tracing::warn!("APRS dispatch failed: {}", e);
        }
    }
}

pub fn decode_stop(cfg: &Js8ServerConfig) -> Result<(), PipelineError> {
    let pid_path = decoder_pid_path(&cfg.general.data_dir);
    let Some(existing) = load_decoder_pid(&pid_path)? else {
        tracing::info!("no decoder running, nothing to do");
        return Ok(());
    };
    unsafe {
        libc::kill(existing.pid as libc::pid_t, libc::SIGTERM);
    }
    archive_file(&pid_path, None, ArchiveMethod::Move)?;
    Ok(())
}

pub fn decode_status(cfg: &Js8ServerConfig) -> Result<Option<(DecoderPid, bool)>, PipelineError> {
    let pid_path = decoder_pid_path(&cfg.general.data_dir);
    let Some(existing) = load_decoder_pid(&pid_path)? else {
        return Ok(None);
    };
    let alive = process_alive(existing.pid);
    Ok(Some((existing, alive)))
}

fn refuse_if_decoder_live(cfg: &Js8ServerConfig, what: &'static str) -> Result<(), PipelineError> {
    let pid_path = decoder_pid_path(&cfg.general.data_dir);
    if let Some(existing) = load_decoder_pid(&pid_path)? {
        if process_alive(existing.pid) {
            return Err(PipelineError::LiveDecoder(what, pid_path));
        }
    }
    Ok(())
}

pub fn rebuild_spots(cfg: &Js8ServerConfig, items: &[WorkItem], print_only: bool) -> Result<(), PipelineError> {
    if !print_only {
        refuse_if_decoder_live(cfg, "rebuild-spots")?;
    }

    let mut lines = Vec::new();
    for item in items {
        let mc = mode_config_for(cfg, item);
        let decodes_path = mc.all_parsed_decodes_path();
        if !decodes_path.exists() {
            continue;
        }
        let records: Vec<js8_core::FrameRecord> = js8_app::load_json_lines(&decodes_path)?;
        for record in &records {
            if let Some(line) = format_spot_line(record) {
                lines.push((record.record_time.clone(), line));
            }
        }
    }
    lines.sort_by(|a, b| a.0.cmp(&b.0));
    let lines: Vec<String> = lines.into_iter().map(|(_, l)| l).collect();

    if print_only {
        for line in &lines {
            print!("{line}");
        }
        return Ok(());
    }

    if cfg.general.spot_log_path.exists() {
        archive_file(&cfg.general.spot_log_path, None, ArchiveMethod::Truncate)?;
    }
    js8_app::write_strings_to_file(&cfg.general.spot_log_path, &lines, false)?;
    Ok(())
}

pub fn rebuild_alldecodes(cfg: &Js8ServerConfig, items: &[WorkItem], print_only: bool) -> Result<(), PipelineError> {
    if !print_only {
        refuse_if_decoder_live(cfg, "rebuild-alldecodes")?;
    }

    for item in items {
        let mc = mode_config_for(cfg, item);
        if !mc.decode_done_dir.exists() {
            continue;
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&mc.decode_done_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();

        let mut parser = FrameParser::new();
        let mut records = Vec::new();
        for path in entries {
            match process_decode_file(&mut parser, &path) {
                Ok(recs) => records.extend(recs),
                Err(e) => tracing::warn!(file = %path.display(), "failed to reparse decode file: {}", e),
            }
        }

        if print_only {
            for record in &records {
                println!("{}", serde_json::to_string(record).unwrap_or_default());
            }
            continue;
        }

        let out_path = mc.all_parsed_decodes_path();
        if out_path.exists() {
            archive_file(&out_path, None, ArchiveMethod::Truncate)?;
        }
        js8_app::append_json_lines(&out_path, &records)?;
    }
    Ok(())
}

pub fn rebuild_history(cfg: &Js8ServerConfig, items: &[WorkItem], print_only: bool) -> Result<(), PipelineError> {
    if !print_only {
        refuse_if_decoder_live(cfg, "rebuild-history")?;
    }

    let mut reassembler = FrameReassembler::default();
    let mut dial_freqs = Vec::new();

    for item in items {
        let mc = mode_config_for(cfg, item);
        let dial_freq = mc.freq_hz as i64;
        dial_freqs.push(dial_freq);

        let decodes_path = mc.all_parsed_decodes_path();
        if !decodes_path.exists() {
            continue;
        }
        let mut records: Vec<js8_core::FrameRecord> = js8_app::load_json_lines(&decodes_path)?;
        records.sort_by_key(|r| r.timestamp);

        // APRS dispatch is never performed during a history rebuild.
        for record in records {
            let _ = reassembler.ingest(record);
        }
    }
    reassembler.cleanup();

    let mut callsign_lines = Vec::new();
    let mut open_lines = Vec::new();
    let mut incomplete_lines = Vec::new();
    let mut seen_callsigns = std::collections::HashSet::new();

    for &dial_freq in &dial_freqs {
        for activity in reassembler.open_activities(dial_freq) {
            open_lines.push(json_line(activity));
            record_callsign(&reassembler, activity, &mut seen_callsigns, &mut callsign_lines);
        }
        for activity in reassembler.incomplete_activities(dial_freq) {
            incomplete_lines.push(json_line(activity));
            record_callsign(&reassembler, activity, &mut seen_callsigns, &mut callsign_lines);
        }
    }

    if print_only {
        for line in callsign_lines.iter().chain(open_lines.iter()).chain(incomplete_lines.iter()) {
            println!("{line}");
        }
        return Ok(());
    }

    write_db_file(&cfg.general.data_dir.join("callsign_history.db"), &callsign_lines)?;
    write_db_file(&cfg.general.data_dir.join("msgfreq.db"), &open_lines)?;
    write_db_file(&cfg.general.data_dir.join("msgfreq_incomplete.db"), &incomplete_lines)?;
    Ok(())
}

fn record_callsign(
    reassembler: &FrameReassembler,
    activity: &ActivityRecord,
    seen: &mut std::collections::HashSet<String>,
    out: &mut Vec<String>,
) {
    let Some(call) = &activity.callsign else { return };
    if !seen.insert(call.clone()) {
        return;
    }
    if let Some(record) = reassembler.callsign(call) {
        out.push(json_line(&CallsignSnapshot { callsign: call.clone(), record: record.clone() }));
    }
}

#[derive(serde::Serialize)]
struct CallsignSnapshot {
    callsign: String,
    #[serde(flatten)]
    record: CallsignRecord,
}

fn json_line<T: serde::Serialize>(v: &T) -> String {
    serde_json::to_string(v).unwrap_or_default()
}

fn write_db_file(path: &Path, lines: &[String]) -> Result<(), PipelineError> {
    if path.exists() {
        archive_file(path, None, ArchiveMethod::Truncate)?;
    }
    let with_newlines: Vec<String> = lines.iter().map(|l| format!("{l}\n")).collect();
    js8_app::write_strings_to_file(path, &with_newlines, false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use js8_core::FrameRecord;

    fn test_cfg(data_dir: PathBuf) -> Js8ServerConfig {
        let mut cfg = Js8ServerConfig::default();
        cfg.general.data_dir = data_dir.clone();
        cfg.general.spot_log_path = data_dir.join("spot.log");
        cfg
    }

    fn one_item() -> Vec<WorkItem> {
        vec![WorkItem { freq_khz: 10130, submode: Submode::Norm }]
    }

    fn heartbeat_record(record_time: &str, timestamp: i64) -> FrameRecord {
        FrameRecord {
            timestamp,
            record_time: record_time.to_string(),
            mode: "JS8".to_string(),
            js8mode: "Heartbeat".to_string(),
            thread_type: 3,
            dial_freq: 10_130_000,
            offset: 1500,
            freq: 10_131_500,
            callsign: Some("VK4TMZ".to_string()),
            callsign_to: None,
            locator: Some("QG62".to_string()),
            cmd: None,
            msg: None,
            raw_msg: "-10 0.2 1500 ~ HB:3 VK4TMZ QG62".to_string(),
            db: -10.0,
            dt: 0.2,
            snr: -10.0,
            frame_class: "Heartbeat".to_string(),
            spot: true,
            is_valid: true,
            validation_msg: None,
            decode_file: None,
        }
    }

    #[test]
    fn work_items_is_cartesian_product() {
        let items = work_items(&[10130, 14078], &[Submode::Fast, Submode::Norm]);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].freq_khz, 10130);
        assert_eq!(items[0].submode, Submode::Fast);
        assert_eq!(items[3].freq_khz, 14078);
        assert_eq!(items[3].submode, Submode::Norm);
    }

    /// S6: records with record_time "19:00:00" written after "20:00:00"
    /// must still sort first in the rebuilt spot log.
    #[test]
    fn rebuild_spots_sorts_by_record_time() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path().to_path_buf());
        let items = one_item();
        let mc = mode_config_for(&cfg, &items[0]);
        mc.ensure_dirs().unwrap();

        let records = vec![
            heartbeat_record("2025/10/26 20:00:00", 100),
            heartbeat_record("2025/10/26 19:00:00", 50),
        ];
        js8_app::append_json_lines(&mc.all_parsed_decodes_path(), &records).unwrap();

        rebuild_spots(&cfg, &items, false).unwrap();

        let content = fs::read_to_string(&cfg.general.spot_log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("2025/10/26 19:00:00"));
        assert!(lines[1].starts_with("2025/10/26 20:00:00"));
    }

    #[test]
    fn rebuild_spots_print_only_does_not_touch_spot_log() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path().to_path_buf());
        let items = one_item();
        let mc = mode_config_for(&cfg, &items[0]);
        mc.ensure_dirs().unwrap();
        js8_app::append_json_lines(
            &mc.all_parsed_decodes_path(),
            &[heartbeat_record("2025/10/26 19:00:00", 50)],
        )
        .unwrap();

        rebuild_spots(&cfg, &items, true).unwrap();
        assert!(!cfg.general.spot_log_path.exists());
    }

    #[test]
    fn rebuild_alldecodes_reparses_done_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path().to_path_buf());
        let items = one_item();
        let mc = mode_config_for(&cfg, &items[0]);
        mc.ensure_dirs().unwrap();

        fs::write(
            mc.decode_done_dir.join("20251026T192630Z_10130000_usb.wav.decode"),
            "-10 0.2 1500 ~ HB:3 VK4TMZ QG62\n",
        )
        .unwrap();

        rebuild_alldecodes(&cfg, &items, false).unwrap();

        let records: Vec<FrameRecord> = js8_app::load_json_lines(&mc.all_parsed_decodes_path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].callsign.as_deref(), Some("VK4TMZ"));
    }

    #[test]
    fn rebuild_history_writes_callsign_snapshot_without_aprs_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path().to_path_buf());
        let items = one_item();
        let mc = mode_config_for(&cfg, &items[0]);
        mc.ensure_dirs().unwrap();

        js8_app::append_json_lines(
            &mc.all_parsed_decodes_path(),
            &[heartbeat_record("2025/10/26 19:26:30", 100)],
        )
        .unwrap();

        rebuild_history(&cfg, &items, false).unwrap();

        let callsign_db = fs::read_to_string(dir.path().join("callsign_history.db")).unwrap();
        assert!(callsign_db.contains("VK4TMZ"));
        assert!(dir.path().join("msgfreq.db").exists());
        assert!(dir.path().join("msgfreq_incomplete.db").exists());
    }

    #[test]
    fn refuses_rebuild_when_decoder_pid_is_live() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path().to_path_buf());
        save_decoder_pid(&decoder_pid_path(&cfg.general.data_dir), std::process::id(), 1_700_000_000).unwrap();

        let err = refuse_if_decoder_live(&cfg, "rebuild-spots").unwrap_err();
        assert!(matches!(err, PipelineError::LiveDecoder("rebuild-spots", _)));
    }

    #[test]
    fn print_only_bypasses_live_decoder_refusal() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_cfg(dir.path().to_path_buf());
        let items = one_item();
        let mc = mode_config_for(&cfg, &items[0]);
        mc.ensure_dirs().unwrap();
        save_decoder_pid(&decoder_pid_path(&cfg.general.data_dir), std::process::id(), 1_700_000_000).unwrap();

        assert!(rebuild_spots(&cfg, &items, true).is_ok());
    }
}

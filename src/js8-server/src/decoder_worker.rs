// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The long-lived per-(freq, submode) decode loop: invoke the
//! demodulator on aged recordings, parse its output, feed the
//! reassembler, and append spots under the shared file lock.
//!
//! Grounded on the reference tool's `startDecoder`/`js8DecoderHandler`
//! for the loop shape and on `trx-wspr/src/wsprd_wrapper.rs` for the
//! `Command`-based subprocess wrapper idiom.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use js8_app::{append_json_lines, find_aged_files, SpotLogLock};
use js8_core::{process_decode_file, AprsDispatch, FrameParser, FrameReassembler};

use crate::error::PipelineError;
use crate::mode_config::ModeConfig;
use crate::spotline::format_spot_line;

/// Recordings younger than this are left alone; the recorder may still
/// be writing them.
const WAV_AGE_SECS: u64 = 2;
const POLL_INTERVAL: Duration = Duration::from_secs(15);

pub trait AprsSink {
    fn dispatch(&self, d: AprsDispatch);
}

/// No-op sink: used when APRS-IS reporting is disabled or during
/// `rebuild-history`, where dispatch must never occur.
pub struct NullAprsSink;

impl AprsSink for NullAprsSink {
    fn dispatch(&self, _d: AprsDispatch) {}
}

/// Runs `decode_once` forever, sleeping `POLL_INTERVAL` between cycles.
/// Returns only on an unrecoverable setup error; per-recording failures
/// are logged in place and do not stop the loop.
pub fn run_decoder_loop(mc: &ModeConfig, demod_bin: &str, spot_log_path: &Path, aprs: &dyn AprsSink) -> ! {
    let mut reassembler = FrameReassembler::default();
    loop {
        if let Err(e) = decode_once(mc, demod_bin, spot_log_path, &mut reassembler, aprs) {
            tracing::warn!(freq_khz = mc.freq_khz, submode = %mc.submode, "decode cycle error: {}", e);
        }
        reassembler.cleanup();
        sleep(POLL_INTERVAL);
    }
}

/// One pass over all aged recordings currently sitting in `rec_dir`.
pub fn decode_once(
    mc: &ModeConfig,
    demod_bin: &str,
    spot_log_path: &Path,
    reassembler: &mut FrameReassembler,
    aprs: &dyn AprsSink,
) -> Result<(), PipelineError> {
    let wavs = find_aged_files(&mc.rec_dir, WAV_AGE_SECS, |n| n.ends_with(".wav"))?;

    for wav in wavs {
        if let Err(e) = decode_one_file(mc, demod_bin, &wav, spot_log_path, reassembler, aprs) {
            tracing::warn!(file = %wav.display(), "failed to process recording: {}", e);
        }
    }
    Ok(())
}

fn decode_one_file(
    mc: &ModeConfig,
    demod_bin: &str,
    wav_path: &Path,
    spot_log_path: &Path,
    reassembler: &mut FrameReassembler,
    aprs: &dyn AprsSink,
) -> Result<(), PipelineError> {
    let wav_name = wav_path.file_name().unwrap_or_default().to_string_lossy().to_string();
    let decode_name = format!("{wav_name}.decode");
    let decode_path = mc.decode_dir.join(&decode_name);
    let error_path = mc.decode_error_dir.join(format!("{decode_name}.error"));

    let decode_out = fs::File::create(&decode_path)?;
    let decode_err = fs::File::create(&error_path)?;

    let status = Command::new(demod_bin)
        .arg("-f")
        .arg(mc.freq_hz.to_string())
        .arg("--js8")
        .arg("-b")
        .arg(mc.submode.code().to_string())
        .arg("-d")
        .arg("3")
        .arg("-a")
        .arg(&mc.rec_dir)
        .arg("-t")
        .arg(&mc.tmp_dir)
        .arg(wav_path)
        .stdout(Stdio::from(decode_out))
        .stderr(Stdio::from(decode_err))
        .status()?;

    if !status.success() {
        tracing::warn!(file = %wav_path.display(), code = ?status.code(), "demodulator exited non-zero");
        fs::rename(&decode_path, mc.decode_error_dir.join(&decode_name))?;
        fs::remove_file(wav_path)?;
        return Ok(());
    }

    let _ = fs::remove_file(&error_path);
    let decode_done = mc.decode_done_dir.join(&decode_name);
    fs::rename(&decode_path, &decode_done)?;

    let mut parser = FrameParser::new();
    let records = process_decode_file(&mut parser, &decode_done)?;

    if !records.is_empty() {
        append_json_lines(&mc.all_parsed_decodes_path(), &records)?;
    }

    let mut spot_batch = Vec::new();
    for record in &records {
        if let Some(line) = format_spot_line(record) {
            spot_batch.push(line);
        }
        if let Some(dispatch) = reassembler.ingest(record.clone()) {
            aprs.dispatch(dispatch);
        }
    }

    if !spot_batch.is_empty() {
        let _lock = SpotLogLock::acquire(&spot_lock_path(spot_log_path))?;
        append_spot_lines(spot_log_path, &spot_batch)?;
    }

    fs::remove_file(wav_path)?;
    Ok(())
}

fn spot_lock_path(spot_log_path: &Path) -> PathBuf {
    spot_log_path
        .parent()
        .map(|p| p.join("spot.lock"))
        .unwrap_or_else(|| PathBuf::from("spot.lock"))
}

fn append_spot_lines(spot_log_path: &Path, lines: &[String]) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(spot_log_path)?;
    for line in lines {
        file.write_all(line.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use js8_core::Submode;

    struct RecordingSink {
        calls: std::cell::RefCell<Vec<AprsDispatch>>,
    }

    impl AprsSink for RecordingSink {
        fn dispatch(&self, d: AprsDispatch) {
            self.calls.borrow_mut().push(d);
        }
    }

    #[test]
    fn decode_once_moves_wav_and_spots_heartbeat() {
        let dir = tempfile::tempdir().unwrap();
        let mc = ModeConfig::new(
            10130,
            Submode::Norm,
            dir.path().to_path_buf(),
            "js8-pcm.local".to_string(),
            dir.path().join("spot.log"),
        );
        mc.ensure_dirs().unwrap();

        let wav_name = "20251026T192630Z_10130000_usb.wav";
        let wav_path = mc.rec_dir.join(wav_name);
        fs::write(&wav_path, b"fake pcm").unwrap();

        // Clear the aging window so the decode pass picks this file up.
        sleep(Duration::from_millis(2_200));

        // A stand-in demodulator that emits one decoded heartbeat line.
        let script = dir.path().join("fake_js8");
        fs::write(
            &script,
            "#!/bin/sh\necho '-10 0.2 1500 ~ HB:3 VK4TMZ QG62'\n",
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut reassembler = FrameReassembler::default();
        let sink = RecordingSink {
            calls: std::cell::RefCell::new(Vec::new()),
        };
        decode_once(
            &mc,
            script.to_str().unwrap(),
            &mc.spot_log_path,
            &mut reassembler,
            &sink,
        )
        .unwrap();

        assert!(!wav_path.exists());
        assert!(mc.decode_done_dir.join(format!("{wav_name}.decode")).exists());
        assert!(mc.all_parsed_decodes_path().exists());
        let content = fs::read_to_string(mc.spot_log_path).unwrap();
        assert!(content.contains("VK4TMZ"));
    }
}

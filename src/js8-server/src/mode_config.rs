// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Computes and materializes the nine directories one (freq, submode)
//! worker owns. Grounded on `startDecoder()`'s local path construction
//! in the reference tool (decode sibling to data, not the stale,
//! separately-nested layout `setupSubmodeFolders()` builds).

use std::fs;
use std::path::PathBuf;

use js8_core::Submode;

/// Directory layout and identity for one (freq, submode) pipeline.
#[derive(Debug, Clone)]
pub struct ModeConfig {
    pub freq_khz: u32,
    pub freq_hz: u64,
    pub submode: Submode,
    pub data_root: PathBuf,
    pub mcast_addr: String,
    pub spot_log_path: PathBuf,

    pub root_dir: PathBuf,
    pub rec_dir: PathBuf,
    pub rec_error_dir: PathBuf,
    pub rec_done_dir: PathBuf,
    pub data_dir: PathBuf,
    pub decode_dir: PathBuf,
    pub decode_error_dir: PathBuf,
    pub decode_done_dir: PathBuf,
    pub tmp_dir: PathBuf,
}

impl ModeConfig {
    pub fn new(freq_khz: u32, submode: Submode, data_root: PathBuf, mcast_addr: String, spot_log_path: PathBuf) -> Self {
        let freq_hz = freq_khz as u64 * 1000;
        let root_dir = data_root.join(freq_hz.to_string()).join(submode.name());
        let rec_dir = root_dir.join("rec");
        let rec_error_dir = rec_dir.join("error");
        let rec_done_dir = rec_dir.join("done");
        let data_dir = root_dir.join("data");
        let decode_dir = root_dir.join("decode");
        let decode_error_dir = decode_dir.join("error");
        let decode_done_dir = decode_dir.join("done");
        let tmp_dir = root_dir.join("tmp");

        ModeConfig {
            freq_khz,
            freq_hz,
            submode,
            data_root,
            mcast_addr,
            spot_log_path,
            root_dir,
            rec_dir,
            rec_error_dir,
            rec_done_dir,
            data_dir,
            decode_dir,
            decode_error_dir,
            decode_done_dir,
            tmp_dir,
        }
    }

    /// All nine directories (the mode root plus its eight children), in
    /// the order this worker expects them to exist before use.
    pub fn all_dirs(&self) -> [&PathBuf; 9] {
        [
            &self.root_dir,
            &self.rec_dir,
            &self.rec_error_dir,
            &self.rec_done_dir,
            &self.data_dir,
            &self.decode_dir,
            &self.decode_error_dir,
            &self.decode_done_dir,
            &self.tmp_dir,
        ]
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.all_dirs() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn all_parsed_decodes_path(&self) -> PathBuf {
        self.data_dir.join("all_parsed_decodes.txt")
    }

    pub fn pcmrecord_log_path(&self) -> PathBuf {
        self.data_dir.join("pcmrecord.log")
    }
}

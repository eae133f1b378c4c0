// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Recorder(#[from] crate::recorder::RecorderError),
    #[error(transparent)]
    Archive(#[from] js8_app::ArchiveError),
    #[error(transparent)]
    Lock(#[from] js8_app::LockError),
    #[error(transparent)]
    DecodeFile(#[from] js8_core::DecodeFileError),
    #[error(transparent)]
    DecoderPid(#[from] crate::decoder_pid::DecoderPidError),
    #[error(transparent)]
    Config(#[from] js8_app::ConfigError),
    #[error(transparent)]
    Aprs(#[from] js8_aprs::AprsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("refusing to rebuild {0}: decoder pid file {1} indicates a live decoder")]
    LiveDecoder(&'static str, PathBuf),
    #[error("unknown submode {0:?}")]
    UnknownSubmode(String),
}

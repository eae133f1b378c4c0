// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod config;
pub mod fileutil;
pub mod logging;

pub use config::{ConfigError, ConfigFile};
pub use fileutil::{
    append_json_lines, archive_file, find_aged_files, load_json_lines, truncate_file,
    write_strings_to_file, ArchiveError, ArchiveMethod, LockError, SpotLogLock,
};
pub use logging::init_logging;

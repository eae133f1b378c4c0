// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for js8-server.
//!
//! Config is loaded from the `[js8-server]` section of `js8-rs.toml`, or
//! from a flat `js8-server.toml`. Default search order: current
//! directory, `dirs::config_dir()/js8-rs/`, `/etc/js8-rs/`.

use std::path::PathBuf;

use js8_app::ConfigFile;
use serde::{Deserialize, Serialize};

/// Top-level js8-server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Js8ServerConfig {
    pub general: GeneralConfig,
    pub aprsis: AprsisConfig,
    pub bands: BandsConfig,
}

/// General pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root directory under which every (freq, submode) tree is created.
    pub data_dir: PathBuf,
    /// Multicast group the recorder subscribes to for PCM frames.
    pub mcast_addr: String,
    /// Path to the shared spot log.
    pub spot_log_path: PathBuf,
    /// Path to the `pcmrecord` binary.
    pub pcmrecord_bin: String,
    /// Path to the `js8` demodulator binary.
    pub demodulator_bin: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/js8-rs"),
            mcast_addr: "js8-pcm.local".to_string(),
            spot_log_path: PathBuf::from("/var/log/js8.log"),
            pcmrecord_bin: crate::recorder::PCMRECORD_BIN_DEFAULT.to_string(),
            demodulator_bin: "/usr/local/bin/js8".to_string(),
            log_level: None,
        }
    }
}

/// APRS-IS reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AprsisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// APRS-IS passcode. -1 = auto-compute from `user`.
    pub passcode: i32,
    pub reporter: String,
    pub frames_log: PathBuf,
}

impl Default for AprsisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "asia.aprs2.net".to_string(),
            port: 14580,
            user: "N0CALL".to_string(),
            passcode: -1,
            reporter: "N0CALL".to_string(),
            frames_log: PathBuf::from("/var/log/js8-aprs.log"),
        }
    }
}

impl AprsisConfig {
    pub fn to_aprs_config(&self) -> js8_aprs::AprsConfig {
        let passcode = if self.passcode < 0 {
            js8_aprs::compute_passcode(&self.user)
        } else {
            self.passcode as u16
        };
        js8_aprs::AprsConfig {
            reporter: self.reporter.clone(),
            user: self.user.clone(),
            passcode,
            host: self.host.clone(),
            port: self.port,
            frames_log: self.frames_log.clone(),
        }
    }
}

/// Optional override of the fixed freq/SSRC band table. Documented for
/// deployments that need a custom band plan; the default table in
/// `js8_core::bands` is used whenever this is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BandsConfig {
    pub freqs_khz: Vec<u32>,
    pub ssrc: Vec<u32>,
}

impl ConfigFile for Js8ServerConfig {
    fn config_filename() -> &'static str {
        "js8-server.toml"
    }

    fn combined_key() -> Option<&'static str> {
        Some("js8-server")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Js8ServerConfig::default();
        assert_eq!(cfg.general.mcast_addr, "js8-pcm.local");
        assert!(!cfg.aprsis.enabled);
        assert_eq!(cfg.aprsis.port, 14580);
        assert!(cfg.bands.freqs_khz.is_empty());
    }

    #[test]
    fn parses_minimal_toml() {
        let toml_str = r#"
[general]
data_dir = "/data/js8"
mcast_addr = "239.1.1.1"

[aprsis]
enabled = true
user = "VK4TMZ"
"#;
        let cfg: Js8ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.general.data_dir, PathBuf::from("/data/js8"));
        assert_eq!(cfg.general.mcast_addr, "239.1.1.1");
        assert!(cfg.aprsis.enabled);
        assert_eq!(cfg.aprsis.user, "VK4TMZ");
        assert_eq!(cfg.aprsis.passcode, -1);
    }

    #[test]
    fn auto_computes_passcode_when_sentinel() {
        let aprsis = AprsisConfig {
            user: "VK4TMZ".to_string(),
            passcode: -1,
            ..AprsisConfig::default()
        };
        let aprs_cfg = aprsis.to_aprs_config();
        assert_eq!(aprs_cfg.passcode, 23719);
    }
}

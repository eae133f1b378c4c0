// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use js8_app::{init_logging, ConfigFile};
use js8_core::{Submode, BAND_FREQS_KHZ};
use js8_server::config::Js8ServerConfig;
use js8_server::control;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - ", env!("CARGO_PKG_DESCRIPTION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Process {
    Record,
    Decode,
    #[value(name = "rebuild-spots")]
    RebuildSpots,
    #[value(name = "rebuild-alldecodes")]
    RebuildAlldecodes,
    #[value(name = "rebuild-history")]
    RebuildHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
enum Action {
    Start,
    Stop,
    #[default]
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SubmodeArg {
    Turbo,
    Fast,
    Norm,
    Slow,
}

impl From<SubmodeArg> for Submode {
    fn from(s: SubmodeArg) -> Submode {
        match s {
            SubmodeArg::Turbo => Submode::Turbo,
            SubmodeArg::Fast => Submode::Fast,
            SubmodeArg::Norm => Submode::Norm,
            SubmodeArg::Slow => Submode::Slow,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = PKG_DESCRIPTION)]
struct Cli {
    /// What to run: record, decode, or one of the rebuild-* maintenance passes
    #[arg(value_enum)]
    process: Process,

    /// start/stop/status the named process (ignored by rebuild-* commands)
    #[arg(short = 'a', long = "action", default_value = "status", value_enum)]
    action: Action,

    /// Print rebuilt output to stdout instead of writing it in place
    #[arg(long = "print-only", alias = "po")]
    print_only: bool,

    /// Band centers to operate on, in kHz. Defaults to all configured bands.
    #[arg(short = 'f', long = "freq")]
    freqs_khz: Vec<u32>,

    /// Submodes to operate on. Defaults to all four.
    #[arg(long = "sub-mode", alias = "sm", value_enum)]
    sub_modes: Vec<SubmodeArg>,

    /// Radio mode passed through to the recorder (usb/lsb). Currently inert,
    /// kept for parity with the reference tool's CLI surface.
    #[arg(short = 'm', long = "mode", default_value = "usb")]
    mode: String,

    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,

    #[arg(long = "mcast-addr", alias = "ma")]
    mcast_addr: Option<String>,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    #[arg(long = "aprsis")]
    aprsis: bool,
    #[arg(long = "aprs-host")]
    aprs_host: Option<String>,
    #[arg(long = "aprs-port")]
    aprs_port: Option<u16>,
    #[arg(long = "aprs-user")]
    aprs_user: Option<String>,
    #[arg(long = "aprs-passcode")]
    aprs_passcode: Option<i32>,
    #[arg(long = "aprs-reporter")]
    aprs_reporter: Option<String>,

    /// Explicit config file path, bypassing the default search order
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

fn apply_overrides(cfg: &mut Js8ServerConfig, cli: &Cli) -> DynResult<()> {
    if let Some(dir) = &cli.data_dir {
        cfg.general.data_dir = dir.clone();
    }
    if let Some(mcast) = &cli.mcast_addr {
        cfg.general.mcast_addr = mcast.clone();
    }
    if cli.verbose {
        cfg.general.log_level = Some("debug".to_string());
    }

    if cli.aprsis {
        cfg.aprsis.enabled = true;
    }
    if let Some(host) = &cli.aprs_host {
        cfg.aprsis.host = host.clone();
    }
    if let Some(port) = cli.aprs_port {
        cfg.aprsis.port = port;
    }
    if let Some(user) = &cli.aprs_user {
        cfg.aprsis.user = user.clone();
    }
    if let Some(passcode) = cli.aprs_passcode {
        cfg.aprsis.passcode = passcode;
    }
    if let Some(reporter) = &cli.aprs_reporter {
        cfg.aprsis.reporter = reporter.clone();
    }

    if cfg.aprsis.enabled && (cfg.aprsis.user.is_empty() || cfg.aprsis.reporter.is_empty()) {
        return Err("--aprsis requires --aprs-user and --aprs-reporter (or their config-file equivalents)".into());
    }

    Ok(())
}

fn resolve_freqs(cli: &Cli) -> DynResult<Vec<u32>> {
    if cli.freqs_khz.is_empty() {
        return Ok(BAND_FREQS_KHZ.to_vec());
    }
    for &f in &cli.freqs_khz {
        if !js8_core::is_known_freq_khz(f) {
            return Err(format!("{f} kHz is not a configured band").into());
        }
    }
    Ok(cli.freqs_khz.clone())
}

fn resolve_submodes(cli: &Cli) -> Vec<Submode> {
    if cli.sub_modes.is_empty() {
        return Submode::ALL.to_vec();
    }
    cli.sub_modes.iter().map(|&s| s.into()).collect()
}

fn main() -> DynResult<()> {
    let cli = Cli::parse();

    let (mut cfg, found_at) = match &cli.config {
        Some(path) => (Js8ServerConfig::load_from_file(path)?, Some(path.clone())),
        None => Js8ServerConfig::load_from_default_paths()?,
    };

    init_logging(cfg.general.log_level.as_deref());
    if let Some(path) = &found_at {
        tracing::info!(config = %path.display(), "loaded configuration");
    } else {
        tracing::info!("no config file found, using defaults");
    }

    apply_overrides(&mut cfg, &cli)?;

    let freqs = resolve_freqs(&cli)?;
    let submodes = resolve_submodes(&cli);
    let items = control::work_items(&freqs, &submodes);

    match (cli.process, cli.action) {
        (Process::Record, Action::Start) => control::record_start(&cfg, &items)?,
        (Process::Record, Action::Stop) => control::record_stop(&cfg)?,
        (Process::Record, Action::Status) => {
            for (rec, alive) in control::record_status(&cfg)? {
                println!("{} {} {:?} alive={}", rec.freq_khz, rec.submode, rec.pid, alive);
            }
        }
        (Process::Decode, Action::Start) => control::decode_start(&cfg, items)?,
        (Process::Decode, Action::Stop) => control::decode_stop(&cfg)?,
        (Process::Decode, Action::Status) => match control::decode_status(&cfg)? {
            Some((pid, alive)) => println!("pid={} timestamp={} alive={}", pid.pid, pid.timestamp, alive),
            None => println!("no decoder running"),
        },
        (Process::RebuildSpots, _) => control::rebuild_spots(&cfg, &items, cli.print_only)?,
        (Process::RebuildAlldecodes, _) => control::rebuild_alldecodes(&cfg, &items, cli.print_only)?,
        (Process::RebuildHistory, _) => control::rebuild_history(&cfg, &items, cli.print_only)?,
    }

    let _ = cli.mode;
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-crate model of a decoded JS8 frame.
//!
//! JS8's frame text carries a class tag and a small set of
//! class-dependent fields. No published crate decodes this text, so the
//! frame shape and its textual encoding are modeled here directly rather
//! than wrapping an external decoder.

use serde::{Deserialize, Serialize};

/// JS8 frame class, with the fields each class can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Js8Frame {
    Heartbeat(HeartbeatFields),
    Compound(CompoundFields),
    CompoundDirected(CompoundDirectedFields),
    Directed(DirectedFields),
    Data(DataFields),
    DataCompressed(DataFields),
}

impl Js8Frame {
    pub fn class_name(&self) -> &'static str {
        match self {
            Js8Frame::Heartbeat(_) => "Heartbeat",
            Js8Frame::Compound(_) => "Compound",
            Js8Frame::CompoundDirected(_) => "CompoundDirected",
            Js8Frame::Directed(_) => "Directed",
            Js8Frame::Data(_) => "Data",
            Js8Frame::DataCompressed(_) => "DataCompressed",
        }
    }

    pub fn thread_type(&self) -> u8 {
        match self {
            Js8Frame::Heartbeat(f) => f.thread_type,
            Js8Frame::Compound(f) => f.thread_type,
            Js8Frame::CompoundDirected(f) => f.thread_type,
            Js8Frame::Directed(f) => f.thread_type,
            Js8Frame::Data(f) => f.thread_type,
            Js8Frame::DataCompressed(f) => f.thread_type,
        }
    }

    pub fn offset_hz(&self) -> i64 {
        match self {
            Js8Frame::Heartbeat(f) => f.offset_hz,
            Js8Frame::Compound(f) => f.offset_hz,
            Js8Frame::CompoundDirected(f) => f.offset_hz,
            Js8Frame::Directed(f) => f.offset_hz,
            Js8Frame::Data(f) => f.offset_hz,
            Js8Frame::DataCompressed(f) => f.offset_hz,
        }
    }

    pub fn db(&self) -> f32 {
        match self {
            Js8Frame::Heartbeat(f) => f.db,
            Js8Frame::Compound(f) => f.db,
            Js8Frame::CompoundDirected(f) => f.db,
            Js8Frame::Directed(f) => f.db,
            Js8Frame::Data(f) => f.db,
            Js8Frame::DataCompressed(f) => f.db,
        }
    }

    pub fn dt(&self) -> f32 {
        match self {
            Js8Frame::Heartbeat(f) => f.dt,
            Js8Frame::Compound(f) => f.dt,
            Js8Frame::CompoundDirected(f) => f.dt,
            Js8Frame::Directed(f) => f.dt,
            Js8Frame::Data(f) => f.dt,
            Js8Frame::DataCompressed(f) => f.dt,
        }
    }

    pub fn callsign(&self) -> Option<&str> {
        match self {
            Js8Frame::Heartbeat(f) => f.callsign.as_deref(),
            Js8Frame::Compound(f) => f.callsign_from.as_deref(),
            Js8Frame::CompoundDirected(f) => f.callsign_from.as_deref(),
            Js8Frame::Directed(f) => f.callsign.as_deref(),
            Js8Frame::Data(_) | Js8Frame::DataCompressed(_) => None,
        }
    }

    pub fn callsign_to(&self) -> Option<&str> {
        match self {
            Js8Frame::Directed(f) => f.callsign_to.as_deref(),
            Js8Frame::CompoundDirected(f) => f.callsign_to.as_deref(),
            _ => None,
        }
    }

    pub fn grid(&self) -> Option<&str> {
        match self {
            Js8Frame::Heartbeat(f) => f.grid.as_deref(),
            Js8Frame::Compound(f) => f.grid.as_deref(),
            _ => None,
        }
    }

    pub fn msg(&self) -> Option<&str> {
        match self {
            Js8Frame::Directed(f) => Some(f.cmd.as_str()),
            Js8Frame::Data(f) => Some(f.text.as_str()),
            Js8Frame::DataCompressed(f) => Some(f.text.as_str()),
            Js8Frame::CompoundDirected(f) => f.text.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatFields {
    pub thread_type: u8,
    pub offset_hz: i64,
    pub db: f32,
    pub dt: f32,
    pub callsign: Option<String>,
    pub grid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundFields {
    pub thread_type: u8,
    pub offset_hz: i64,
    pub db: f32,
    pub dt: f32,
    pub callsign_from: Option<String>,
    pub grid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundDirectedFields {
    pub thread_type: u8,
    pub offset_hz: i64,
    pub db: f32,
    pub dt: f32,
    pub callsign_from: Option<String>,
    pub callsign_to: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectedFields {
    pub thread_type: u8,
    pub offset_hz: i64,
    pub db: f32,
    pub dt: f32,
    pub callsign: Option<String>,
    pub callsign_to: Option<String>,
    pub cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFields {
    pub thread_type: u8,
    pub offset_hz: i64,
    pub db: f32,
    pub dt: f32,
    pub text: String,
}

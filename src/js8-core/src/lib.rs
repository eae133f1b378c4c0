// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod bands;
pub mod decode_file;
pub mod frame;
pub mod jsframe;
pub mod model;
pub mod parser;
pub mod reassembler;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use bands::{is_known_freq_khz, ssrc_for_freq_khz, Submode, BAND_FREQS_KHZ, BAND_SSRC};
pub use decode_file::{process_decode_file, DecodeFileError};
pub use frame::Js8Frame;
pub use model::{ActivityRecord, CallsignRecord, FrameRecord};
pub use parser::{FrameParser, ParseError};
pub use reassembler::{AprsDispatch, FrameReassembler};

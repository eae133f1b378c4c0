// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Fixed band and submode tables.
//!
//! These are process-constant configuration data, not computed values —
//! in particular `BAND_SSRC` diverges from `BAND_FREQS_KHZ` at 18104 kHz
//! (the stream identifier there is 18106), which must be preserved as a
//! table lookup rather than derived from the dial frequency.

use std::fmt;

/// JS8 band centers, in kHz, that this pipeline knows how to tune.
pub const BAND_FREQS_KHZ: &[u32] = &[
    1842, 3578, 7078, 10130, 14078, 18104, 21078, 24922, 28078, 27246,
];

/// RTP SSRC per band, indices parallel to [`BAND_FREQS_KHZ`].
pub const BAND_SSRC: &[u32] = &[
    1842, 3578, 7078, 10130, 14078, 18106, 21078, 24922, 28078, 27246,
];

/// Frequencies for which per-line validation is skipped entirely.
pub const IGNORE_VALIDATION_FREQS_KHZ: &[u32] = &[27246];

/// Look up the SSRC for a band center, in kHz.
pub fn ssrc_for_freq_khz(freq_khz: u32) -> Option<u32> {
    BAND_FREQS_KHZ
        .iter()
        .position(|&f| f == freq_khz)
        .map(|idx| BAND_SSRC[idx])
}

pub fn is_known_freq_khz(freq_khz: u32) -> bool {
    BAND_FREQS_KHZ.contains(&freq_khz)
}

/// A JS8 submode: recording duration and demodulator code letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Submode {
    Turbo,
    Fast,
    Norm,
    Slow,
}

impl Submode {
    pub const ALL: [Submode; 4] = [Submode::Turbo, Submode::Fast, Submode::Norm, Submode::Slow];

    /// Single-letter code passed to the demodulator via `-b`.
    pub const fn code(self) -> char {
        match self {
            Submode::Turbo => 'C',
            Submode::Fast => 'B',
            Submode::Norm => 'A',
            Submode::Slow => 'E',
        }
    }

    /// Recording duration for one cycle, in seconds.
    pub const fn duration_secs(self) -> u32 {
        match self {
            Submode::Turbo => 6,
            Submode::Fast => 10,
            Submode::Norm => 15,
            Submode::Slow => 30,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Submode::Turbo => "turbo",
            Submode::Fast => "fast",
            Submode::Norm => "norm",
            Submode::Slow => "slow",
        }
    }

    pub fn parse(s: &str) -> Option<Submode> {
        match s.to_ascii_lowercase().as_str() {
            "turbo" => Some(Submode::Turbo),
            "fast" => Some(Submode::Fast),
            "norm" => Some(Submode::Norm),
            "slow" => Some(Submode::Slow),
            _ => None,
        }
    }
}

impl fmt::Display for Submode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssrc_diverges_on_18104() {
        assert_eq!(ssrc_for_freq_khz(18104), Some(18106));
        assert_eq!(ssrc_for_freq_khz(7078), Some(7078));
        assert_eq!(ssrc_for_freq_khz(99999), None);
    }

    #[test]
    fn submode_codes() {
        assert_eq!(Submode::Turbo.code(), 'C');
        assert_eq!(Submode::Slow.duration_secs(), 30);
        assert_eq!(Submode::parse("FAST"), Some(Submode::Fast));
        assert_eq!(Submode::parse("bogus"), None);
    }
}

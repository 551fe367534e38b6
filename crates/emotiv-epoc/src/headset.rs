//! # Headset Constants & Electrode Layout
//!
//! Provides [`Electrode`] for the 14 EPOC electrode positions and the ADC
//! parameters of the raw stream.
//!
//! | Property | Value |
//! |----------|-------|
//! | Channels | 14 |
//! | Sample rate | 128 Hz (2048 Hz internal) |
//! | Resolution | 14 bits, 0.51 µV per code |
//!
//! Electrodes are listed in the order their samples appear inside a decoded
//! frame, which is not the same as the Cortex API column order.
//!
//! ```
//! use emotiv_epoc::headset::Electrode;
//!
//! let e: Electrode = "FC5".parse().unwrap();
//! assert_eq!(e, Electrode::Fc5);
//! assert_eq!(e.index(), 1);
//! assert_eq!(e.to_string(), "FC5");
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EpocError;

/// Number of EEG channels carried by each data frame.
pub const NUM_CHANNELS: usize = 14;

/// Output sampling rate in Hz.
pub const SAMPLING_RATE_HZ: f64 = 128.0;

/// ADC resolution in bits.
pub const RESOLUTION_BITS: u32 = 14;

/// Largest ADC code a channel can carry.
pub const MAX_CODE: u16 = (1 << RESOLUTION_BITS) - 1;

/// Microvolts per ADC code.
pub const MICROVOLTS_PER_CODE: f64 = 0.51;

/// One of the 14 EPOC electrode positions (10-20 system names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Electrode {
    #[serde(rename = "F3")]
    F3,
    #[serde(rename = "FC5")]
    Fc5,
    #[serde(rename = "AF3")]
    Af3,
    #[serde(rename = "F7")]
    F7,
    #[serde(rename = "T7")]
    T7,
    #[serde(rename = "P7")]
    P7,
    #[serde(rename = "O1")]
    O1,
    #[serde(rename = "O2")]
    O2,
    #[serde(rename = "P8")]
    P8,
    #[serde(rename = "T8")]
    T8,
    #[serde(rename = "F8")]
    F8,
    #[serde(rename = "AF4")]
    Af4,
    #[serde(rename = "FC6")]
    Fc6,
    #[serde(rename = "F4")]
    F4,
}

impl Electrode {
    /// All electrodes, in frame order.
    pub const ALL: [Electrode; NUM_CHANNELS] = [
        Electrode::F3,
        Electrode::Fc5,
        Electrode::Af3,
        Electrode::F7,
        Electrode::T7,
        Electrode::P7,
        Electrode::O1,
        Electrode::O2,
        Electrode::P8,
        Electrode::T8,
        Electrode::F8,
        Electrode::Af4,
        Electrode::Fc6,
        Electrode::F4,
    ];

    /// Position of this electrode's sample inside a data frame.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Standard 10-20 name, e.g. `"AF3"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Electrode::F3 => "F3",
            Electrode::Fc5 => "FC5",
            Electrode::Af3 => "AF3",
            Electrode::F7 => "F7",
            Electrode::T7 => "T7",
            Electrode::P7 => "P7",
            Electrode::O1 => "O1",
            Electrode::O2 => "O2",
            Electrode::P8 => "P8",
            Electrode::T8 => "T8",
            Electrode::F8 => "F8",
            Electrode::Af4 => "AF4",
            Electrode::Fc6 => "FC6",
            Electrode::F4 => "F4",
        }
    }
}

impl FromStr for Electrode {
    type Err = EpocError;

    /// Parse one of the 14 10-20 names, exactly as written (`"F3"`, `"AF4"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Electrode::ALL
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| EpocError::UnknownElectrode { name: s.to_string() })
    }
}

impl std::fmt::Display for Electrode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a raw ADC code to microvolts, without any channel offset.
#[must_use]
pub fn to_microvolts(code: u16) -> f64 {
    f64::from(code) * MICROVOLTS_PER_CODE
}

//! # Lookup Tables
//!
//! Two per-session tables consulted by the frame decoder:
//!
//! - [`ContactQualityTable`]: which electrode the quality field of a data
//!   frame belongs to, indexed by the frame counter. The headset reports
//!   contact quality round-robin, one electrode per frame.
//! - [`BatteryTable`]: raw battery code to percentage, for battery frames.
//!
//! Both schedules come from the community reverse engineering of the EPOC
//! protocol (emokit). Counters 81–127 of the quality schedule have not been
//! verified against hardware.

use crate::error::{EpocError, EpocResult};
use crate::headset::Electrode;

/// Number of distinct counter values in a data frame.
pub const COUNTER_CYCLE: usize = 128;

/// Quality schedule for counters 0–15, repeated at 64–79.
const QUALITY_HEAD: [Electrode; 16] = [
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
    Electrode::F8,
    Electrode::Af4,
];

/// Counters 16–63 carry no known electrode.
const UNSET_RUN: usize = 48;

/// Entries 77–80 repeat this many times after entry 80.
const TAIL_REPEATS: usize = 12;

/// Counter → electrode schedule for contact quality updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactQualityTable {
    entries: [Option<Electrode>; COUNTER_CYCLE],
}

impl ContactQualityTable {
    /// Build the 128-entry schedule.
    #[must_use]
    pub fn new() -> Self {
        let mut schedule: Vec<Option<Electrode>> = Vec::with_capacity(COUNTER_CYCLE + 4);
        schedule.extend(QUALITY_HEAD.iter().copied().map(Some));
        schedule.extend(std::iter::repeat_n(None, UNSET_RUN));
        schedule.extend(QUALITY_HEAD.iter().copied().map(Some));
        schedule.push(Some(Electrode::Fc6));

        let tail: Vec<Option<Electrode>> = schedule[schedule.len() - 4..].to_vec();
        for _ in 0..TAIL_REPEATS {
            schedule.extend_from_slice(&tail);
        }

        let mut entries = [None; COUNTER_CYCLE];
        for (slot, entry) in entries.iter_mut().zip(schedule) {
            *slot = entry;
        }
        Self { entries }
    }

    /// Electrode scheduled for `counter`, or `None` for an unset slot.
    #[must_use]
    pub fn lookup(&self, counter: u8) -> Option<Electrode> {
        self.entries[usize::from(counter) % COUNTER_CYCLE]
    }

    /// Number of entries (always 128).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All entries in counter order.
    #[must_use]
    pub fn entries(&self) -> &[Option<Electrode>] {
        &self.entries
    }
}

impl Default for ContactQualityTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-linear part of the discharge curve, codes 226–247.
const BATTERY_CURVE: [(u8, u8); 22] = [
    (247, 99),
    (246, 97),
    (245, 93),
    (244, 89),
    (243, 85),
    (242, 82),
    (241, 77),
    (240, 72),
    (239, 66),
    (238, 62),
    (237, 55),
    (236, 46),
    (235, 32),
    (234, 20),
    (233, 12),
    (232, 6),
    (231, 4),
    (230, 3),
    (229, 2),
    (228, 1),
    (227, 1),
    (226, 1),
];

/// Raw battery code → percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryTable {
    levels: [Option<u8>; 256],
}

impl BatteryTable {
    /// Build the table: 128–225 → 0 %, 226–247 → curve, 248–255 → 100 %.
    #[must_use]
    pub fn new() -> Self {
        let mut levels = [None; 256];
        for code in 128..=225usize {
            levels[code] = Some(0);
        }
        for (code, percent) in BATTERY_CURVE {
            levels[usize::from(code)] = Some(percent);
        }
        for code in 248..=255usize {
            levels[code] = Some(100);
        }
        Self { levels }
    }

    /// Battery percentage for a raw code.
    ///
    /// # Errors
    /// Returns [`EpocError::UnknownBatteryCode`] for codes below 128, which
    /// cannot appear in a battery frame.
    pub fn lookup(&self, code: u8) -> EpocResult<u8> {
        self.levels[usize::from(code)].ok_or(EpocError::UnknownBatteryCode { code })
    }
}

impl Default for BatteryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_table_length() {
        let table = ContactQualityTable::new();
        assert_eq!(table.len(), 128);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_quality_head_repeats_at_64() {
        let table = ContactQualityTable::new();
        assert_eq!(table.entries()[0..16], table.entries()[64..80]);
        assert_eq!(table.lookup(0), Some(Electrode::F3));
        assert_eq!(table.lookup(14), Some(Electrode::F8));
        assert_eq!(table.lookup(15), Some(Electrode::Af4));
    }

    #[test]
    fn test_quality_unset_run() {
        let table = ContactQualityTable::new();
        assert!(table.entries()[16..64].iter().all(Option::is_none));
    }

    #[test]
    fn test_quality_entry_80_and_tail() {
        let table = ContactQualityTable::new();
        assert_eq!(table.lookup(80), Some(Electrode::Fc6));

        // 77..=79 are head entries 13..=15.
        let tail = [
            Some(Electrode::F4),
            Some(Electrode::F8),
            Some(Electrode::Af4),
            Some(Electrode::Fc6),
        ];
        assert_eq!(table.entries()[77..81], tail);
        for counter in 81..128u8 {
            let expected = tail[(usize::from(counter) - 81) % 4];
            assert_eq!(table.lookup(counter), expected, "counter {counter}");
        }
    }

    #[test]
    fn test_quality_lookup_wraps() {
        let table = ContactQualityTable::new();
        assert_eq!(table.lookup(128), table.lookup(0));
        assert_eq!(table.lookup(255), table.lookup(127));
    }

    #[test]
    fn test_battery_known_values() {
        let table = BatteryTable::new();
        assert_eq!(table.lookup(247).unwrap(), 99);
        assert_eq!(table.lookup(226).unwrap(), 1);
        assert_eq!(table.lookup(250).unwrap(), 100);
        assert_eq!(table.lookup(200).unwrap(), 0);
        assert_eq!(table.lookup(128).unwrap(), 0);
        assert_eq!(table.lookup(225).unwrap(), 0);
        assert_eq!(table.lookup(248).unwrap(), 100);
        assert_eq!(table.lookup(255).unwrap(), 100);
        assert_eq!(table.lookup(236).unwrap(), 46);
    }

    #[test]
    fn test_battery_curve_is_monotonic() {
        let table = BatteryTable::new();
        let levels: Vec<u8> = (226..=247u8).map(|c| table.lookup(c).unwrap()).collect();
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_battery_unknown_code() {
        let table = BatteryTable::new();
        for code in [0u8, 1, 64, 127] {
            assert!(matches!(
                table.lookup(code),
                Err(EpocError::UnknownBatteryCode { code: c }) if c == code
            ));
        }
    }
}

//! Per-session decoded state: battery level, per-electrode contact quality,
//! the latest signal and gyro reading, and packet loss accounting.

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::decoder::{DataSample, Sample};
use crate::headset::{Electrode, NUM_CHANNELS};
use crate::tables::COUNTER_CYCLE;

/// Last contact quality value received for each electrode.
///
/// Serializes as a map from electrode name to value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityMap([u16; NUM_CHANNELS]);

impl QualityMap {
    /// Quality value for one electrode (0 until the first update).
    #[must_use]
    pub fn get(&self, electrode: Electrode) -> u16 {
        self.0[electrode.index()]
    }

    fn set(&mut self, electrode: Electrode, value: u16) {
        self.0[electrode.index()] = value;
    }

    /// `(electrode, value)` pairs in frame order.
    pub fn iter(&self) -> impl Iterator<Item = (Electrode, u16)> + '_ {
        Electrode::ALL.iter().map(|&e| (e, self.get(e)))
    }
}

impl Serialize for QualityMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_CHANNELS))?;
        for (electrode, value) in self.iter() {
            map.serialize_entry(electrode.name(), &value)?;
        }
        map.end()
    }
}

/// Complete decoded state after one frame, as published to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// The frame that produced this snapshot.
    pub sample: Sample,
    /// Latest channel codes (unchanged by battery frames).
    pub signal: [u16; NUM_CHANNELS],
    /// Latest centred gyro reading.
    pub gyro: (i16, i16),
    /// Latest battery percentage.
    pub battery_percent: u8,
    /// Latest contact quality per electrode.
    pub quality: QualityMap,
    /// Data frames skipped by the counter since the session started.
    pub lost_frames: u64,
}

/// Long-lived state mutated by every decoded frame.
#[derive(Debug, Clone, Default)]
pub struct HeadsetState {
    battery_percent: u8,
    quality: QualityMap,
    signal: [u16; NUM_CHANNELS],
    gyro: (i16, i16),
    gyro_baseline: (i16, i16),
    last_counter: Option<u8>,
    lost_frames: u64,
}

impl HeadsetState {
    /// Fresh state: battery 0 %, quality 0 for every electrode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded frame.
    ///
    /// Battery frames only touch the battery level; data frames never do.
    pub fn apply(&mut self, sample: &Sample) {
        match sample {
            Sample::Battery { percent, .. } => self.battery_percent = *percent,
            Sample::Data(data) => self.apply_data(data),
        }
    }

    fn apply_data(&mut self, data: &DataSample) {
        if let Some(update) = data.quality {
            self.quality.set(update.electrode, update.value);
        }
        self.signal = data.channels;
        self.gyro = (data.gyro_x, data.gyro_y);
        self.track_counter(data.counter);
    }

    fn track_counter(&mut self, counter: u8) {
        if let Some(prev) = self.last_counter {
            let cycle = COUNTER_CYCLE as u64;
            let expected = (u64::from(prev) + 1) % cycle;
            let gap = (u64::from(counter) + cycle - expected) % cycle;
            if gap > 0 {
                self.lost_frames += gap;
                tracing::debug!(prev, counter, gap, "Counter gap, frames lost");
            }
        }
        self.last_counter = Some(counter);
    }

    /// Apply a frame and capture the resulting snapshot.
    pub fn apply_and_snapshot(&mut self, sample: Sample) -> Snapshot {
        self.apply(&sample);
        Snapshot {
            sample,
            signal: self.signal,
            gyro: self.gyro,
            battery_percent: self.battery_percent,
            quality: self.quality,
            lost_frames: self.lost_frames,
        }
    }

    /// Adopt the state carried by a published snapshot.
    pub fn absorb(&mut self, snapshot: &Snapshot) {
        self.battery_percent = snapshot.battery_percent;
        self.quality = snapshot.quality;
        self.signal = snapshot.signal;
        self.gyro = snapshot.gyro;
        self.lost_frames = snapshot.lost_frames;
        if let Sample::Data(data) = &snapshot.sample {
            self.last_counter = Some(data.counter);
        }
    }

    /// Latest battery percentage.
    #[must_use]
    pub fn battery_percent(&self) -> u8 {
        self.battery_percent
    }

    /// Latest quality per electrode.
    #[must_use]
    pub fn quality(&self) -> &QualityMap {
        &self.quality
    }

    /// Latest channel codes.
    #[must_use]
    pub fn signal(&self) -> &[u16; NUM_CHANNELS] {
        &self.signal
    }

    /// Latest centred gyro reading.
    #[must_use]
    pub fn gyro(&self) -> (i16, i16) {
        self.gyro
    }

    /// Record the current gyro reading as the resting baseline.
    pub fn calibrate_gyro(&mut self) {
        self.gyro_baseline = self.gyro;
    }

    /// Latest gyro reading relative to the calibrated baseline.
    #[must_use]
    pub fn calibrated_gyro(&self) -> (i16, i16) {
        (
            self.gyro.0 - self.gyro_baseline.0,
            self.gyro.1 - self.gyro_baseline.1,
        )
    }

    /// Counter of the last data frame.
    #[must_use]
    pub fn last_counter(&self) -> Option<u8> {
        self.last_counter
    }

    /// Data frames skipped by the counter.
    #[must_use]
    pub fn lost_frames(&self) -> u64 {
        self.lost_frames
    }
}

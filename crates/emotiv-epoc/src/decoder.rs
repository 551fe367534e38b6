//! # Frame Decoder
//!
//! [`FrameDecoder`] classifies a plaintext frame by its battery flag and
//! extracts every field of the frame kind. Decoding is pure: the decoder
//! owns only the two lookup tables, and applying a decoded sample to
//! per-session state is the job of [`HeadsetState`](crate::state::HeadsetState).

use serde::Serialize;

use crate::error::{EpocError, EpocResult};
use crate::frame::{CHANNELS, COUNTER, FRAME_LEN, GYRO_BIAS, GYRO_X, GYRO_Y, PlaintextFrame, QUALITY};
use crate::headset::{Electrode, NUM_CHANNELS};
use crate::tables::{BatteryTable, ContactQualityTable};

/// One contact quality reading, attributed via the counter schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityUpdate {
    pub electrode: Electrode,
    /// Raw 14-bit quality value (0–16383).
    pub value: u16,
}

/// Payload of a data frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSample {
    /// Cyclic frame counter, 0–127.
    pub counter: u8,
    /// Raw 14-bit ADC codes in electrode order (see [`Electrode::ALL`]).
    pub channels: [u16; NUM_CHANNELS],
    /// Gyro X, centred on zero.
    pub gyro_x: i16,
    /// Gyro Y, centred on zero.
    pub gyro_y: i16,
    /// Quality reading, if this counter is scheduled for an electrode.
    pub quality: Option<QualityUpdate>,
}

impl DataSample {
    /// Code of a single channel.
    #[must_use]
    pub fn channel(&self, electrode: Electrode) -> u16 {
        self.channels[electrode.index()]
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Sample {
    /// Battery frame: no channel, gyro, or quality data.
    Battery {
        /// Raw byte from the frame (128–255).
        code: u8,
        /// Battery charge, 0–100.
        percent: u8,
    },
    /// Data frame.
    Data(DataSample),
}

impl Sample {
    /// The data payload, if this is a data frame.
    #[must_use]
    pub fn as_data(&self) -> Option<&DataSample> {
        match self {
            Sample::Data(data) => Some(data),
            Sample::Battery { .. } => None,
        }
    }

    /// The battery percentage, if this is a battery frame.
    #[must_use]
    pub fn battery_percent(&self) -> Option<u8> {
        match self {
            Sample::Battery { percent, .. } => Some(*percent),
            Sample::Data(_) => None,
        }
    }
}

/// Stateless decoder for plaintext frames.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    quality_table: ContactQualityTable,
    battery_table: BatteryTable,
}

impl FrameDecoder {
    /// Build a decoder with freshly constructed lookup tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }


    /// Decode one plaintext frame.
    ///
    /// # Errors
    /// Returns [`EpocError::UnknownBatteryCode`] if a battery frame carries a
    /// code missing from the battery table.
    pub fn decode(&self, frame: &PlaintextFrame) -> EpocResult<Sample> {
        let head = low_byte(frame.read(COUNTER));

        if frame.is_battery() {
            let percent = self.battery_table.lookup(head)?;
            return Ok(Sample::Battery {
                code: head,
                percent,
            });
        }

        let quality = self
            .quality_table
            .lookup(head)
            .map(|electrode| QualityUpdate {
                electrode,
                value: frame.read(QUALITY),
            });

        let mut channels = [0u16; NUM_CHANNELS];
        for (code, field) in channels.iter_mut().zip(CHANNELS) {
            *code = frame.read(field);
        }

        Ok(Sample::Data(DataSample {
            counter: head,
            channels,
            gyro_x: centre_gyro(frame.read(GYRO_X)),
            gyro_y: centre_gyro(frame.read(GYRO_Y)),
            quality,
        }))
    }

    /// Decode a frame given as a byte slice.
    ///
    /// # Errors
    /// Returns [`EpocError::FrameLength`] if `bytes` is not 32 bytes long, or
    /// any error of [`decode`](Self::decode).
    pub fn decode_bytes(&self, bytes: &[u8]) -> EpocResult<Sample> {
        let buf = <[u8; FRAME_LEN]>::try_from(bytes)
            .map_err(|_| EpocError::FrameLength { len: bytes.len() })?;
        self.decode(&PlaintextFrame::new(buf))
    }
}

fn low_byte(value: u16) -> u8 {
    value.to_be_bytes()[1]
}

fn centre_gyro(raw: u16) -> i16 {
    // Gyro fields are at most 8 bits wide, so the cast is lossless.
    i16::try_from(raw).unwrap_or(i16::MAX) - GYRO_BIAS
}

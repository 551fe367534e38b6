//! # Key Derivation
//!
//! The EPOC dongle encrypts every frame with AES-128. The key is not secret
//! material exchanged with the device: it is built from the last four bytes
//! of the dongle's USB serial string interleaved with eight constant bytes,
//! and the interleave differs between research and consumer headsets.
//!
//! ```
//! use emotiv_epoc::key::{DeviceMode, SerialNumber, derive_key};
//!
//! let serial = SerialNumber::new(b"123456789ABCDEF0").unwrap();
//! let key = derive_key(&serial, DeviceMode::Research);
//! assert_eq!(key.as_bytes()[0], b'0');
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EpocError, EpocResult};

/// Length of a serial identifier in bytes.
pub const SERIAL_LEN: usize = 16;

/// Length of the AES-128 frame key in bytes.
pub const KEY_LEN: usize = 16;

/// Headset variant, which selects the key interleave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// Research edition (the default for the original SDK headsets).
    #[default]
    Research,
    /// Consumer edition.
    Consumer,
}

impl std::str::FromStr for DeviceMode {
    type Err = EpocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "research" => Ok(DeviceMode::Research),
            "consumer" => Ok(DeviceMode::Consumer),
            other => Err(EpocError::ConfigError {
                reason: format!("unknown device mode '{other}' (expected 'research' or 'consumer')"),
            }),
        }
    }
}

impl std::fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceMode::Research => f.write_str("research"),
            DeviceMode::Consumer => f.write_str("consumer"),
        }
    }
}

/// A dongle serial identifier, captured once at session setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialNumber([u8; SERIAL_LEN]);

impl SerialNumber {
    /// Capture a serial identifier.
    ///
    /// Inputs longer than 16 bytes keep their first 16 bytes.
    ///
    /// # Errors
    /// Returns [`EpocError::InvalidSerial`] if `bytes` is shorter than 16 bytes.
    pub fn new(bytes: impl AsRef<[u8]>) -> EpocResult<Self> {
        let bytes = bytes.as_ref();
        let head = bytes
            .get(..SERIAL_LEN)
            .ok_or(EpocError::InvalidSerial { len: bytes.len() })?;
        let mut serial = [0u8; SERIAL_LEN];
        serial.copy_from_slice(head);
        Ok(Self(serial))
    }

    /// Raw serial bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SERIAL_LEN] {
        &self.0
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A derived AES-128 frame key.
///
/// `Debug` never prints the key bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FrameKey([u8; KEY_LEN]);

impl FrameKey {
    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for FrameKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FrameKey(..)")
    }
}

/// Serial positions consumed by the interleave, in key order.
const SERIAL_TAIL: [usize; 4] = [15, 14, 13, 12];

/// Constant bytes at the odd key positions, research edition.
const RESEARCH_CONSTANTS: [u8; 8] = [0x00, 0x54, 0x10, 0x42, 0x00, 0x48, 0x00, 0x50];

/// Constant bytes at the odd key positions, consumer edition.
const CONSUMER_CONSTANTS: [u8; 8] = [0x00, 0x48, 0x00, 0x54, 0x10, 0x42, 0x00, 0x50];

/// Derive the frame key for a serial and device mode.
///
/// Even key positions hold serial bytes 15, 14, 13, 12, 15, 14, 13, 12; odd
/// positions hold the mode's constants.
#[must_use]
pub fn derive_key(serial: &SerialNumber, mode: DeviceMode) -> FrameKey {
    let constants = match mode {
        DeviceMode::Research => &RESEARCH_CONSTANTS,
        DeviceMode::Consumer => &CONSUMER_CONSTANTS,
    };

    let mut key = [0u8; KEY_LEN];
    for (i, pair) in key.chunks_exact_mut(2).enumerate() {
        pair[0] = serial.0[SERIAL_TAIL[i % SERIAL_TAIL.len()]];
        pair[1] = constants[i];
    }
    FrameKey(key)
}

/// Derive a frame key directly from raw serial bytes.
///
/// # Errors
/// Returns [`EpocError::InvalidSerial`] if `serial` is shorter than 16 bytes.
pub fn derive_key_from_bytes(serial: impl AsRef<[u8]>, mode: DeviceMode) -> EpocResult<FrameKey> {
    Ok(derive_key(&SerialNumber::new(serial)?, mode))
}

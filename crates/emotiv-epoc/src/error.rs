//! # Error Types
//!
//! Semantic error types for the EPOC raw stream decoder. Every variant carries
//! enough context to tell "the headset is off" apart from a generic I/O fault.
//!
//! ## Error Classes
//!
//! | Class | Variants | Effect on the acquisition loop |
//! |-------|----------|--------------------------------|
//! | Setup | `InvalidSerial`, `ConfigError`, `UnknownElectrode` | The call fails, no session state changes |
//! | Per-frame | `FrameLength`, `UnknownBatteryCode` | The frame is dropped, the loop continues |
//! | Per-read | `TransportTimeout` | Treated as "no data yet" |
//! | Terminal | `DeviceOff`, `Transport`, `EndOfStream`, `ProducerStopped`, `SessionClosed` | The loop stops |
//!
//! [`EpocError::from_transport_code`] maps transport status codes to the
//! most specific variant.

use thiserror::Error;

/// Convenient Result alias for EPOC operations.
pub type EpocResult<T> = std::result::Result<T, EpocError>;

/// Transport status codes that mean the headset went away.
///
/// - `110`: ETIMEDOUT reported by the dongle on a blocking read, which is how
///   it signals that the headset is powered off.
/// - `19`: ENODEV.
/// - `-4`: `LIBUSB_ERROR_NO_DEVICE`.
pub const DEVICE_OFF_CODES: &[i32] = &[110, 19, -4];

/// `LIBUSB_ERROR_TIMEOUT`: the read timed out, which is not fatal.
pub const TIMEOUT_CODE: i32 = -7;

/// All errors produced while decoding an EPOC stream.
#[derive(Error, Debug)]
pub enum EpocError {
    // ─── Setup ──────────────────────────────────────────────────────
    /// The serial identifier is too short for key derivation.
    #[error("Invalid serial identifier: expected at least 16 bytes, got {len}")]
    InvalidSerial { len: usize },

    /// The requested electrode is not one of the 14 EPOC electrodes.
    #[error("Unknown electrode '{name}'. Valid names: F3, FC5, AF3, F7, T7, P7, O1, O2, P8, T8, F8, AF4, FC6, F4")]
    UnknownElectrode { name: String },

    // ─── Frame ──────────────────────────────────────────────────────
    /// A frame did not have the fixed 32-byte length.
    #[error("Malformed frame: expected 32 bytes, got {len}")]
    FrameLength { len: usize },

    /// A battery frame carried a raw value outside the battery table.
    #[error("Unknown battery code {code:#04x}")]
    UnknownBatteryCode { code: u8 },

    // ─── Transport ──────────────────────────────────────────────────
    /// The read timed out before a frame arrived.
    #[error("Transport read timed out after {millis}ms")]
    TransportTimeout { millis: u64 },

    /// The transport reported that the headset is switched off or gone.
    #[error("Headset is off or disconnected (transport code {code}). Make sure the headset is turned on.")]
    DeviceOff { code: i32 },

    /// Any other transport failure.
    #[error("Transport error {code}")]
    Transport { code: i32 },

    /// The frame source has no more frames (end of a capture file).
    #[error("End of frame stream")]
    EndOfStream,

    // ─── Acquisition ────────────────────────────────────────────────
    /// Acquisition has stopped: after a terminal transport error that was
    /// already reported, by request, or because the producer panicked.
    #[error("Acquisition stopped")]
    ProducerStopped,

    /// The session was shut down and no longer reads frames.
    #[error("Session has been shut down")]
    SessionClosed,

    // ─── Config ─────────────────────────────────────────────────────
    /// Configuration file error (missing, malformed, or invalid values).
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    // ─── I/O ────────────────────────────────────────────────────────
    /// Filesystem or stream I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EpocError {
    /// Map a transport status code to the most specific error variant.
    ///
    /// [`TIMEOUT_CODE`] becomes [`EpocError::TransportTimeout`] with an
    /// unknown elapsed time (`millis: 0`). Codes listed in
    /// [`DEVICE_OFF_CODES`] become [`EpocError::DeviceOff`]. Any other code
    /// becomes [`EpocError::Transport`].
    #[must_use]
    pub fn from_transport_code(code: i32) -> Self {
        if code == TIMEOUT_CODE {
            EpocError::TransportTimeout { millis: 0 }
        } else if DEVICE_OFF_CODES.contains(&code) {
            EpocError::DeviceOff { code }
        } else {
            EpocError::Transport { code }
        }
    }

    /// Returns `true` if this error only affects a single frame, which is
    /// dropped while acquisition continues.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            EpocError::FrameLength { .. } | EpocError::UnknownBatteryCode { .. }
        )
    }

    /// Returns `true` if this error must stop the acquisition loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EpocError::DeviceOff { .. }
                | EpocError::Transport { .. }
                | EpocError::EndOfStream
                | EpocError::ProducerStopped
                | EpocError::SessionClosed
                | EpocError::Io(_)
        )
    }

    /// Returns `true` if the headset is switched off.
    pub fn is_device_off(&self) -> bool {
        matches!(self, EpocError::DeviceOff { .. })
    }
}

#[cfg(feature = "config-toml")]
impl From<toml::de::Error> for EpocError {
    fn from(err: toml::de::Error) -> Self {
        EpocError::ConfigError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_code_device_off() {
        for &code in DEVICE_OFF_CODES {
            assert!(matches!(
                EpocError::from_transport_code(code),
                EpocError::DeviceOff { code: c } if c == code
            ));
        }
    }

    #[test]
    fn test_from_transport_code_generic() {
        let err = EpocError::from_transport_code(-9);
        assert!(matches!(err, EpocError::Transport { code: -9 }));
        assert!(!err.is_device_off());
    }

    #[test]
    fn test_from_transport_code_timeout_is_not_terminal() {
        let err = EpocError::from_transport_code(TIMEOUT_CODE);
        assert!(matches!(err, EpocError::TransportTimeout { .. }));
        assert!(!err.is_terminal());
        assert!(!err.is_device_off());
    }

    #[test]
    fn test_is_frame_error() {
        assert!(EpocError::FrameLength { len: 31 }.is_frame_error());
        assert!(EpocError::UnknownBatteryCode { code: 0x10 }.is_frame_error());
        assert!(!EpocError::TransportTimeout { millis: 10 }.is_frame_error());
        assert!(!EpocError::DeviceOff { code: 110 }.is_frame_error());
    }

    #[test]
    fn test_is_terminal() {
        assert!(EpocError::DeviceOff { code: 110 }.is_terminal());
        assert!(EpocError::Transport { code: -1 }.is_terminal());
        assert!(EpocError::EndOfStream.is_terminal());
        assert!(EpocError::SessionClosed.is_terminal());
        assert!(!EpocError::TransportTimeout { millis: 10 }.is_terminal());
        assert!(!EpocError::FrameLength { len: 0 }.is_terminal());
        assert!(!EpocError::InvalidSerial { len: 4 }.is_terminal());
    }

    #[test]
    fn test_device_off_message_is_actionable() {
        let err = EpocError::DeviceOff { code: 110 };
        assert!(err.to_string().contains("turned on"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err: EpocError = io.into();
        assert!(matches!(err, EpocError::Io(_)));
        assert!(err.is_terminal());
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn test_from_toml_error_conversion() {
        #[derive(Debug, serde::Deserialize)]
        struct DummyConfig {
            _value: String,
        }

        let toml_err = toml::from_str::<DummyConfig>("value = [").unwrap_err();
        let err: EpocError = toml_err.into();
        assert!(matches!(err, EpocError::ConfigError { .. }));
        assert!(err.to_string().contains("Configuration error"));
    }
}

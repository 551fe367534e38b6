//! # emotiv-epoc
//!
//! Decoder for the encrypted raw USB stream of the Emotiv EPOC 14-channel
//! EEG headset.
//!
//! The dongle delivers one 32-byte AES-128-ECB encrypted frame per sample.
//! The key is derived from the dongle's serial number, so no SDK or cloud
//! service is involved. Each decrypted frame is either a data frame (14 EEG
//! channels, two gyro axes, one round-robin contact quality reading) or a
//! battery frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use emotiv_epoc::{EpocConfig, ReplayTransport, Session};
//!
//! # fn main() -> emotiv_epoc::EpocResult<()> {
//! // Serial, device mode, and acquisition settings from epoc.toml or env
//! let config = EpocConfig::discover(None)?;
//!
//! let mut session = Session::from_config(&config, ReplayTransport::open("capture.bin")?)?;
//! while let Some(sample) = session.next_sample()? {
//!     if let Some(data) = sample.as_data() {
//!         println!("#{:3} F3 = {}", data.counter, data.channels[0]);
//!     }
//! }
//! println!("battery {}%", session.state().battery_percent());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module |
//! |-------|--------|
//! | Key from serial | [`key`] |
//! | AES-128-ECB | [`cipher`] |
//! | Bit layout | [`frame`] |
//! | Field extraction | [`decoder`], [`tables`] |
//! | Session state | [`state`] |
//! | Read loop, both modes | [`acquisition`], [`streams`] |
//!
//! Frames come from any [`FrameTransport`]; USB access itself lives outside
//! this crate.

pub mod acquisition;
pub mod cipher;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod headset;
pub mod key;
pub mod state;
pub mod streams;
pub mod tables;
pub mod transport;

// ─── Public re-exports ──────────────────────────────────────────────────

pub use acquisition::Session;
pub use config::{AcquisitionConfig, AcquisitionMode, EpocConfig};
pub use decoder::{DataSample, FrameDecoder, QualityUpdate, Sample};
pub use error::{EpocError, EpocResult};
pub use headset::Electrode;
pub use key::{DeviceMode, SerialNumber};
pub use state::{HeadsetState, QualityMap, Snapshot};
pub use streams::SnapshotStream;
pub use transport::{FrameTransport, ReplayTransport};

//! # Snapshot Stream
//!
//! [`SnapshotStream`] exposes a queued session's producer as a
//! [`futures_core::Stream`]. The stream ends when the producer stops;
//! [`SnapshotStream::exit_reason`] then tells a clean stop apart from a
//! device or transport failure.
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use emotiv_epoc::{AcquisitionConfig, AcquisitionMode, DeviceMode, ReplayTransport, Session};
//!
//! # async fn demo() -> emotiv_epoc::EpocResult<()> {
//! let config = AcquisitionConfig {
//!     mode: AcquisitionMode::Queued,
//!     ..AcquisitionConfig::default()
//! };
//! let session = Session::setup(
//!     b"SN20120229000290",
//!     DeviceMode::Research,
//!     ReplayTransport::open("capture.bin")?,
//!     &config,
//! )?;
//!
//! let mut snapshots = session.into_stream()?;
//! while let Some(snapshot) = snapshots.next().await {
//!     println!("battery {}%, F3 = {}", snapshot.battery_percent, snapshot.signal[0]);
//! }
//! if let Some(reason) = snapshots.exit_reason() {
//!     eprintln!("acquisition ended: {reason}");
//! }
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::acquisition::Producer;
use crate::error::EpocError;
use crate::state::Snapshot;

/// Stream of snapshots from a background producer, in frame order.
///
/// Dropping the stream stops the producer.
pub struct SnapshotStream {
    producer: Producer,
}

impl SnapshotStream {
    pub(crate) fn new(producer: Producer) -> Self {
        Self { producer }
    }

    /// The terminal error that ended the stream, if any.
    ///
    /// Returns `None` while the producer runs, after a requested stop, and
    /// on every call after the first one that returned the reason.
    pub fn exit_reason(&mut self) -> Option<EpocError> {
        self.producer.take_exit_reason()
    }

    /// Snapshots dropped because the consumer fell behind.
    pub fn dropped_snapshots(&self) -> u64 {
        self.producer.dropped()
    }

    /// Ask the producer to stop. Snapshots already queued are still yielded.
    pub fn stop(&mut self) {
        self.producer.stop();
    }
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.producer.poll_recv(cx)
    }
}

impl std::fmt::Debug for SnapshotStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStream")
            .field("running", &self.producer.is_running())
            .field("dropped", &self.producer.dropped())
            .finish()
    }
}

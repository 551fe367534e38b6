//! # Acquisition
//!
//! A [`Session`] drives the read → decrypt → decode → publish cycle over a
//! [`FrameTransport`]. Both acquisition modes run the same pipeline:
//!
//! | Mode | Who reads | Getter behavior |
//! |------|-----------|-----------------|
//! | [`Synchronous`](AcquisitionMode::Synchronous) | The caller | Every getter consumes exactly one frame |
//! | [`Queued`](AcquisitionMode::Queued) | A background producer | Getters take at most one pending snapshot, never block |
//!
//! In queued mode the producer runs on Tokio's blocking pool and owns the
//! transport and cipher exclusively. Snapshots reach the session through a
//! bounded channel in frame order; when the channel is full the newest
//! snapshot is dropped and counted. The producer checks its stop flag
//! between reads, so a read in progress always completes.
//!
//! Per-frame errors drop the frame. Read timeouts mean "no data yet".
//! Every other transport error stops acquisition in either mode: the next
//! session call surfaces it once, the transport is released, and later
//! calls return [`EpocError::ProducerStopped`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::cipher::FrameCipher;
use crate::config::{AcquisitionConfig, AcquisitionMode, EpocConfig};
use crate::decoder::{FrameDecoder, Sample};
use crate::error::{EpocError, EpocResult};
use crate::frame::FRAME_LEN;
use crate::headset::{Electrode, NUM_CHANNELS};
use crate::key::{DeviceMode, SerialNumber, derive_key};
use crate::state::{HeadsetState, QualityMap, Snapshot};
use crate::streams::SnapshotStream;
use crate::transport::FrameTransport;

// ─── Pipeline ───────────────────────────────────────────────────────────

/// One read-decrypt-decode cycle over an owned transport.
struct Pipeline {
    transport: Box<dyn FrameTransport>,
    cipher: FrameCipher,
    decoder: FrameDecoder,
    read_timeout: Duration,
    buf: [u8; FRAME_LEN],
}

impl Pipeline {
    fn new(cipher: FrameCipher, transport: Box<dyn FrameTransport>, read_timeout: Duration) -> Self {
        Self {
            transport,
            cipher,
            decoder: FrameDecoder::new(),
            read_timeout,
            buf: [0; FRAME_LEN],
        }
    }

    /// Read and decode one frame. `Ok(None)` means nothing usable arrived.
    fn step(&mut self) -> EpocResult<Option<Sample>> {
        let len = match self.transport.read_frame(&mut self.buf, self.read_timeout) {
            Ok(len) => len,
            Err(EpocError::TransportTimeout { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        match self.decode(len) {
            Ok(sample) => Ok(Some(sample)),
            Err(e @ EpocError::UnknownBatteryCode { .. }) => {
                tracing::warn!(error = %e, "Dropping battery frame");
                Ok(None)
            }
            Err(e) if e.is_frame_error() => {
                tracing::debug!(error = %e, "Dropping malformed frame");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn decode(&self, len: usize) -> EpocResult<Sample> {
        let raw = self.buf.get(..len).ok_or(EpocError::FrameLength { len })?;
        let plain = self.cipher.decrypt(raw)?;
        self.decoder.decode(&plain)
    }
}

// ─── Producer ───────────────────────────────────────────────────────────

/// Handle to the background producer of a queued session.
pub(crate) struct Producer {
    rx: mpsc::Receiver<Snapshot>,
    exit: oneshot::Receiver<EpocError>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    fn start(mut pipeline: Pipeline, capacity: usize) -> EpocResult<Self> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| EpocError::ConfigError {
                reason: "queued acquisition must be started inside a Tokio runtime".into(),
            })?;

        let running = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel(capacity);
        let (exit_tx, exit) = oneshot::channel();

        let handle = {
            let running = Arc::clone(&running);
            let dropped = Arc::clone(&dropped);
            runtime.spawn_blocking(move || {
                tracing::info!(capacity, "Acquisition producer started");
                let reason = produce(&mut pipeline, &tx, &running, &dropped);
                running.store(false, Ordering::SeqCst);

                match reason {
                    Some(err) => {
                        tracing::warn!(error = %err, "Acquisition producer stopped");
                        let _ = exit_tx.send(err);
                    }
                    None => tracing::info!(
                        dropped = dropped.load(Ordering::Relaxed),
                        "Acquisition producer stopped"
                    ),
                }
                // `tx` drops after the exit reason is sent, so a consumer
                // seeing the disconnect always finds the reason.
                drop(tx);
            })
        };

        Ok(Self {
            rx,
            exit,
            running,
            dropped,
            handle: Some(handle),
        })
    }

    /// Take the next snapshot without blocking.
    fn try_next(&mut self) -> EpocResult<Option<Snapshot>> {
        match self.rx.try_recv() {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(self.take_exit_reason().unwrap_or(EpocError::ProducerStopped))
            }
        }
    }

    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Snapshot>> {
        self.rx.poll_recv(cx)
    }

    /// The terminal error that stopped the producer, once available.
    pub(crate) fn take_exit_reason(&mut self) -> Option<EpocError> {
        self.exit.try_recv().ok()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the producer to stop after its current read.
    pub(crate) fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.rx.close();
    }

    fn take_handle(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn produce(
    pipeline: &mut Pipeline,
    tx: &mpsc::Sender<Snapshot>,
    running: &AtomicBool,
    dropped: &AtomicU64,
) -> Option<EpocError> {
    let mut state = HeadsetState::new();

    while running.load(Ordering::SeqCst) {
        match pipeline.step() {
            Ok(Some(sample)) => match tx.try_send(state.apply_and_snapshot(sample)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(dropped = total, "Snapshot queue full, dropping snapshot");
                }
                Err(TrySendError::Closed(_)) => return None,
            },
            Ok(None) => {}
            Err(e) => return Some(e),
        }
    }
    None
}

// ─── Session ────────────────────────────────────────────────────────────

enum Engine {
    Synchronous(Pipeline),
    Queued(Producer),
    /// A synchronous pipeline hit a terminal error.
    Stopped,
    Closed,
}

/// A decoding session for one headset.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
///
/// use emotiv_epoc::cipher::FrameCipher;
/// use emotiv_epoc::frame::{CHANNELS, COUNTER, FrameBuilder, QUALITY};
/// use emotiv_epoc::key::{DeviceMode, SerialNumber, derive_key};
/// use emotiv_epoc::{AcquisitionConfig, ReplayTransport, Session};
///
/// let serial = b"SN20120229000290";
/// let cipher = FrameCipher::new(derive_key(
///     &SerialNumber::new(serial).unwrap(),
///     DeviceMode::Research,
/// ));
/// let frame = FrameBuilder::new()
///     .with(COUNTER, 0)
///     .with(CHANNELS[0], 100)
///     .with(QUALITY, 500)
///     .build();
/// let capture = cipher.encrypt(&frame).to_vec();
///
/// let mut session = Session::setup(
///     serial,
///     DeviceMode::Research,
///     ReplayTransport::new(Cursor::new(capture)),
///     &AcquisitionConfig::default(),
/// )
/// .unwrap();
///
/// assert_eq!(session.quality_of("F3").unwrap(), 500);
/// assert_eq!(session.state().signal()[0], 100);
/// ```
pub struct Session {
    serial: SerialNumber,
    device_mode: DeviceMode,
    mode: AcquisitionMode,
    engine: Engine,
    state: HeadsetState,
    stopping: Option<JoinHandle<()>>,
}

impl Session {
    /// Derive the frame key and start acquisition.
    ///
    /// Queued sessions spawn their producer immediately and must be set up
    /// from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`EpocError::InvalidSerial`] for a serial shorter than 16
    /// bytes, or [`EpocError::ConfigError`] for an invalid acquisition
    /// config or a queued session outside a runtime.
    pub fn setup(
        serial: impl AsRef<[u8]>,
        device_mode: DeviceMode,
        transport: impl FrameTransport + 'static,
        config: &AcquisitionConfig,
    ) -> EpocResult<Self> {
        let serial = SerialNumber::new(serial)?;
        config.validate()?;

        let cipher = FrameCipher::new(derive_key(&serial, device_mode));
        let pipeline = Pipeline::new(cipher, Box::new(transport), config.read_timeout());

        let engine = match config.mode {
            AcquisitionMode::Synchronous => Engine::Synchronous(pipeline),
            AcquisitionMode::Queued => {
                Engine::Queued(Producer::start(pipeline, config.queue_capacity)?)
            }
        };

        tracing::debug!(
            serial = %serial,
            device_mode = %device_mode,
            mode = ?config.mode,
            "Session set up"
        );

        Ok(Self {
            serial,
            device_mode,
            mode: config.mode,
            engine,
            state: HeadsetState::new(),
            stopping: None,
        })
    }

    /// Set up a session from a loaded [`EpocConfig`].
    ///
    /// # Errors
    /// Returns [`EpocError::ConfigError`] if the config has no serial, or any
    /// error of [`setup`](Self::setup).
    pub fn from_config(config: &EpocConfig, transport: impl FrameTransport + 'static) -> EpocResult<Self> {
        let serial = config.serial_number()?;
        Self::setup(
            serial.as_bytes(),
            config.mode,
            transport,
            &config.acquisition,
        )
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    pub fn device_mode(&self) -> DeviceMode {
        self.device_mode
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// Advance by one frame (synchronous) or one pending snapshot (queued).
    fn advance(&mut self) -> EpocResult<Option<Snapshot>> {
        match &mut self.engine {
            Engine::Synchronous(pipeline) => match pipeline.step() {
                Ok(sample) => Ok(sample.map(|sample| self.state.apply_and_snapshot(sample))),
                Err(e) => {
                    if e.is_terminal() {
                        tracing::info!(error = %e, "Acquisition stopped");
                        self.engine = Engine::Stopped;
                    }
                    Err(e)
                }
            },
            Engine::Queued(producer) => {
                let snapshot = producer.try_next()?;
                if let Some(snapshot) = &snapshot {
                    self.state.absorb(snapshot);
                }
                Ok(snapshot)
            }
            Engine::Stopped => Err(EpocError::ProducerStopped),
            Engine::Closed => Err(EpocError::SessionClosed),
        }
    }

    /// Next decoded sample, or `None` if nothing is available.
    ///
    /// Synchronous sessions block for one transport read; queued sessions
    /// return immediately.
    ///
    /// # Errors
    /// Returns the terminal transport error ([`EpocError::DeviceOff`],
    /// [`EpocError::Transport`], [`EpocError::EndOfStream`]) once, then
    /// [`EpocError::ProducerStopped`]. Returns [`EpocError::SessionClosed`]
    /// after [`shutdown`](Self::shutdown).
    pub fn next_sample(&mut self) -> EpocResult<Option<Sample>> {
        Ok(self.advance()?.map(|snapshot| snapshot.sample))
    }

    /// Like [`next_sample`](Self::next_sample), returning the full snapshot.
    ///
    /// # Errors
    /// Same as [`next_sample`](Self::next_sample).
    pub fn next_snapshot(&mut self) -> EpocResult<Option<Snapshot>> {
        self.advance()
    }

    /// Advance once, then return the latest channel codes.
    ///
    /// # Errors
    /// Same as [`next_sample`](Self::next_sample).
    pub fn signal(&mut self) -> EpocResult<[u16; NUM_CHANNELS]> {
        self.advance()?;
        Ok(*self.state.signal())
    }

    /// Advance once, then return the latest centred gyro reading.
    ///
    /// # Errors
    /// Same as [`next_sample`](Self::next_sample).
    pub fn gyro(&mut self) -> EpocResult<(i16, i16)> {
        self.advance()?;
        Ok(self.state.gyro())
    }

    /// Advance once, then return the battery percentage (0 until the first
    /// battery frame).
    ///
    /// # Errors
    /// Same as [`next_sample`](Self::next_sample).
    pub fn battery_percent(&mut self) -> EpocResult<u8> {
        self.advance()?;
        Ok(self.state.battery_percent())
    }

    /// Advance once, then return the last quality value for `name`.
    ///
    /// The name is checked before any frame is consumed.
    ///
    /// # Errors
    /// Returns [`EpocError::UnknownElectrode`] for a name outside the 14
    /// EPOC electrodes, or any error of [`next_sample`](Self::next_sample).
    pub fn quality_of(&mut self, name: &str) -> EpocResult<u16> {
        let electrode: Electrode = name.parse()?;
        self.advance()?;
        Ok(self.state.quality().get(electrode))
    }

    /// Latest quality map, without reading.
    pub fn quality(&self) -> &QualityMap {
        self.state.quality()
    }

    /// Decoded state as of the last frame, without reading.
    pub fn state(&self) -> &HeadsetState {
        &self.state
    }

    /// Use the latest gyro reading as the resting baseline.
    pub fn calibrate_gyro(&mut self) {
        self.state.calibrate_gyro();
        tracing::debug!(baseline = ?self.state.gyro(), "Gyro calibrated");
    }

    /// Latest gyro reading relative to the calibrated baseline.
    pub fn calibrated_gyro(&self) -> (i16, i16) {
        self.state.calibrated_gyro()
    }

    /// Data frames skipped by the headset counter.
    pub fn lost_frames(&self) -> u64 {
        self.state.lost_frames()
    }

    /// Snapshots dropped because the queue was full (always 0 when synchronous).
    pub fn dropped_snapshots(&self) -> u64 {
        match &self.engine {
            Engine::Queued(producer) => producer.dropped(),
            Engine::Synchronous(_) | Engine::Stopped | Engine::Closed => 0,
        }
    }

    /// Returns whether the session still reads frames.
    pub fn is_running(&self) -> bool {
        match &self.engine {
            Engine::Synchronous(_) => true,
            Engine::Queued(producer) => producer.is_running(),
            Engine::Stopped | Engine::Closed => false,
        }
    }

    /// Stop acquisition and release the transport. Idempotent.
    ///
    /// A queued producer finishes its current read before it exits; use
    /// [`wait_stopped`](Self::wait_stopped) to wait for that.
    pub fn shutdown(&mut self) {
        match std::mem::replace(&mut self.engine, Engine::Closed) {
            Engine::Synchronous(_) => tracing::debug!("Session shut down"),
            Engine::Queued(mut producer) => {
                producer.stop();
                self.stopping = producer.take_handle();
                tracing::debug!("Session shut down, producer stopping");
            }
            Engine::Stopped | Engine::Closed => {}
        }
    }

    /// Wait for a stopping producer to exit.
    ///
    /// Returns `true` once no producer is left running, `false` if `timeout`
    /// elapsed first.
    pub async fn wait_stopped(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.stopping.take() else {
            return !self.is_running();
        };
        tokio::time::timeout(timeout, handle).await.is_ok()
    }

    /// Turn a queued session into a stream of snapshots.
    ///
    /// The session is consumed either way. On error it is shut down and its
    /// transport released.
    ///
    /// # Errors
    /// Returns [`EpocError::ConfigError`] for a synchronous session, or
    /// [`EpocError::SessionClosed`] after shutdown.
    pub fn into_stream(mut self) -> EpocResult<SnapshotStream> {
        match std::mem::replace(&mut self.engine, Engine::Closed) {
            Engine::Queued(producer) => Ok(SnapshotStream::new(producer)),
            Engine::Synchronous(_) | Engine::Stopped => Err(EpocError::ConfigError {
                reason: "snapshot streams require queued acquisition".into(),
            }),
            Engine::Closed => Err(EpocError::SessionClosed),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("serial", &self.serial)
            .field("device_mode", &self.device_mode)
            .field("mode", &self.mode)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use emotiv_epoc::cipher::FrameCipher;
use emotiv_epoc::frame::{COUNTER, FRAME_LEN, FrameBuilder, PlaintextFrame};
use emotiv_epoc::key::{DeviceMode, SerialNumber, derive_key};
use emotiv_epoc::{EpocError, EpocResult, FrameTransport};

pub const SERIAL: &[u8; 16] = b"SN20120229000290";

pub const STEP_TIMEOUT: Duration = Duration::from_secs(3);

/// One scripted transport read.
pub enum Step {
    /// Encrypt and deliver a plaintext frame.
    Frame(PlaintextFrame),
    /// Deliver raw bytes as-is (may be short).
    Raw(Vec<u8>),
    /// Fail the read.
    Fail(EpocError),
}

/// What the transport does once the script runs out.
#[derive(Debug, Clone, Copy)]
pub enum Exhausted {
    EndOfStream,
    /// Behave like an idle dongle: every read times out.
    Timeout,
}

#[derive(Default)]
struct ProbeInner {
    reads: AtomicUsize,
    released: AtomicBool,
}

/// Observes a [`MockTransport`] after it has been moved into a session.
#[derive(Clone, Default)]
pub struct TransportProbe(Arc<ProbeInner>);

impl TransportProbe {
    pub fn reads(&self) -> usize {
        self.0.reads.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.0.released.load(Ordering::SeqCst)
    }
}

pub struct MockTransport {
    steps: VecDeque<Step>,
    cipher: FrameCipher,
    exhausted: Exhausted,
    probe: TransportProbe,
}

impl MockTransport {
    pub fn new(steps: Vec<Step>, exhausted: Exhausted) -> (Self, TransportProbe) {
        let probe = TransportProbe::default();
        let transport = Self {
            steps: steps.into(),
            cipher: research_cipher(),
            exhausted,
            probe: probe.clone(),
        };
        (transport, probe)
    }
}

impl FrameTransport for MockTransport {
    fn read_frame(&mut self, buf: &mut [u8; FRAME_LEN], timeout: Duration) -> EpocResult<usize> {
        self.probe.0.reads.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => {
                *buf = self.cipher.encrypt(&frame);
                Ok(FRAME_LEN)
            }
            Some(Step::Raw(bytes)) => {
                let len = bytes.len().min(FRAME_LEN);
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Some(Step::Fail(err)) => Err(err),
            None => match self.exhausted {
                Exhausted::EndOfStream => Err(EpocError::EndOfStream),
                Exhausted::Timeout => {
                    std::thread::sleep(timeout.min(Duration::from_millis(2)));
                    Err(EpocError::TransportTimeout {
                        millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            },
        }
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.probe.0.released.store(true, Ordering::SeqCst);
    }
}

pub fn research_cipher() -> FrameCipher {
    FrameCipher::new(derive_key(
        &SerialNumber::new(SERIAL).unwrap(),
        DeviceMode::Research,
    ))
}

pub fn data_frame(counter: u16) -> FrameBuilder {
    FrameBuilder::new().with(COUNTER, counter)
}

pub fn battery_frame(code: u16) -> PlaintextFrame {
    FrameBuilder::new().with(COUNTER, code).build()
}

/// Data frames with consecutive counters starting at `first`.
pub fn counter_run(first: u16, count: u16) -> Vec<Step> {
    (0..count)
        .map(|i| Step::Frame(data_frame((first + i) % 128).build()))
        .collect()
}

/// Poll `cond` until it holds or [`STEP_TIMEOUT`] elapses.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    cond()
}

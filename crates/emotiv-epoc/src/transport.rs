//! # Frame Transport
//!
//! The decoder never talks to USB directly. A [`FrameTransport`] delivers one
//! raw 32-byte frame per read and reports failures as [`EpocError`] values:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | No frame within the timeout | [`EpocError::TransportTimeout`] |
//! | Headset off or unplugged | [`EpocError::DeviceOff`] |
//! | Any other device failure | [`EpocError::Transport`] |
//! | Capture source exhausted | [`EpocError::EndOfStream`] |
//!
//! Device backends that only have a numeric status code should map it with
//! [`EpocError::from_transport_code`].
//!
//! [`ReplayTransport`] reads frames back from a capture file.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use crate::error::{EpocError, EpocResult};
use crate::frame::FRAME_LEN;

/// A source of raw, encrypted EPOC frames.
pub trait FrameTransport: Send {
    /// Read one frame into `buf`, returning the number of bytes written.
    ///
    /// A return value below [`FRAME_LEN`] is a short frame; the acquisition
    /// loop drops it as malformed.
    ///
    /// # Errors
    /// See the module table for the error contract.
    fn read_frame(&mut self, buf: &mut [u8; FRAME_LEN], timeout: Duration) -> EpocResult<usize>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    fn read_frame(&mut self, buf: &mut [u8; FRAME_LEN], timeout: Duration) -> EpocResult<usize> {
        (**self).read_frame(buf, timeout)
    }
}

/// Replays back-to-back 32-byte frames from any reader.
///
/// Reads never time out. A trailing partial frame is returned once as a
/// short read, after which the transport reports [`EpocError::EndOfStream`].
#[derive(Debug)]
pub struct ReplayTransport<R> {
    reader: R,
    frames: u64,
    exhausted: bool,
}

impl<R: Read + Send> ReplayTransport<R> {
    /// Wrap a reader positioned at the first frame.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            frames: 0,
            exhausted: false,
        }
    }

    /// Frames delivered so far, short frames included.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames
    }
}

impl ReplayTransport<std::io::BufReader<std::fs::File>> {
    /// Open a capture file.
    ///
    /// # Errors
    /// Returns [`EpocError::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> EpocResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(std::io::BufReader::new(file)))
    }
}

impl<R: Read + Send> FrameTransport for ReplayTransport<R> {
    fn read_frame(&mut self, buf: &mut [u8; FRAME_LEN], _timeout: Duration) -> EpocResult<usize> {
        if self.exhausted {
            return Err(EpocError::EndOfStream);
        }

        let mut filled = 0;
        while filled < FRAME_LEN {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        if filled < FRAME_LEN {
            self.exhausted = true;
            if filled == 0 {
                return Err(EpocError::EndOfStream);
            }
            tracing::debug!(len = filled, "Trailing partial frame in capture");
        }
        self.frames += 1;
        Ok(filled)
    }
}

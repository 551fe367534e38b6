//! # Frame Cipher
//!
//! [`FrameCipher`] holds the session's AES-128 context. Frames are exactly
//! two cipher blocks, so they are processed in raw ECB mode with no padding
//! and no chaining between blocks or frames.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::error::{EpocError, EpocResult};
use crate::frame::{FRAME_LEN, PlaintextFrame};
use crate::key::FrameKey;

/// AES block size in bytes.
const BLOCK_LEN: usize = 16;

const _: () = assert!(FRAME_LEN % BLOCK_LEN == 0);

/// AES-128-ECB decryptor for 32-byte EPOC frames.
pub struct FrameCipher {
    key: FrameKey,
    cipher: Aes128,
}

impl FrameCipher {
    /// Initialize the block cipher with a derived key.
    #[must_use]
    pub fn new(key: FrameKey) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(key.as_bytes()));
        Self { key, cipher }
    }

    /// Decrypt one raw frame.
    ///
    /// # Errors
    /// Returns [`EpocError::FrameLength`] if `raw` is not exactly 32 bytes.
    pub fn decrypt(&self, raw: &[u8]) -> EpocResult<PlaintextFrame> {
        let mut buf = to_frame_buf(raw)?;
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            self.cipher
                .decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(PlaintextFrame::new(buf))
    }

    /// Encrypt one plaintext frame the way the headset does.
    ///
    /// Used to build synthetic captures for replay and testing.
    #[must_use]
    pub fn encrypt(&self, plain: &PlaintextFrame) -> [u8; FRAME_LEN] {
        let mut buf = *plain.as_bytes();
        for block in buf.chunks_exact_mut(BLOCK_LEN) {
            self.cipher
                .encrypt_block(GenericArray::from_mut_slice(block));
        }
        buf
    }
}

impl std::fmt::Debug for FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCipher")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn to_frame_buf(raw: &[u8]) -> EpocResult<[u8; FRAME_LEN]> {
    <[u8; FRAME_LEN]>::try_from(raw).map_err(|_| EpocError::FrameLength { len: raw.len() })
}

//! # Frame Layout
//!
//! A decrypted frame is 256 bits, numbered big-endian: bit 0 is the most
//! significant bit of byte 0, bit 255 the least significant bit of byte 31.
//!
//! ```text
//! bits    0..8     counter (data frame) / battery code (battery frame)
//! bits    8..106   channels F3 FC5 AF3 F7 T7 P7 O1, 14 bits each
//! bits  107..121   contact quality value, 14 bits
//! bits  134..232   channels O2 P8 T8 F8 AF4 FC6 F4, 14 bits each
//! bits  233..240   gyro X, 7 bits
//! bits  240..248   gyro Y, 8 bits
//! ```
//!
//! The quality field lies inside the gap between the two channel groups.
//! All offsets are validated at compile time below.

use crate::headset::{NUM_CHANNELS, RESOLUTION_BITS};

/// Length of a raw or decrypted frame in bytes.
pub const FRAME_LEN: usize = 32;

/// Length of a frame in bits.
pub const FRAME_BITS: usize = FRAME_LEN * 8;

/// A bit field inside a plaintext frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    /// Offset of the field's most significant bit.
    pub offset: usize,
    /// Width of the field in bits.
    pub width: usize,
}

impl BitField {
    /// Create a field descriptor.
    #[must_use]
    pub const fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    /// One past the last bit of the field.
    #[must_use]
    pub const fn end(self) -> usize {
        self.offset + self.width
    }

    const fn fits(self) -> bool {
        self.width > 0 && self.width <= 16 && self.end() <= FRAME_BITS
    }

    const fn overlaps(self, other: BitField) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Bit 0: set for battery frames.
pub const BATTERY_FLAG_BIT: usize = 0;

/// Counter byte of a data frame, or battery code of a battery frame.
pub const COUNTER: BitField = BitField::new(0, 8);

/// Width of one channel sample.
pub const CHANNEL_BITS: usize = 14;

/// Sample fields in electrode (frame) order.
pub const CHANNELS: [BitField; NUM_CHANNELS] = [
    BitField::new(8, CHANNEL_BITS),
    BitField::new(22, CHANNEL_BITS),
    BitField::new(36, CHANNEL_BITS),
    BitField::new(50, CHANNEL_BITS),
    BitField::new(64, CHANNEL_BITS),
    BitField::new(78, CHANNEL_BITS),
    BitField::new(92, CHANNEL_BITS),
    BitField::new(134, CHANNEL_BITS),
    BitField::new(148, CHANNEL_BITS),
    BitField::new(162, CHANNEL_BITS),
    BitField::new(176, CHANNEL_BITS),
    BitField::new(190, CHANNEL_BITS),
    BitField::new(204, CHANNEL_BITS),
    BitField::new(218, CHANNEL_BITS),
];

/// Contact quality value for the electrode scheduled at this counter.
pub const QUALITY: BitField = BitField::new(107, 14);

/// Raw gyro X axis.
pub const GYRO_X: BitField = BitField::new(233, 7);

/// Raw gyro Y axis.
pub const GYRO_Y: BitField = BitField::new(240, 8);

/// Resting value of both raw gyro axes.
pub const GYRO_BIAS: i16 = 106;

const fn layout_is_valid() -> bool {
    if !COUNTER.fits() || !QUALITY.fits() || !GYRO_X.fits() || !GYRO_Y.fits() {
        return false;
    }
    if GYRO_X.overlaps(GYRO_Y) {
        return false;
    }
    let mut i = 0;
    while i < NUM_CHANNELS {
        let ch = CHANNELS[i];
        if !ch.fits() || ch.overlaps(COUNTER) || ch.overlaps(QUALITY) {
            return false;
        }
        if ch.overlaps(GYRO_X) || ch.overlaps(GYRO_Y) {
            return false;
        }
        if i > 0 && CHANNELS[i - 1].end() > ch.offset {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(layout_is_valid());
const _: () = assert!(COUNTER.offset == BATTERY_FLAG_BIT);
const _: () = assert!(CHANNEL_BITS == RESOLUTION_BITS as usize);

/// One decrypted 32-byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaintextFrame([u8; FRAME_LEN]);

impl PlaintextFrame {
    /// Wrap decrypted bytes.
    #[must_use]
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Value of a single bit.
    #[must_use]
    pub fn bit(&self, index: usize) -> bool {
        self.0[index / 8] & (0x80 >> (index % 8)) != 0
    }

    /// Read a big-endian unsigned field.
    ///
    /// Only the layout constants of this module are passed here, and those
    /// are checked to fit inside the frame at compile time.
    #[must_use]
    pub fn read(&self, field: BitField) -> u16 {
        (field.offset..field.end()).fold(0u16, |acc, bit| (acc << 1) | u16::from(self.bit(bit)))
    }

    /// Whether the battery flag is set.
    #[must_use]
    pub fn is_battery(&self) -> bool {
        self.bit(BATTERY_FLAG_BIT)
    }
}

/// Builder for synthetic plaintext frames.
///
/// Writes fields in the same bit order [`PlaintextFrame::read`] uses.
///
/// ```
/// use emotiv_epoc::frame::{COUNTER, FrameBuilder, QUALITY};
///
/// let frame = FrameBuilder::new().with(COUNTER, 5).with(QUALITY, 500).build();
/// assert_eq!(frame.read(COUNTER), 5);
/// assert_eq!(frame.read(QUALITY), 500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    bytes: [u8; FRAME_LEN],
}

impl FrameBuilder {
    /// Start from an all-zero frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` into `field`, truncating it to the field width.
    #[must_use]
    pub fn with(mut self, field: BitField, value: u16) -> Self {
        for (i, bit) in (field.offset..field.end()).enumerate() {
            let shift = field.width - 1 - i;
            let mask = 0x80u8 >> (bit % 8);
            if (value >> shift) & 1 == 1 {
                self.bytes[bit / 8] |= mask;
            } else {
                self.bytes[bit / 8] &= !mask;
            }
        }
        self
    }

    /// Write all 14 channel codes.
    #[must_use]
    pub fn with_channels(self, codes: &[u16; NUM_CHANNELS]) -> Self {
        CHANNELS
            .iter()
            .zip(codes)
            .fold(self, |builder, (&field, &code)| builder.with(field, code))
    }

    /// Finish the frame.
    #[must_use]
    pub fn build(self) -> PlaintextFrame {
        PlaintextFrame(self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_numbering_is_msb_first() {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = 0x80;
        bytes[31] = 0x01;
        let frame = PlaintextFrame::new(bytes);
        assert!(frame.bit(0));
        assert!(!frame.bit(1));
        assert!(frame.bit(255));
        assert!(frame.is_battery());
    }

    #[test]
    fn test_read_straddles_bytes() {
        // 14 bits at offset 8 cover byte 1 and the top 6 bits of byte 2.
        let mut bytes = [0u8; FRAME_LEN];
        bytes[1] = 0xFF;
        bytes[2] = 0xFC;
        let frame = PlaintextFrame::new(bytes);
        assert_eq!(frame.read(CHANNELS[0]), 0x3FFF);
        assert_eq!(frame.read(CHANNELS[1]), 0);
    }

    #[test]
    fn test_read_counter_byte() {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = 0x7F;
        assert_eq!(PlaintextFrame::new(bytes).read(COUNTER), 127);
    }

    #[test]
    fn test_builder_writes_every_channel() {
        let codes: [u16; NUM_CHANNELS] =
            [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 16383];
        let frame = FrameBuilder::new().with_channels(&codes).build();
        for (field, code) in CHANNELS.iter().zip(codes) {
            assert_eq!(frame.read(*field), code);
        }
    }

    #[test]
    fn test_builder_truncates_to_width() {
        let frame = FrameBuilder::new().with(GYRO_X, 0xFF).build();
        assert_eq!(frame.read(GYRO_X), 0x7F);
        assert_eq!(frame.read(GYRO_Y), 0);
    }

    #[test]
    fn test_builder_clears_bits() {
        let frame = FrameBuilder::new()
            .with(QUALITY, 0x3FFF)
            .with(QUALITY, 0x0001)
            .build();
        assert_eq!(frame.read(QUALITY), 1);
    }

    #[test]
    fn test_quality_sits_in_channel_gap() {
        assert!(QUALITY.offset >= CHANNELS[6].end());
        assert!(QUALITY.end() <= CHANNELS[7].offset);
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use emotiv_epoc::cipher::FrameCipher;
use emotiv_epoc::frame::{COUNTER, FrameBuilder, GYRO_BIAS, GYRO_X, GYRO_Y, QUALITY};
use emotiv_epoc::headset::{MAX_CODE, NUM_CHANNELS, SAMPLING_RATE_HZ};
use emotiv_epoc::key::derive_key;
use emotiv_epoc::tables::COUNTER_CYCLE;
use emotiv_epoc::{DeviceMode, EpocResult, SerialNumber};

/// Resting ADC code, mid-scale of the 14-bit range.
const BASELINE_CODE: f64 = 8192.0;

/// Battery code written after every full counter cycle (97 %).
const BATTERY_CODE: u16 = 246;

/// Write `frames` encrypted frames: data frames with a 10 Hz rhythm on each
/// channel, and one battery frame after every counter wrap.
pub fn write_capture(
    path: &Path,
    serial: &SerialNumber,
    mode: DeviceMode,
    frames: usize,
) -> EpocResult<usize> {
    let cipher = FrameCipher::new(derive_key(serial, mode));
    let mut out = BufWriter::new(File::create(path)?);

    let mut counter: u16 = 0;
    let mut tick = 0u32;
    for _ in 0..frames {
        let frame = if usize::from(counter) == COUNTER_CYCLE {
            counter = 0;
            FrameBuilder::new().with(COUNTER, BATTERY_CODE).build()
        } else {
            let frame = data_frame(counter, tick);
            counter += 1;
            tick += 1;
            frame
        };
        out.write_all(&cipher.encrypt(&frame))?;
    }
    out.flush()?;
    Ok(frames)
}

fn data_frame(counter: u16, tick: u32) -> emotiv_epoc::frame::PlaintextFrame {
    let t = f64::from(tick) / SAMPLING_RATE_HZ;
    let mut codes = [0u16; NUM_CHANNELS];
    for (i, code) in (0u8..).zip(codes.iter_mut()) {
        let phase = f64::from(i) * 0.4;
        let amplitude = 200.0 + 20.0 * f64::from(i);
        *code = to_code(BASELINE_CODE + amplitude * (std::f64::consts::TAU * 10.0 * t + phase).sin());
    }

    let wobble = (std::f64::consts::TAU * 0.5 * t).sin() * 4.0;
    let gyro = to_code(f64::from(GYRO_BIAS) + wobble);

    FrameBuilder::new()
        .with(COUNTER, counter)
        .with_channels(&codes)
        .with(GYRO_X, gyro)
        .with(GYRO_Y, gyro)
        .with(QUALITY, 4000 + (counter % 16) * 100)
        .build()
}

/// Round and clamp to the ADC range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_code(value: f64) -> u16 {
    value.round().clamp(0.0, f64::from(MAX_CODE)) as u16
}

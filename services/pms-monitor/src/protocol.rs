//! PMS5003 protocol implementation
//!
//! Serial Settings: 9600 baud, 8N1, binary frames
//!
//! Data frame (32 bytes, all words big-endian):
//!
//! | offset | content                                         |
//! |--------|-------------------------------------------------|
//! | 0..2   | start bytes `0x42 0x4D`                          |
//! | 2..4   | frame length, always 28                         |
//! | 4..10  | PM1.0 / PM2.5 / PM10, standard particle (CF=1)  |
//! | 10..16 | PM1.0 / PM2.5 / PM10, atmospheric environment   |
//! | 16..28 | particles per 0.1 L above 0.3/0.5/1/2.5/5/10 µm |
//! | 28..30 | reserved                                        |
//! | 30..32 | checksum: sum of bytes 0..30                    |
//!
//! Commands are 7 bytes: start bytes, command, data high, data low, checksum.

use crate::error::{PmsError, Result};

pub const FRAME_START: [u8; 2] = [0x42, 0x4D];
pub const FRAME_SIZE: usize = 32;
/// Value of the length field in a data frame
pub const FRAME_LENGTH: u16 = 28;
const DATA_WORDS: usize = 13;

/// Mass concentration channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleSize {
    Pm1_0,
    Pm2_5,
    Pm10,
}

/// Particle count thresholds, in micrometres
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSize {
    Um0_3,
    Um0_5,
    Um1_0,
    Um2_5,
    Um5_0,
    Um10,
}

/// Commands understood by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmsCommand {
    /// Only send a frame when asked with `PassiveRead`
    PassiveMode,
    /// Stream frames continuously (power-on default)
    ActiveMode,
    /// Request one frame in passive mode
    PassiveRead,
    /// Stop the fan and laser
    Sleep,
    /// Resume measuring after `Sleep`
    Wakeup,
}

impl PmsCommand {
    /// Serialize the command to the bytes sent to the device
    pub fn to_bytes(self) -> [u8; 7] {
        let (command, data): (u8, u16) = match self {
            PmsCommand::PassiveMode => (0xE1, 0x0000),
            PmsCommand::ActiveMode => (0xE1, 0x0001),
            PmsCommand::PassiveRead => (0xE2, 0x0000),
            PmsCommand::Sleep => (0xE4, 0x0000),
            PmsCommand::Wakeup => (0xE4, 0x0001),
        };

        let [data_high, data_low] = data.to_be_bytes();
        let body = [FRAME_START[0], FRAME_START[1], command, data_high, data_low];
        let [check_high, check_low] = checksum(&body).to_be_bytes();

        [
            body[0], body[1], body[2], body[3], body[4], check_high, check_low,
        ]
    }
}

/// One decoded data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PmsFrame {
    data: [u16; DATA_WORDS],
}

impl PmsFrame {
    /// Build a frame from its 13 data words, in wire order
    pub fn from_words(data: [u16; DATA_WORDS]) -> Self {
        Self { data }
    }

    /// Build a frame carrying the same concentrations in both CF=1 and
    /// atmospheric channels and no particle counts
    pub fn with_concentrations(pm1_0: u16, pm2_5: u16, pm10: u16) -> Self {
        let mut data = [0; DATA_WORDS];
        data[..6].copy_from_slice(&[pm1_0, pm2_5, pm10, pm1_0, pm2_5, pm10]);
        Self { data }
    }

    pub fn words(&self) -> &[u16; DATA_WORDS] {
        &self.data
    }

    /// Mass concentration in µg/m³
    ///
    /// `atmospheric` selects the atmospheric-environment channel instead of
    /// the standard-particle (CF=1) one.
    pub fn pm_ug_per_m3(&self, size: ParticleSize, atmospheric: bool) -> u16 {
        let offset = if atmospheric { 3 } else { 0 };
        let index = match size {
            ParticleSize::Pm1_0 => 0,
            ParticleSize::Pm2_5 => 1,
            ParticleSize::Pm10 => 2,
        };
        self.data[offset + index]
    }

    /// Number of particles per 0.1 L of air above the given diameter
    pub fn particles_per_dl(&self, size: CountSize) -> u16 {
        let index = match size {
            CountSize::Um0_3 => 6,
            CountSize::Um0_5 => 7,
            CountSize::Um1_0 => 8,
            CountSize::Um2_5 => 9,
            CountSize::Um5_0 => 10,
            CountSize::Um10 => 11,
        };
        self.data[index]
    }
}

/// Wrapping 16-bit sum of the given bytes
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(u16::from(byte)))
}

/// Parse a complete 32-byte data frame
pub fn parse_frame(bytes: &[u8]) -> Result<PmsFrame> {
    if bytes.len() != FRAME_SIZE {
        return Err(PmsError::InvalidFrame(format!(
            "Expected {} bytes, got {}",
            FRAME_SIZE,
            bytes.len()
        )));
    }

    if bytes[..2] != FRAME_START {
        return Err(PmsError::InvalidFrame(format!(
            "Expected start bytes 42 4D, got {:02X} {:02X}",
            bytes[0], bytes[1]
        )));
    }

    let length = read_word(bytes, 2);
    if length != FRAME_LENGTH {
        return Err(PmsError::InvalidFrame(format!(
            "Expected frame length {}, got {}",
            FRAME_LENGTH, length
        )));
    }

    let expected = read_word(bytes, FRAME_SIZE - 2);
    let actual = checksum(&bytes[..FRAME_SIZE - 2]);
    if expected != actual {
        return Err(PmsError::ChecksumMismatch { expected, actual });
    }

    let mut data = [0u16; DATA_WORDS];
    for (i, word) in data.iter_mut().enumerate() {
        *word = read_word(bytes, 4 + i * 2);
    }

    Ok(PmsFrame { data })
}

/// Serialize a frame exactly as the sensor would send it
pub fn encode_frame(frame: &PmsFrame) -> [u8; FRAME_SIZE] {
    let mut bytes = [0u8; FRAME_SIZE];
    bytes[..2].copy_from_slice(&FRAME_START);
    bytes[2..4].copy_from_slice(&FRAME_LENGTH.to_be_bytes());
    for (i, word) in frame.data.iter().enumerate() {
        bytes[4 + i * 2..6 + i * 2].copy_from_slice(&word.to_be_bytes());
    }
    let sum = checksum(&bytes[..FRAME_SIZE - 2]);
    bytes[FRAME_SIZE - 2..].copy_from_slice(&sum.to_be_bytes());
    bytes
}

fn read_word(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    // Indoor air, low concentrations
    const SAMPLE_FRAME: [u8; FRAME_SIZE] = [
        0x42, 0x4D, 0x00, 0x1C, 0x00, 0x05, 0x00, 0x08, 0x00, 0x09, 0x00, 0x05, 0x00, 0x08, 0x00,
        0x09, 0x03, 0x9C, 0x01, 0x0E, 0x00, 0x3A, 0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x97, 0x00,
        0x02, 0x5C,
    ];

    #[test]
    fn parses_indoor_frame() {
        let frame = parse_frame(&SAMPLE_FRAME).unwrap();
        assert_eq!(frame.pm_ug_per_m3(ParticleSize::Pm1_0, false), 5);
        assert_eq!(frame.pm_ug_per_m3(ParticleSize::Pm2_5, false), 8);
        assert_eq!(frame.pm_ug_per_m3(ParticleSize::Pm10, false), 9);
        assert_eq!(frame.pm_ug_per_m3(ParticleSize::Pm2_5, true), 8);
        assert_eq!(frame.particles_per_dl(CountSize::Um0_3), 924);
        assert_eq!(frame.particles_per_dl(CountSize::Um0_5), 270);
        assert_eq!(frame.particles_per_dl(CountSize::Um10), 0);
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut bytes = SAMPLE_FRAME;
        bytes[5] = 0x06;
        match parse_frame(&bytes) {
            Err(PmsError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, 0x025C);
                assert_eq!(actual, 0x025D);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_start_bytes() {
        let mut bytes = SAMPLE_FRAME;
        bytes[0] = 0x00;
        assert!(matches!(
            parse_frame(&bytes),
            Err(PmsError::InvalidFrame(_))
        ));
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(
            parse_frame(&SAMPLE_FRAME[..20]),
            Err(PmsError::InvalidFrame(_))
        ));
    }

    #[test]
    fn encoded_frame_matches_wire_bytes() {
        let frame = parse_frame(&SAMPLE_FRAME).unwrap();
        assert_eq!(encode_frame(&frame), SAMPLE_FRAME);
    }

    #[test]
    fn command_bytes_carry_checksum() {
        assert_eq!(
            PmsCommand::PassiveRead.to_bytes(),
            [0x42, 0x4D, 0xE2, 0x00, 0x00, 0x01, 0x71]
        );
        assert_eq!(
            PmsCommand::ActiveMode.to_bytes(),
            [0x42, 0x4D, 0xE1, 0x00, 0x01, 0x01, 0x71]
        );
        assert_eq!(
            PmsCommand::Sleep.to_bytes(),
            [0x42, 0x4D, 0xE4, 0x00, 0x00, 0x01, 0x73]
        );
    }
}

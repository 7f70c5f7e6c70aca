//! WinKey protocol types: paddle mode, mode register, pin configuration,
//! and command byte constants (spec §3, §4.5).
//!
//! Grounded on the teacher's `protocol::types` (`ModeRegister`, `PinConfig`,
//! `PaddleMode`), narrowed to the bits the v2.3-subset spec actually
//! defines and given a decode direction (`from_*`) since this engine reads
//! these bytes off the wire instead of only encoding them.

use bitflags::bitflags;

/// The device's own WinKey version byte, returned on Admin-Open (spec §3,
/// §4.5, §6).
pub const WINKEY_VERSION: u8 = 23;

/// Paddle keying mode, encoded in `mode_register` bits 5-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddleMode {
    #[default]
    IambicB,
    IambicA,
    Ultimatic,
    Bug,
}

impl PaddleMode {
    pub fn to_mode_bits(self) -> u8 {
        match self {
            Self::IambicB => 0x00,
            Self::IambicA => 0x10,
            Self::Ultimatic => 0x20,
            Self::Bug => 0x30,
        }
    }

    pub fn from_mode_register_byte(byte: u8) -> Self {
        match (byte >> 4) & 0x03 {
            0 => Self::IambicB,
            1 => Self::IambicA,
            2 => Self::Ultimatic,
            _ => Self::Bug,
        }
    }
}

bitflags! {
    /// Mode Register (command `0x0E`), spec §3.
    ///
    /// Bits 4-5 (paddle mode) are decoded separately via [`PaddleMode`].
    /// Bits not named here (0, 1, 7) are reserved in this v2.3 subset and
    /// are stored verbatim but never interpreted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeRegister: u8 {
        const PADDLE_ECHO  = 0x40;
        const SWAP_PADDLES = 0x08;
        const SERIAL_ECHO  = 0x04;
    }
}

bitflags! {
    /// Pin Configuration (command `0x09`), spec §3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PinConfig: u8 {
        const PTT_ENABLE      = 0x01;
        const SIDETONE_ENABLE = 0x02;
        const HANG_BITS_0     = 0x10;
        const HANG_BITS_1     = 0x20;
    }
}

impl PinConfig {
    /// The 2-bit hang-time selector (bits 4-5), used when `tail == 0`.
    pub fn hang_bits(self) -> u8 {
        (self.bits() >> 4) & 0x03
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paddle_mode_roundtrip() {
        for mode in [
            PaddleMode::IambicB,
            PaddleMode::IambicA,
            PaddleMode::Ultimatic,
            PaddleMode::Bug,
        ] {
            let decoded = PaddleMode::from_mode_register_byte(mode.to_mode_bits());
            assert_eq!(decoded, mode);
        }
    }

    #[test]
    fn pin_config_hang_bits() {
        let pin = PinConfig::from_bits_truncate(0x20);
        assert_eq!(pin.hang_bits(), 2);
    }
}

//! Settings record (spec §3, §4.2): fifteen persisted parameters, NV
//! load/store with the two-byte magic, and the clamps applied at every
//! ingestion boundary per spec §7 ("out-of-range parameter: clamp, never
//! reject").
//!
//! Grounded on the teacher's `LoadDefaults` (the same 15-field block, NV
//! wire order) merged with its per-setter clamps from `winkeyer.rs`
//! (`set_weight`, `set_ratio`, ...) — there they reject with `Err`; here
//! they clamp, since the device has no caller to report an error to.

use crate::io_shim::Platform;
use crate::protocol::types::{ModeRegister, PaddleMode, PinConfig};

pub const NV_MAGIC: u8 = 0xA5;
pub const SETTINGS_LEN: usize = 14;

/// The fifteen-field settings record, in NV/wire order (offsets 1..14;
/// offset 0 and 15 are the magic bytes, tracked separately by
/// [`load_or_init`]/[`save`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub mode_register: u8,
    pub speed: u8,
    pub sidetone: u8,
    pub weight: u8,
    pub lead_in: u8,
    pub tail: u8,
    pub min_wpm: u8,
    pub wpm_range: u8,
    pub extension: u8,
    pub compensation: u8,
    pub farnsworth: u8,
    pub paddle_point: u8,
    pub ratio: u8,
    pub pin_config: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode_register: (ModeRegister::PADDLE_ECHO | ModeRegister::SERIAL_ECHO).bits(),
            speed: 20,
            sidetone: 5,
            weight: 50,
            lead_in: 8,
            tail: 0,
            min_wpm: 10,
            wpm_range: 20,
            extension: 0,
            compensation: 0,
            farnsworth: 0,
            paddle_point: 50,
            ratio: 50,
            pin_config: (PinConfig::PTT_ENABLE | PinConfig::SIDETONE_ENABLE).bits(),
        }
    }
}

impl Settings {
    pub fn to_bytes(&self) -> [u8; SETTINGS_LEN] {
        [
            self.mode_register,
            self.speed,
            self.sidetone,
            self.weight,
            self.lead_in,
            self.tail,
            self.min_wpm,
            self.wpm_range,
            self.extension,
            self.compensation,
            self.farnsworth,
            self.paddle_point,
            self.ratio,
            self.pin_config,
        ]
    }

    pub fn from_bytes(bytes: &[u8; SETTINGS_LEN]) -> Self {
        let mut s = Self {
            mode_register: bytes[0],
            speed: bytes[1],
            sidetone: bytes[2],
            weight: bytes[3],
            lead_in: bytes[4],
            tail: bytes[5],
            min_wpm: bytes[6],
            wpm_range: bytes[7],
            extension: bytes[8],
            compensation: bytes[9],
            farnsworth: bytes[10],
            paddle_point: bytes[11],
            ratio: bytes[12],
            pin_config: bytes[13],
        };
        s.clamp_all();
        s
    }

    /// Clamp every ranged field to the limits in spec §3/§7. Applied on
    /// NV load and on every protocol command that ingests one of these
    /// fields, so a single implementation backs both ingestion points.
    pub fn clamp_all(&mut self) {
        self.speed = self.speed.clamp(5, 40);
        self.weight = self.weight.clamp(10, 90);
        self.wpm_range = self.wpm_range.min(31);
        self.farnsworth = if self.farnsworth <= 10 {
            self.farnsworth.min(10)
        } else {
            self.farnsworth.clamp(10, 99)
        };
        self.ratio = self.ratio.clamp(33, 66);
        if self.sidetone & 0x0F == 0 {
            self.sidetone = (self.sidetone & !0x0F) | 1;
        }
    }

    pub fn paddle_mode(&self) -> PaddleMode {
        PaddleMode::from_mode_register_byte(self.mode_register)
    }

    pub fn set_paddle_mode(&mut self, mode: PaddleMode) {
        self.mode_register = (self.mode_register & !0x30) | mode.to_mode_bits();
    }

    fn mode_flags(&self) -> ModeRegister {
        ModeRegister::from_bits_truncate(self.mode_register)
    }

    pub fn swap_paddles(&self) -> bool {
        self.mode_flags().contains(ModeRegister::SWAP_PADDLES)
    }

    pub fn serial_echo(&self) -> bool {
        self.mode_flags().contains(ModeRegister::SERIAL_ECHO)
    }

    pub fn paddle_echo(&self) -> bool {
        self.mode_flags().contains(ModeRegister::PADDLE_ECHO)
    }

    pub fn pin_config(&self) -> PinConfig {
        PinConfig::from_bits_truncate(self.pin_config)
    }

    /// Side-tone pitch in Hz: `4000 / (sidetone & 0x0F)`. Per spec §9's
    /// open question, the low nibble is clamped to at least 1 by
    /// [`clamp_all`] so this never divides by zero.
    pub fn sidetone_hz(&self) -> u16 {
        4000 / (self.sidetone & 0x0F).max(1) as u16
    }

    /// Load from NV if the magic bytes at offsets 0 and 15 match;
    /// otherwise treat it as an unprogrammed/corrupt store and write
    /// fresh defaults (spec §4.2, §7).
    pub fn load_or_init<P: Platform>(io: &mut P) -> Self {
        let magic0 = io.nv_read(0);
        let magic15 = io.nv_read(15);
        if magic0 == NV_MAGIC && magic15 == 0x00 {
            let mut bytes = [0u8; SETTINGS_LEN];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = io.nv_read(1 + i as u8);
            }
            let settings = Settings::from_bytes(&bytes);
            tracing::debug!(speed = settings.speed, "settings loaded from NV");
            settings
        } else {
            let defaults = Settings::default();
            defaults.save(io);
            tracing::debug!("NV magic mismatch, wrote compile-time defaults");
            defaults
        }
    }

    pub fn save<P: Platform>(&self, io: &mut P) {
        io.nv_write(0, NV_MAGIC);
        for (i, b) in self.to_bytes().iter().enumerate() {
            io.nv_write(1 + i as u8, *b);
        }
        io.nv_write(15, 0x00);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_shim::TestIo;

    #[test]
    fn first_run_writes_defaults() {
        let mut io = TestIo::new();
        let settings = Settings::load_or_init(&mut io);
        assert_eq!(settings, Settings::default());
        assert_eq!(io.nv_read(0), NV_MAGIC);
        assert_eq!(io.nv_read(15), 0x00);
    }

    #[test]
    fn nv_round_trip() {
        let mut io = TestIo::new();
        let mut settings = Settings::default();
        settings.speed = 28;
        settings.ratio = 60;
        settings.save(&mut io);

        let reloaded = Settings::load_or_init(&mut io);
        assert_eq!(reloaded.to_bytes(), settings.to_bytes());
    }

    #[test]
    fn corrupt_magic_resets_to_defaults() {
        let mut io = TestIo::new();
        io.nv_write(0, 0x00);
        let settings = Settings::load_or_init(&mut io);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn clamps_never_reject() {
        let mut s = Settings::default();
        s.speed = 200;
        s.weight = 255;
        s.ratio = 0;
        s.farnsworth = 255;
        s.wpm_range = 255;
        s.sidetone = 0xF0;
        s.clamp_all();
        assert_eq!(s.speed, 40);
        assert_eq!(s.weight, 90);
        assert_eq!(s.ratio, 66);
        assert_eq!(s.farnsworth, 99);
        assert_eq!(s.wpm_range, 31);
        assert_eq!(s.sidetone & 0x0F, 1);
    }

    #[test]
    fn farnsworth_10_and_below_disables() {
        let mut s = Settings::default();
        s.farnsworth = 3;
        s.clamp_all();
        assert_eq!(s.farnsworth, 3);
    }

    #[test]
    fn sidetone_hz_never_divides_by_zero() {
        let mut s = Settings::default();
        s.sidetone = 0;
        s.clamp_all();
        assert_eq!(s.sidetone_hz(), 4000);
    }

    #[test]
    fn paddle_mode_bits_preserved_through_settings() {
        let mut s = Settings::default();
        s.set_paddle_mode(PaddleMode::Ultimatic);
        assert_eq!(s.paddle_mode(), PaddleMode::Ultimatic);
        // Other mode-register bits untouched.
        assert!(s.paddle_echo());
    }
}

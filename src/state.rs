//! Live, non-persisted runtime state (spec §3 "Live state", §4.5): the
//! status byte mirrored to the host, the speed pot reading, host-mode and
//! host-speed overrides, and the paddle bookkeeping the Keyer Engine needs
//! across ticks.
//!
//! Grounded on the teacher's `WinkeyerStatus` bitflags for the bit layout
//! of the status byte; rebuilt as a plain struct since this side only ever
//! sets bits for the device's own status, never parses a received one.

/// `wk_status` bit layout (spec §3, §6): bit0 buffer-near-full, bit1
/// break-in since last report, bit2 keyer busy, bits 6-7 constant high so
/// the byte is always in `0xC0..=0xFF`.
pub const WK_STATUS_NEAR_FULL: u8 = 0x01;
pub const WK_STATUS_BREAKIN: u8 = 0x02;
pub const WK_STATUS_BUSY: u8 = 0x04;
pub const WK_STATUS_CONST_HIGH: u8 = 0xC0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paddle {
    Dot,
    Dash,
}

/// Everything the keyer and protocol engines share but neither persists.
#[derive(Debug, Clone)]
pub struct LiveState {
    /// Currently asserted outputs, mirrored from the last event fired.
    pub cw_stat: bool,
    pub ptt_stat: bool,

    /// Set once the host has sent Admin-Open; cleared on Admin-Close.
    pub host_mode: bool,
    /// Nonzero overrides both the speed pot and `settings.speed` (spec
    /// §4.4 "`wpm` is `host_speed` if nonzero, else `speed`").
    pub host_speed: u8,

    /// `PAUSE 1`/`PAUSE 0`: stops/resumes buffer drain without
    /// interrupting an element already in flight.
    pub pausing: bool,
    /// Set for the duration of a `TUNE 1`/`TUNE 0` bracket.
    pub tuning: bool,

    /// Speed-pot reading, clamped to 0..31, after the analog filter and
    /// the pot-to-range mapping (spec §8 scenario 1).
    pub speed_pot: u8,

    /// Mirrored to the host whenever it changes and host-mode is open.
    pub wk_status: u8,

    /// Raw (pre-mode-adjustment) paddle contact reads, after debounce.
    pub kdot: bool,
    pub kdash: bool,
    pub straight_key: bool,

    /// Dot/dash memory: a paddle closed during an element latches here so
    /// the opposite element still fires once the current one completes.
    pub memdot: bool,
    pub memdash: bool,
    /// Most recently closed paddle, for Ultimatic's last-wins rule.
    pub last_pressed: Option<Paddle>,

    /// Sampled at element start from the *opposite* effective paddle, for
    /// the Iambic-A release rule.
    pub dot_held: bool,
    pub dash_held: bool,

    /// Partial dot/dash pattern being typed live, MSB-growing per
    /// `morse::collector_code`, plus the time of its last change and
    /// whether a space has already been emitted for the current gap.
    pub collector: u8,
    pub collector_last_change_ms: u32,
    pub space_pending_emit: bool,
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveState {
    pub fn new() -> Self {
        Self {
            cw_stat: false,
            ptt_stat: false,
            host_mode: false,
            host_speed: 0,
            pausing: false,
            tuning: false,
            speed_pot: 0,
            wk_status: WK_STATUS_CONST_HIGH,
            kdot: false,
            kdash: false,
            straight_key: false,
            memdot: false,
            memdash: false,
            last_pressed: None,
            dot_held: false,
            dash_held: false,
            collector: crate::morse::NO_CODE,
            collector_last_change_ms: 0,
            space_pending_emit: false,
        }
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.set_bit(WK_STATUS_BUSY, busy);
    }

    pub fn set_breakin(&mut self) {
        self.set_bit(WK_STATUS_BREAKIN, true);
    }

    pub fn clear_breakin(&mut self) {
        self.set_bit(WK_STATUS_BREAKIN, false);
    }

    pub fn set_near_full(&mut self, near_full: bool) {
        self.set_bit(WK_STATUS_NEAR_FULL, near_full);
    }

    fn set_bit(&mut self, bit: u8, on: bool) {
        if on {
            self.wk_status |= bit;
        } else {
            self.wk_status &= !bit;
        }
        self.wk_status |= WK_STATUS_CONST_HIGH;
    }

    pub fn wpm(&self, settings: &crate::settings::Settings) -> u8 {
        if self.host_speed != 0 {
            self.host_speed
        } else {
            settings.speed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bits_independent_and_const_high_sticks() {
        let mut s = LiveState::new();
        s.set_busy(true);
        s.set_breakin();
        assert_eq!(
            s.wk_status,
            WK_STATUS_BUSY | WK_STATUS_BREAKIN | WK_STATUS_CONST_HIGH
        );
        s.set_busy(false);
        assert_eq!(s.wk_status, WK_STATUS_BREAKIN | WK_STATUS_CONST_HIGH);
    }

    #[test]
    fn wpm_prefers_host_speed() {
        let mut settings = crate::settings::Settings::default();
        settings.speed = 20;
        let mut live = LiveState::new();
        assert_eq!(live.wpm(&settings), 20);
        live.host_speed = 35;
        assert_eq!(live.wpm(&settings), 35);
    }
}

//! WinKey Protocol Engine (spec §4.5): a byte-oriented command/response
//! state machine over the host serial link. Consumes one host byte per
//! tick, dispatches single- and multi-byte commands, mutates
//! [`Settings`]/[`RingBuffer`]/[`LiveState`], and mirrors status and
//! speed-pot changes back to the host.
//!
//! Grounded on the teacher's `protocol::command`/`protocol::response`
//! modules for the command-byte and reply-byte catalogue — rebuilt here as
//! a decode-and-dispatch state machine (the teacher only ever encoded
//! outbound commands and parsed inbound responses as a *client*; this side
//! is the *device*, so the same byte catalogue is read instead of written).

use crate::buffer::RingBuffer;
use crate::io_shim::Platform;
use crate::protocol::types::WINKEY_VERSION;
use crate::settings::Settings;
use crate::state::LiveState;

const EEPROM_BYTE_PACING_MS: u32 = 12;
const EEPROM_LEN: u16 = 256;

/// Command dispatch state. Multi-byte commands count consumed bytes in
/// their own variant rather than a shared `inum`, so truncation (the host
/// stopping mid-command) just means the next byte picks up where it left
/// off (spec §7).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cmd {
    Free,
    Admin,
    AdminCalibrate,
    AdminEcho,
    AdminLoadEeprom { received: u16, buf: [u8; 16] },
    AdminDumpEeprom { next_offset: u16, next_send_at: u32 },
    Sidetone,
    Speed,
    Weight,
    Ptt { leg: u8, lead: u8 },
    Potset { leg: u8, min: u8 },
    Pause,
    Pinconfig,
    Tune,
    Farnsworth,
    ModeRegisterByte,
    LoadDefaults { received: u8, buf: [u8; 14] },
    Extension,
    Keycomp,
    Pointer,
    PointerAbsolute,
    PointerZeroFill,
    Ratio,
    Prosign { leg: u8, a: u8 },
}

pub struct ProtocolEngine {
    state: Cmd,
    last_reported_status: u8,
    last_reported_pot: Option<u8>,
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolEngine {
    pub fn new() -> Self {
        Self {
            state: Cmd::Free,
            // Seeded to match `LiveState::new()`'s own initial values so
            // opening host-mode doesn't spuriously mirror a "change" that
            // never actually happened.
            last_reported_status: crate::state::WK_STATUS_CONST_HIGH,
            last_reported_pot: Some(0),
        }
    }

    /// Consume at most one host byte and run the status/pot mirror.
    pub fn step<P: Platform>(
        &mut self,
        io: &mut P,
        settings: &mut Settings,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
    ) {
        if let Some(byte) = io.serial_try_read() {
            self.dispatch(io, settings, live, buffer, byte);
        }
        self.service_replies(io, settings, live);
        self.mirror_status(io, live);
        self.mirror_speed_pot(io, live);
    }

    fn mirror_status<P: Platform>(&mut self, io: &mut P, live: &mut LiveState) {
        let reported = live.wk_status;
        live.clear_breakin();
        if live.host_mode && reported != self.last_reported_status {
            io.serial_write(reported);
        }
        self.last_reported_status = reported;
    }

    fn mirror_speed_pot<P: Platform>(&mut self, io: &mut P, live: &mut LiveState) {
        if self.last_reported_pot != Some(live.speed_pot) {
            if live.host_mode {
                io.serial_write(0x80 | (live.speed_pot & 0x3F));
            }
            self.last_reported_pot = Some(live.speed_pot);
        }
    }

    fn dispatch<P: Platform>(
        &mut self,
        io: &mut P,
        settings: &mut Settings,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
        byte: u8,
    ) {
        match self.state.clone() {
            Cmd::Free => self.dispatch_free(io, live, buffer, byte),
            Cmd::Admin => self.dispatch_admin(io, settings, live, buffer, byte),
            Cmd::AdminCalibrate => {
                self.state = Cmd::Free; // swallow the calibration byte, no effect modeled.
            }
            Cmd::AdminEcho => {
                io.serial_write(byte);
                self.state = Cmd::Free;
            }
            Cmd::AdminLoadEeprom { received, mut buf } => {
                if (received as usize) < buf.len() {
                    buf[received as usize] = byte;
                }
                let received = received + 1;
                if received >= EEPROM_LEN {
                    let mut fields = [0u8; 14];
                    fields.copy_from_slice(&buf[1..15]);
                    *settings = Settings::from_bytes(&fields);
                    settings.save(io);
                    self.state = Cmd::Free;
                } else {
                    self.state = Cmd::AdminLoadEeprom { received, buf };
                }
            }
            Cmd::AdminDumpEeprom { .. } => {
                // The host sent a byte mid-dump; the dump is host→device
                // read-only from here, so just re-dispatch it as a fresh
                // command once the dump completes on a later tick.
                self.state = Cmd::Free;
                self.dispatch_free(io, live, buffer, byte);
            }
            Cmd::Sidetone => {
                settings.sidetone = byte;
                settings.clamp_all();
                self.state = Cmd::Free;
            }
            Cmd::Speed => {
                // 0 means "use the pot"; `live.host_speed` already models
                // exactly that nonzero-overrides-everything rule.
                live.host_speed = byte;
                self.state = Cmd::Free;
            }
            Cmd::Weight => {
                settings.weight = byte;
                settings.clamp_all();
                self.state = Cmd::Free;
            }
            Cmd::Ptt { leg, lead } => {
                if leg == 0 {
                    self.state = Cmd::Ptt { leg: 1, lead: byte };
                } else {
                    settings.lead_in = lead;
                    settings.tail = byte;
                    self.state = Cmd::Free;
                }
            }
            Cmd::Potset { leg, min } => {
                if leg == 0 {
                    self.state = Cmd::Potset { leg: 1, min: byte };
                } else if leg == 1 {
                    settings.min_wpm = min;
                    settings.wpm_range = byte.min(31);
                    self.state = Cmd::Potset { leg: 2, min };
                } else {
                    // Third byte (ignored, per spec).
                    self.state = Cmd::Free;
                }
            }
            Cmd::Pause => {
                live.pausing = byte != 0;
                self.state = Cmd::Free;
            }
            Cmd::Pinconfig => {
                settings.pin_config = byte;
                self.state = Cmd::Free;
            }
            Cmd::Tune => {
                Self::handle_tune(io, live, buffer, byte);
                self.state = Cmd::Free;
            }
            Cmd::Farnsworth => {
                settings.farnsworth = byte;
                settings.clamp_all();
                self.state = Cmd::Free;
            }
            Cmd::ModeRegisterByte => {
                settings.mode_register = byte;
                self.state = Cmd::Free;
            }
            Cmd::LoadDefaults { received, mut buf } => {
                buf[received as usize] = byte;
                let received = received + 1;
                if received >= 14 {
                    *settings = Settings::from_bytes(&buf);
                    self.state = Cmd::Free;
                } else {
                    self.state = Cmd::LoadDefaults { received, buf };
                }
            }
            Cmd::Extension => {
                settings.extension = byte;
                self.state = Cmd::Free;
            }
            Cmd::Keycomp => {
                settings.compensation = byte;
                self.state = Cmd::Free;
            }
            Cmd::Pointer => self.dispatch_pointer(buffer, byte),
            Cmd::PointerAbsolute => {
                buffer.set_write_pos(byte);
                self.state = Cmd::Free;
            }
            Cmd::PointerZeroFill => {
                buffer.zero_fill(byte);
                live.set_near_full(buffer.is_near_full());
                self.state = Cmd::Free;
            }
            Cmd::Ratio => {
                settings.ratio = byte;
                settings.clamp_all();
                self.state = Cmd::Free;
            }
            Cmd::Prosign { leg, a } => {
                if leg == 0 {
                    self.state = Cmd::Prosign { leg: 1, a: byte };
                } else {
                    buffer.enqueue(&[crate::buffer::PROSIGN, a, byte]);
                    live.set_near_full(buffer.is_near_full());
                    self.state = Cmd::Free;
                }
            }
        }
    }

    fn dispatch_free<P: Platform>(
        &mut self,
        io: &mut P,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
        byte: u8,
    ) {
        if !live.host_mode {
            // Outside host-mode, only Admin (command byte 0x00) is parsed.
            if byte == 0x00 {
                self.state = Cmd::Admin;
            }
            return;
        }

        if byte >= 0x20 {
            buffer.enqueue(&[byte]);
            live.set_near_full(buffer.is_near_full());
            return;
        }

        self.state = match byte {
            0x00 => Cmd::Admin,
            0x01 => Cmd::Sidetone,
            0x02 => Cmd::Speed,
            0x03 => Cmd::Weight,
            0x04 => Cmd::Ptt { leg: 0, lead: 0 },
            0x05 => Cmd::Potset { leg: 0, min: 0 },
            0x06 => Cmd::Pause,
            0x07 => {
                io.serial_write(0x80 | (live.speed_pot & 0x3F));
                // The unsolicited mirror later this tick must not repeat
                // what this explicit reply already told the host.
                self.last_reported_pot = Some(live.speed_pot);
                Cmd::Free
            }
            0x08 => {
                buffer.backspace();
                live.set_near_full(buffer.is_near_full());
                Cmd::Free
            }
            0x09 => Cmd::Pinconfig,
            0x0A => {
                buffer.clear();
                live.set_near_full(false);
                Cmd::Free
            }
            0x0B => Cmd::Tune,
            0x0D => Cmd::Farnsworth,
            0x0E => Cmd::ModeRegisterByte,
            0x0F => Cmd::LoadDefaults {
                received: 0,
                buf: [0u8; 14],
            },
            0x10 => Cmd::Extension,
            0x11 => Cmd::Keycomp,
            0x15 => {
                io.serial_write(live.wk_status);
                self.last_reported_status = live.wk_status;
                Cmd::Free
            }
            0x16 => Cmd::Pointer,
            0x17 => Cmd::Ratio,
            0x1B => Cmd::Prosign { leg: 0, a: 0 },
            // Explicit no-ops (spec §4.5): 0x12 PADSW, 0x13 NULLCMD, 0x14
            // SOFTPAD, 0x18 SETPTT, 0x19 KEYBUF, 0x1A WAIT, 0x1C BUFSPD,
            // 0x1D HSCWSPD, 0x1E CANCELSPD, 0x1F BUFNOP.
            0x12 | 0x13 | 0x14 | 0x18 | 0x19 | 0x1A | 0x1C | 0x1D | 0x1E | 0x1F => Cmd::Free,
            _ => Cmd::Free, // unknown command byte: skip, return to FREE.
        };
    }

    fn dispatch_admin<P: Platform>(
        &mut self,
        io: &mut P,
        settings: &mut Settings,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
        sub: u8,
    ) {
        match sub {
            0x00 => self.state = Cmd::AdminCalibrate,
            0x01 => {
                // Reset: reload NV, clear host-mode and host-speed.
                *settings = Settings::load_or_init(io);
                live.host_mode = false;
                live.host_speed = 0;
                self.state = Cmd::Free;
            }
            0x02 => {
                live.host_mode = true;
                io.serial_write(WINKEY_VERSION);
                self.state = Cmd::Free;
            }
            0x03 => {
                live.host_mode = false;
                live.host_speed = 0;
                *settings = Settings::load_or_init(io);
                self.state = Cmd::Free;
            }
            0x04 => self.state = Cmd::AdminEcho,
            0x05 | 0x06 | 0x08 | 0x09 => {
                io.serial_write(0x00);
                self.state = Cmd::Free;
            }
            0x07 => {
                for b in settings.to_bytes() {
                    io.serial_write(b);
                }
                io.serial_write(0x00);
                self.state = Cmd::Free;
            }
            0x0A | 0x0B => {
                // WK1/WK2 mode select: accepted, no behavioral effect.
                self.state = Cmd::Free;
            }
            0x0C => {
                self.state = Cmd::AdminDumpEeprom {
                    next_offset: 0,
                    next_send_at: io.now_ms(),
                };
            }
            0x0D => {
                self.state = Cmd::AdminLoadEeprom {
                    received: 0,
                    buf: [0u8; 16],
                };
            }
            0x0E => {
                // Message playback: accepted, no EEPROM message store here.
                self.state = Cmd::Free;
            }
            _ => self.state = Cmd::Free,
        };
        let _ = buffer; // no admin sub-command touches the ring buffer.
    }

    fn dispatch_pointer(&mut self, buffer: &mut RingBuffer, sub: u8) {
        match sub {
            0x00 => {
                buffer.clear();
                self.state = Cmd::Free;
            }
            0x01 | 0x02 => self.state = Cmd::PointerAbsolute,
            0x03 => self.state = Cmd::PointerZeroFill,
            _ => self.state = Cmd::Free,
        }
    }

    /// `TUNE` (spec §4.4 "Tuning"): `1` brackets on (buffer clear, PTT up
    /// with a 150 ms blocking delay, then key down), `0` brackets off (key
    /// up, 50 ms delay, PTT down).
    fn handle_tune<P: Platform>(io: &mut P, live: &mut LiveState, buffer: &mut RingBuffer, on: u8) {
        if on != 0 {
            buffer.clear();
            live.set_near_full(false);
            live.tuning = true;
            io.set_ptt(true);
            live.ptt_stat = true;
            io.delay_ms(150);
            io.set_cw(true);
            live.cw_stat = true;
        } else {
            io.set_cw(false);
            live.cw_stat = false;
            io.delay_ms(50);
            io.set_ptt(false);
            live.ptt_stat = false;
            live.tuning = false;
        }
    }

    /// Advance the 12 ms-paced EEPROM dump, if one is in progress. Unlike
    /// every other command this emits bytes without consuming a further
    /// host byte, so it runs on every tick rather than from `dispatch`.
    fn service_replies<P: Platform>(&mut self, io: &mut P, settings: &Settings, live: &LiveState) {
        if let Cmd::AdminDumpEeprom {
            next_offset,
            next_send_at,
        } = self.state.clone()
        {
            if io.now_ms() >= next_send_at {
                let value = if next_offset == 0 {
                    crate::settings::NV_MAGIC
                } else if next_offset == 15 {
                    0x00
                } else if (1..=14).contains(&next_offset) {
                    settings.to_bytes()[(next_offset - 1) as usize]
                } else {
                    0
                };
                io.serial_write(value);
                io.drain_midi();
                let next_offset = next_offset + 1;
                if next_offset >= EEPROM_LEN {
                    self.state = Cmd::Free;
                } else {
                    self.state = Cmd::AdminDumpEeprom {
                        next_offset,
                        next_send_at: io.now_ms() + EEPROM_BYTE_PACING_MS,
                    };
                }
            }
        }
        let _ = live;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_shim::TestIo;

    fn run_until_consumed(engine: &mut ProtocolEngine, io: &mut TestIo, settings: &mut Settings, live: &mut LiveState, buffer: &mut RingBuffer) {
        while !io.host_to_device.is_empty() {
            engine.step(io, settings, live, buffer);
            io.advance_ms(1);
        }
        // One extra tick so synchronous replies/mirrors triggered by the
        // last consumed byte are flushed before the caller inspects output.
        engine.step(io, settings, live, buffer);
    }

    #[test]
    fn admin_open_round_trip_and_getpot() {
        let mut engine = ProtocolEngine::new();
        let mut io = TestIo::new();
        let mut settings = Settings::default();
        let mut live = LiveState::new();
        let mut buffer = RingBuffer::new();

        io.host_sends(&[0x00, 0x02]);
        run_until_consumed(&mut engine, &mut io, &mut settings, &mut live, &mut buffer);
        assert_eq!(io.take_device_output(), vec![WINKEY_VERSION]);
        assert!(live.host_mode);

        live.speed_pot = 10;
        io.host_sends(&[0x07]);
        run_until_consumed(&mut engine, &mut io, &mut settings, &mut live, &mut buffer);
        assert_eq!(io.take_device_output(), vec![0x80 | 10]);
    }

    #[test]
    fn text_enqueues_only_in_host_mode() {
        let mut engine = ProtocolEngine::new();
        let mut io = TestIo::new();
        let mut settings = Settings::default();
        let mut live = LiveState::new();
        let mut buffer = RingBuffer::new();

        io.host_sends(b"CQ");
        run_until_consumed(&mut engine, &mut io, &mut settings, &mut live, &mut buffer);
        assert_eq!(buffer.count(), 0);

        live.host_mode = true;
        io.host_sends(b"CQ");
        run_until_consumed(&mut engine, &mut io, &mut settings, &mut live, &mut buffer);
        assert_eq!(buffer.count(), 2);
    }

    #[test]
    fn eeprom_dump_is_256_bytes_with_pacing() {
        let mut engine = ProtocolEngine::new();
        let mut io = TestIo::new();
        let mut settings = Settings::default();
        settings.speed = 25;
        let mut live = LiveState::new();
        let mut buffer = RingBuffer::new();

        io.host_sends(&[0x00, 0x0C]);
        engine.step(&mut io, &mut settings, &mut live, &mut buffer); // consumes 0x00
        engine.step(&mut io, &mut settings, &mut live, &mut buffer); // consumes 0x0C, starts dump

        for _ in 0..(256 * EEPROM_BYTE_PACING_MS as usize + 10) {
            engine.step(&mut io, &mut settings, &mut live, &mut buffer);
            io.advance_ms(1);
        }

        let dumped = io.take_device_output();
        assert_eq!(dumped.len(), 256);
        assert_eq!(dumped[0], crate::settings::NV_MAGIC);
        assert_eq!(dumped[2], 25); // offset 2 = speed field
        assert_eq!(dumped[15], 0x00);
        assert!(dumped[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn prosign_enqueues_marker_and_both_letters() {
        let mut engine = ProtocolEngine::new();
        let mut io = TestIo::new();
        let mut settings = Settings::default();
        let mut live = LiveState::new();
        live.host_mode = true;
        let mut buffer = RingBuffer::new();

        io.host_sends(&[0x1B, b'A', b'R']);
        run_until_consumed(&mut engine, &mut io, &mut settings, &mut live, &mut buffer);

        assert_eq!(buffer.dequeue(), Some(crate::buffer::PROSIGN));
        assert_eq!(buffer.dequeue(), Some(b'A'));
        assert_eq!(buffer.dequeue(), Some(b'R'));
    }

    #[test]
    fn pointer_zero_fill_grows_buffer_count() {
        let mut engine = ProtocolEngine::new();
        let mut io = TestIo::new();
        let mut settings = Settings::default();
        let mut live = LiveState::new();
        live.host_mode = true;
        let mut buffer = RingBuffer::new();

        io.host_sends(&[0x16, 0x03, 5]);
        run_until_consumed(&mut engine, &mut io, &mut settings, &mut live, &mut buffer);
        assert_eq!(buffer.count(), 5);
    }
}

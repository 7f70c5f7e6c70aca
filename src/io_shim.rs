//! Hardware/platform shim: the boundary the spec calls "external
//! collaborators, specified only at their interface" — GPIO, ADC, NV byte
//! store, millisecond clock, and the serial byte channel.
//!
//! Grounded on the teacher's backend-agnostic `Keyer` trait (`keyer.rs`):
//! there we generalized "one async trait object per hardware backend" into
//! "one synchronous trait object per hardware concern", since the core
//! itself never awaits anything — all timing is driven by comparing
//! `now_ms()` snapshots, never by sleeping inside the engines.

use tracing::trace;

/// Everything the core needs from the board: clock, paddle/straight-key
/// reads, CW/PTT writes, the speed pot, the NV byte store, and the serial
/// byte channel to the host. A single trait rather than five separate ones
/// because the Scheduler always needs all of them together and a
/// `&mut dyn Platform` is enough to keep engines hardware-agnostic.
pub trait Platform {
    /// Monotonic milliseconds since an arbitrary epoch. Must never go
    /// backwards.
    fn now_ms(&self) -> u32;

    /// Raw paddle/straight-key reads. `true` = contact closed. Debouncing
    /// happens one layer up (`debounce::Debouncer`); this is the raw pin.
    fn paddle_left_raw(&self) -> bool;
    fn paddle_right_raw(&self) -> bool;
    fn straight_key_raw(&self) -> bool;

    /// Raw speed pot reading, 0..1023.
    fn speed_pot_raw(&self) -> u16;

    /// CW keying output, active per board wiring (the shim owns polarity).
    fn set_cw(&mut self, on: bool);
    /// PTT output, active per board wiring.
    fn set_ptt(&mut self, on: bool);

    /// Non-volatile byte store, 256 bytes, only offsets 0..15 meaningful.
    fn nv_read(&self, offset: u8) -> u8;
    fn nv_write(&mut self, offset: u8, value: u8);

    /// Pull one host-sent byte if the serial receiver has one buffered.
    fn serial_try_read(&mut self) -> Option<u8>;
    /// Push one byte to the host.
    fn serial_write(&mut self, byte: u8);

    /// Drain hook for the external MIDI/side-tone collaborator (spec §5,
    /// scheduler slot 6 and the EEPROM-dump yield points). A no-op shim is
    /// free to do nothing here.
    fn drain_midi(&mut self) {}

    /// Block for approximately `ms` milliseconds. Used only around tuning
    /// (spec §4.4 `TUNE`) and is the one place the core is allowed to
    /// suspend — everywhere else progress is driven by comparing
    /// `now_ms()` against a deadline.
    fn delay_ms(&mut self, ms: u32);
}

/// Four level-triggered edges fired exactly once per state change (spec
/// §6). Kept as its own trait — distinct from `Platform` — because the
/// spec's Design Notes call this out explicitly: "model it as an explicit
/// event-sink abstraction with four methods and a concrete implementation
/// selected at construction," mirroring the teacher's per-backend `Keyer`
/// trait collapsed down to its four essential edges.
pub trait EventSink {
    fn key_on(&mut self);
    fn key_off(&mut self);
    fn ptt_on(&mut self);
    fn ptt_off(&mut self);
}

/// An `EventSink` that does nothing; the default when no tone/MIDI
/// collaborator is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn key_on(&mut self) {
        trace!("key_on (null sink)");
    }
    fn key_off(&mut self) {
        trace!("key_off (null sink)");
    }
    fn ptt_on(&mut self) {
        trace!("ptt_on (null sink)");
    }
    fn ptt_off(&mut self) {
        trace!("ptt_off (null sink)");
    }
}

/// Fully in-memory `Platform`, for tests and the `demos/` binary. Time is
/// advanced explicitly with [`TestIo::advance_ms`] rather than sampled from
/// the OS clock, so scenarios are deterministic.
#[derive(Debug, Default)]
pub struct TestIo {
    pub now_ms: u32,
    pub paddle_left: bool,
    pub paddle_right: bool,
    pub straight_key: bool,
    pub speed_pot: u16,
    pub cw_out: bool,
    pub ptt_out: bool,
    pub nv: [u8; 256],
    pub host_to_device: std::collections::VecDeque<u8>,
    pub device_to_host: Vec<u8>,
    pub midi_drains: u32,
}

impl TestIo {
    pub fn new() -> Self {
        Self {
            nv: [0u8; 256],
            ..Default::default()
        }
    }

    pub fn advance_ms(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    /// Queue bytes as if the host had sent them.
    pub fn host_sends(&mut self, bytes: &[u8]) {
        self.host_to_device.extend(bytes.iter().copied());
    }

    /// Drain and return everything the device has sent to the host so far.
    pub fn take_device_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.device_to_host)
    }
}

impl Platform for TestIo {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }

    fn paddle_left_raw(&self) -> bool {
        self.paddle_left
    }

    fn paddle_right_raw(&self) -> bool {
        self.paddle_right
    }

    fn straight_key_raw(&self) -> bool {
        self.straight_key
    }

    fn speed_pot_raw(&self) -> u16 {
        self.speed_pot
    }

    fn set_cw(&mut self, on: bool) {
        self.cw_out = on;
    }

    fn set_ptt(&mut self, on: bool) {
        self.ptt_out = on;
    }

    fn nv_read(&self, offset: u8) -> u8 {
        self.nv[offset as usize]
    }

    fn nv_write(&mut self, offset: u8, value: u8) {
        self.nv[offset as usize] = value;
    }

    fn serial_try_read(&mut self) -> Option<u8> {
        self.host_to_device.pop_front()
    }

    fn serial_write(&mut self, byte: u8) {
        self.device_to_host.push(byte);
    }

    fn drain_midi(&mut self) {
        self.midi_drains += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance_ms(ms);
    }
}

/// An `EventSink` that records edges for test assertions.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<&'static str>,
}

impl EventSink for RecordingSink {
    fn key_on(&mut self) {
        self.events.push("key_on");
    }
    fn key_off(&mut self) {
        self.events.push("key_off");
    }
    fn ptt_on(&mut self) {
        self.events.push("ptt_on");
    }
    fn ptt_off(&mut self) {
        self.events.push("ptt_off");
    }
}

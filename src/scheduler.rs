//! Cooperative Scheduler (spec §5): an eight-slot round robin dispatching
//! speed recomputation, the protocol engine, the keyer engine (given
//! double weight), and the external MIDI drain hook. Owns the process-wide
//! singletons — settings, ring buffer, live state, and the two engines'
//! own state — for the run's lifetime.
//!
//! Grounded on the teacher's `WinKeyer` struct, which likewise owned one
//! instance each of its transport and protocol pieces and exposed a single
//! entry point per tick; generalized here from an async read-loop around a
//! `tokio_serial` port into a synchronous round robin around a `Platform`.

use crate::buffer::RingBuffer;
use crate::debounce::AnalogFilter;
use crate::io_shim::{EventSink, Platform};
use crate::keyer::Keyer;
use crate::protocol_engine::ProtocolEngine;
use crate::settings::Settings;
use crate::state::LiveState;

const SLOT_COUNT: u8 = 8;

/// Read-only description of what this core supports, for a host-side demo
/// to introspect without adding new protocol surface (SPEC_FULL.md §4).
///
/// Grounded on the teacher's `KeyerCapabilities`, narrowed to the flags
/// that are actually fixed facts about this core rather than per-backend
/// variation — there is only one backend here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub speed_pot: bool,
    pub sidetone: bool,
    pub ptt_control: bool,
    pub paddle_echo: bool,
    pub prosigns: bool,
    pub farnsworth: bool,
}

pub const CAPABILITIES: Capabilities = Capabilities {
    speed_pot: true,
    sidetone: true,
    ptt_control: true,
    paddle_echo: true,
    prosigns: true,
    farnsworth: true,
};

pub struct Scheduler<E: EventSink> {
    pub settings: Settings,
    pub buffer: RingBuffer,
    pub live: LiveState,
    keyer: Keyer,
    protocol: ProtocolEngine,
    sink: E,
    slot: u8,
    pot_filter: AnalogFilter,
}

impl<E: EventSink> Scheduler<E> {
    /// Load settings from NV (or write defaults on first run) and build a
    /// fresh scheduler around them.
    ///
    /// Fails if the loaded settings are internally inconsistent in a way
    /// no amount of clamping the pot reading can paper over at runtime:
    /// `min_wpm + wpm_range` is the pot's full span (spec §8 scenario 1),
    /// and a span that already exceeds the absolute maximum speed means
    /// the top of the pot's range can never be reached.
    pub fn new<P: Platform>(io: &mut P, sink: E) -> crate::Result<Self> {
        let settings = Settings::load_or_init(io);
        if settings.min_wpm as u32 + settings.wpm_range as u32 > 40 {
            return Err(crate::Error::InvalidConfiguration(format!(
                "min_wpm ({}) + wpm_range ({}) exceeds the maximum keyer speed of 40 wpm",
                settings.min_wpm, settings.wpm_range
            )));
        }
        Ok(Self {
            settings,
            buffer: RingBuffer::new(),
            live: LiveState::new(),
            keyer: Keyer::new(),
            protocol: ProtocolEngine::new(),
            sink,
            slot: 0,
            pot_filter: AnalogFilter::new(),
        })
    }

    /// Run one outer iteration: sample the speed pot against the current
    /// slot, then dispatch that slot's behavior. `actual` (spec §5) is
    /// `io.now_ms()`, sampled once here so every engine in this pass sees
    /// the same snapshot.
    pub fn run_once<P: Platform>(&mut self, io: &mut P) {
        let now = io.now_ms();

        match self.slot {
            0 => self.recompute_speed(io, now),
            2 => self.report_sidetone_state(),
            4 => self.protocol.step(io, &mut self.settings, &mut self.live, &mut self.buffer),
            6 => io.drain_midi(),
            1 | 3 | 5 | 7 => self
                .keyer
                .step(io, &mut self.sink, &self.settings, &mut self.live, &mut self.buffer),
            _ => unreachable!("slot is always taken mod SLOT_COUNT"),
        }

        self.slot = (self.slot + 1) % SLOT_COUNT;
    }

    /// Run forever, one [`run_once`](Self::run_once) per call to
    /// `io.delay_ms(0)` — callers that own the outer loop (e.g. `main`)
    /// should call this in a `loop {}`; it never returns on its own.
    pub fn run_forever<P: Platform>(&mut self, io: &mut P) -> ! {
        loop {
            self.run_once(io);
        }
    }

    /// Slot 0: low-pass the raw pot reading, map it onto the `0..=wpm_range`
    /// span, and keep `settings.speed` synchronized with it whenever the
    /// host hasn't pinned an explicit speed (spec §3 "speed ... overridden
    /// by pot if enabled", §8 scenario 1's pot-to-range formula).
    fn recompute_speed<P: Platform>(&mut self, io: &mut P, now: u32) {
        let filtered = self.pot_filter.poll(now, io.speed_pot_raw()) as u32;
        let range = self.settings.wpm_range as u32;
        let pot_value = if range == 0 {
            0
        } else {
            ((filtered * range + 8180) / 16368).min(range)
        };
        self.live.speed_pot = pot_value as u8;

        if self.live.host_speed == 0 {
            self.settings.speed = (self.settings.min_wpm as u32 + pot_value).clamp(5, 40) as u8;
        }
    }

    /// Fixed capability flags for this core (SPEC_FULL.md §4).
    pub fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    /// The event sink this scheduler was built with, for tests that need
    /// to inspect what it recorded.
    pub fn sink(&self) -> &E {
        &self.sink
    }

    /// Slot 2: recompute the side-tone pitch so an external tone
    /// collaborator wired up at this interface point always sees a current
    /// value; the side-tone subsystem itself is out of scope (spec §1).
    fn report_sidetone_state(&mut self) {
        let _pitch_hz = self.settings.sidetone_hz();
        let _enabled = self.settings.pin_config().contains(crate::protocol::types::PinConfig::SIDETONE_ENABLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_shim::{NullSink, TestIo};

    #[test]
    fn eight_slots_cover_both_engines_every_rotation() {
        let mut io = TestIo::new();
        let mut sched = Scheduler::new(&mut io, NullSink).unwrap();
        for _ in 0..SLOT_COUNT {
            sched.run_once(&mut io);
            io.advance_ms(1);
        }
        assert_eq!(sched.slot, 0);
    }

    #[test]
    fn buffered_text_is_keyed_through_full_rotation() {
        let mut io = TestIo::new();
        let mut sched = Scheduler::new(&mut io, NullSink).unwrap();
        sched.live.host_mode = true;
        sched.buffer.enqueue(b"E");

        for _ in 0..5000 {
            sched.run_once(&mut io);
            io.advance_ms(1);
        }

        assert_eq!(sched.buffer.count(), 0);
    }

    #[test]
    fn pot_drives_speed_when_host_has_not_pinned_one() {
        let mut io = TestIo::new();
        let mut sched = Scheduler::new(&mut io, NullSink).unwrap();
        sched.settings.min_wpm = 10;
        sched.settings.wpm_range = 20;
        io.speed_pot = 1023;

        for _ in 0..100 {
            sched.run_once(&mut io);
            io.advance_ms(1);
        }

        assert!(sched.settings.speed > 10);
        assert!(sched.settings.speed <= 40);
    }

    #[test]
    fn new_rejects_a_pot_span_that_cannot_reach_max_speed() {
        let mut io = TestIo::new();
        // Persist an inconsistent min/range pair directly into NV so
        // `load_or_init` picks it up rather than compile-time defaults.
        let mut settings = Settings::default();
        settings.min_wpm = 30;
        settings.wpm_range = 20;
        settings.save(&mut io);

        let result = Scheduler::new(&mut io, NullSink);
        assert!(matches!(result, Err(crate::Error::InvalidConfiguration(_))));
    }
}

//! Keyer Engine (spec §4.4): the twelve-state paddle/straight-key-to-Morse
//! machine. Drives `key_on`/`key_off`/`ptt_on`/`ptt_off` through an
//! [`EventSink`] and reads/writes board pins through a [`Platform`]; timing
//! is derived fresh from [`Settings`] every tick rather than cached across
//! speed changes.
//!
//! Grounded on the teacher's per-backend `Keyer` trait for the event-edge
//! shape (`key_on`/`key_off`/`ptt_on`/`ptt_off`, fired exactly once per
//! transition via a guard flag) — generalized here from "one async
//! implementation per board" into one synchronous state machine advanced
//! by repeated, non-blocking `step()` calls.

use crate::buffer::{RingBuffer, BUF_NOP, PROSIGN};
use crate::debounce::Debouncer;
use crate::io_shim::{EventSink, Platform};
use crate::morse;
use crate::protocol::types::{PaddleMode, PinConfig};
use crate::settings::Settings;
use crate::state::{LiveState, Paddle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyerState {
    Check,
    StartDot,
    StartDash,
    StartStraight,
    SendDot,
    SendDash,
    SendStraight,
    DotDelay,
    DashDelay,
    SndPtt,
    SndEle,
    SndDelay,
}

/// Timing derived from the latched WPM and the ratio/weight/compensation/
/// Farnsworth/hang parameters (spec §4.4 "Derived timing").
#[derive(Debug, Clone, Copy)]
struct Timing {
    dot: u32,
    dash: u32,
    ele_pause: u32,
    char_pause: u32,
    word_pause: u32,
    hang: u32,
}

impl Timing {
    fn compute(wpm: u8, settings: &Settings) -> Self {
        let wpm = wpm.max(1) as i32;
        let dot0 = 1200 / wpm;
        let mut dot = dot0;
        let mut dash = (3 * settings.ratio as i32 * dot) / 50;
        let mut ele_pause = dot;
        let mut char_pause = 2 * dot;
        let mut word_pause = 4 * dot;

        let farnsworth = settings.farnsworth as i32;
        if farnsworth > 10 && farnsworth < wpm {
            let u = 3158 / farnsworth - 31 * dot / 19;
            char_pause = 3 * u - dot;
            word_pause = 7 * u - char_pause;
        }

        let weight = settings.weight as i32;
        if weight != 50 {
            let delta = (weight - 50) * dot / 50;
            dot += delta;
            dash += delta;
            ele_pause -= delta;
        }

        let comp = settings.compensation as i32;
        if comp != 0 {
            dot += comp;
            dash += comp;
            ele_pause -= comp;
        }

        let hang = if settings.tail != 0 && settings.pin_config().contains(PinConfig::PTT_ENABLE) {
            10 * settings.tail as i32
        } else {
            match settings.pin_config().hang_bits() {
                0 => 8 * dot,
                1 => 9 * dot,
                2 => 11 * dot,
                _ => 15 * dot,
            }
        };

        Self {
            dot: dot.max(1) as u32,
            dash: dash.max(1) as u32,
            ele_pause: ele_pause.max(0) as u32,
            char_pause: char_pause.max(0) as u32,
            word_pause: word_pause.max(0) as u32,
            hang: hang.max(0) as u32,
        }
    }
}

pub struct Keyer {
    state: KeyerState,
    deadline_ms: u32,
    dot_debounce: Debouncer,
    dash_debounce: Debouncer,
    straight_debounce: Debouncer,
    timing: Timing,
    run_elements: u32,
    sending: u8,
    prosign: bool,
    straight_press_start_ms: u32,
}

impl Default for Keyer {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyer {
    pub fn new() -> Self {
        Self {
            state: KeyerState::Check,
            deadline_ms: 0,
            dot_debounce: Debouncer::new(false),
            dash_debounce: Debouncer::new(false),
            straight_debounce: Debouncer::new(false),
            timing: Timing {
                dot: 60,
                dash: 180,
                ele_pause: 60,
                char_pause: 120,
                word_pause: 240,
                hang: 480,
            },
            run_elements: 0,
            sending: morse::NO_CODE,
            prosign: false,
            straight_press_start_ms: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, KeyerState::Check)
    }

    fn effective_straight(settings: &Settings, live: &LiveState) -> bool {
        live.straight_key || (settings.paddle_mode() == PaddleMode::Bug && live.kdash)
    }

    /// Apply paddle swap, Bug (dash folded into straight key), and
    /// Ultimatic (last-pressed wins when both are closed) rewrites.
    fn effective_paddles(settings: &Settings, live: &LiveState) -> (bool, bool) {
        let (mut kdot, mut kdash) = (live.kdot, live.kdash);
        if settings.swap_paddles() {
            core::mem::swap(&mut kdot, &mut kdash);
        }
        match settings.paddle_mode() {
            PaddleMode::Bug => (kdot, false),
            PaddleMode::Ultimatic if kdot && kdash => match live.last_pressed {
                Some(Paddle::Dash) => (false, true),
                _ => (true, false),
            },
            _ => (kdot, kdash),
        }
    }

    /// Bug mode suppresses the dash memory: the contact behaves as a
    /// straight key, not a latching paddle.
    fn eff_memdash(settings: &Settings, live: &LiveState) -> bool {
        live.memdash && settings.paddle_mode() != PaddleMode::Bug
    }

    fn on_element_start(settings: &Settings, live: &mut LiveState, starting_dot: bool) {
        let (eff_dot, eff_dash) = Self::effective_paddles(settings, live);
        if starting_dot {
            live.dash_held = eff_dash;
            live.memdot = false;
        } else {
            live.dot_held = eff_dot;
            live.memdash = false;
        }
    }

    fn append_collector(live: &mut LiveState, now: u32, dash: bool) {
        live.collector = (live.collector << 1) | u8::from(dash);
        live.collector_last_change_ms = now;
        live.space_pending_emit = false;
    }

    fn key_on<P: Platform, E: EventSink>(io: &mut P, sink: &mut E, live: &mut LiveState) {
        if !live.cw_stat {
            io.set_cw(true);
            sink.key_on();
            live.cw_stat = true;
        }
    }

    fn key_off<P: Platform, E: EventSink>(io: &mut P, sink: &mut E, live: &mut LiveState) {
        if live.cw_stat {
            io.set_cw(false);
            sink.key_off();
            live.cw_stat = false;
        }
    }

    fn lower_ptt<P: Platform, E: EventSink>(io: &mut P, sink: &mut E, live: &mut LiveState) {
        if live.ptt_stat {
            io.set_ptt(false);
            sink.ptt_off();
            live.ptt_stat = false;
        }
    }

    /// Raise PTT if configured and not already up; returns the deadline to
    /// wait for (`now + lead_in` if PTT just went up, else `now`).
    fn raise_ptt_if_needed<P: Platform, E: EventSink>(
        io: &mut P,
        sink: &mut E,
        now: u32,
        settings: &Settings,
        live: &mut LiveState,
    ) -> u32 {
        if settings.pin_config().contains(PinConfig::PTT_ENABLE) && !live.ptt_stat {
            io.set_ptt(true);
            sink.ptt_on();
            live.ptt_stat = true;
            now + settings.lead_in as u32 * 10
        } else {
            now
        }
    }

    /// Read the next shift-register bit and advance it; returns the
    /// duration of the element it names.
    fn start_element(&mut self) -> u32 {
        let (is_dash, rest) = morse::next_element(self.sending);
        self.sending = rest;
        self.run_elements += 1;
        if is_dash {
            self.timing.dash
        } else {
            self.timing.dot
        }
    }

    /// WPM is latched fresh on entering `CHECK`, and again mid-run once
    /// more than five elements have been sent without returning there, so
    /// a long dot/dash stream still tracks a pot or host speed change
    /// (spec §4.4).
    fn relatch_if_long_run(&mut self, settings: &Settings, live: &LiveState) {
        if self.run_elements > 5 {
            self.timing = Timing::compute(live.wpm(settings), settings);
        }
    }

    fn poll_paddles<P: Platform>(&mut self, io: &P, now: u32, live: &mut LiveState) {
        if let Some(closed) = self.dot_debounce.poll(now, io.paddle_left_raw()) {
            live.kdot = closed;
            if closed {
                live.memdot = true;
                live.last_pressed = Some(Paddle::Dot);
            }
        }
        if let Some(closed) = self.dash_debounce.poll(now, io.paddle_right_raw()) {
            live.kdash = closed;
            if closed {
                live.memdash = true;
                live.last_pressed = Some(Paddle::Dash);
            }
        }
        if let Some(closed) = self.straight_debounce.poll(now, io.straight_key_raw()) {
            live.straight_key = closed;
        }
    }

    fn poll_collector_timeout<P: Platform>(
        &mut self,
        io: &mut P,
        now: u32,
        settings: &Settings,
        live: &mut LiveState,
    ) {
        let silence = now.wrapping_sub(live.collector_last_change_ms);
        let echo_enabled = settings.paddle_echo() && live.host_mode;
        if live.collector != morse::NO_CODE && silence >= 2 * self.timing.dot {
            if echo_enabled {
                if let Some(ascii) = morse::decode(live.collector) {
                    io.serial_write(ascii);
                }
            }
            live.collector = morse::NO_CODE;
            live.collector_last_change_ms = now;
        } else if live.collector == morse::NO_CODE
            && !live.space_pending_emit
            && silence >= 6 * self.timing.dot
        {
            if echo_enabled {
                io.serial_write(b' ');
            }
            live.space_pending_emit = true;
        }
    }

    /// Advance the state machine by one non-blocking tick.
    pub fn step<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
    ) {
        let now = io.now_ms();
        self.poll_paddles(io, now, live);
        self.poll_collector_timeout(io, now, settings, live);

        if live.tuning {
            let (eff_dot, eff_dash) = Self::effective_paddles(settings, live);
            if eff_dot || eff_dash || Self::effective_straight(settings, live) {
                live.tuning = false;
                Self::key_off(io, sink, live);
                Self::lower_ptt(io, sink, live);
            }
            live.set_busy(false);
            return;
        }

        // Break-in: any key pressed while buffered text is being sent
        // immediately cancels it and hands control back to the paddle.
        if matches!(
            self.state,
            KeyerState::SndPtt | KeyerState::SndEle | KeyerState::SndDelay
        ) {
            let (eff_dot, eff_dash) = Self::effective_paddles(settings, live);
            if eff_dot || eff_dash || Self::effective_straight(settings, live) {
                buffer.clear();
                live.set_near_full(false);
                live.set_breakin();
                Self::key_off(io, sink, live);
                self.sending = morse::NO_CODE;
                self.prosign = false;
                self.state = KeyerState::Check;
                self.deadline_ms = now;
            }
        }

        match self.state {
            KeyerState::Check => self.tick_check(io, sink, settings, live, buffer, now),
            KeyerState::StartDot => self.tick_start_dot(io, sink, settings, live, now),
            KeyerState::StartDash => self.tick_start_dash(io, sink, settings, live, now),
            KeyerState::StartStraight => self.tick_start_straight(io, sink, settings, live, now),
            KeyerState::SendDot => self.tick_send_dot(io, sink, live, now),
            KeyerState::SendDash => self.tick_send_dash(io, sink, live, now),
            KeyerState::SendStraight => self.tick_send_straight(io, sink, settings, live, now),
            KeyerState::DotDelay => self.tick_element_delay(settings, live, now, true),
            KeyerState::DashDelay => self.tick_element_delay(settings, live, now, false),
            KeyerState::SndPtt => self.tick_snd_ptt(io, sink, settings, live, now),
            KeyerState::SndEle => self.tick_snd_ele(io, sink, live, now),
            KeyerState::SndDelay => self.tick_snd_delay(io, sink, settings, live, now),
        }

        live.set_busy(!matches!(self.state, KeyerState::Check));
    }

    fn tick_check<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
        now: u32,
    ) {
        let wpm = live.wpm(settings);
        self.timing = Timing::compute(wpm, settings);
        self.run_elements = 0;

        if Self::effective_straight(settings, live) {
            self.deadline_ms = Self::raise_ptt_if_needed(io, sink, now, settings, live);
            self.state = KeyerState::StartStraight;
            return;
        }

        let (eff_dot, eff_dash) = Self::effective_paddles(settings, live);
        if eff_dot || live.memdot {
            live.memdot = false;
            self.deadline_ms = Self::raise_ptt_if_needed(io, sink, now, settings, live);
            self.state = KeyerState::StartDot;
            return;
        }
        if eff_dash || Self::eff_memdash(settings, live) {
            live.memdash = false;
            self.deadline_ms = Self::raise_ptt_if_needed(io, sink, now, settings, live);
            self.state = KeyerState::StartDash;
            return;
        }

        if !live.pausing && buffer.count() > 0 {
            let byte = buffer.dequeue().expect("count()>0 implies dequeue succeeds");
            live.set_near_full(buffer.is_near_full());

            if byte == PROSIGN {
                self.prosign = true;
                return;
            }
            if byte == BUF_NOP {
                return;
            }

            if settings.serial_echo() && live.host_mode {
                io.serial_write(byte.to_ascii_uppercase());
            }

            if byte == b' ' {
                self.sending = morse::NO_CODE;
                self.deadline_ms = now + self.timing.word_pause;
                self.state = KeyerState::SndDelay;
                return;
            }

            let code = morse::tx_code(byte.to_ascii_uppercase());
            if morse::is_complete(code) {
                return;
            }
            self.sending = code;
            self.run_elements = 0;
            self.deadline_ms = Self::raise_ptt_if_needed(io, sink, now, settings, live);
            self.state = KeyerState::SndPtt;
            return;
        }

        if live.ptt_stat && now >= self.deadline_ms {
            Self::lower_ptt(io, sink, live);
        }
    }

    fn tick_start_dot<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        self.relatch_if_long_run(settings, live);
        Self::on_element_start(settings, live, true);
        Self::key_on(io, sink, live);
        self.run_elements += 1;
        self.deadline_ms = now + self.timing.dot;
        self.state = KeyerState::SendDot;
    }

    fn tick_start_dash<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        self.relatch_if_long_run(settings, live);
        Self::on_element_start(settings, live, false);
        Self::key_on(io, sink, live);
        self.run_elements += 1;
        self.deadline_ms = now + self.timing.dash;
        self.state = KeyerState::SendDash;
    }

    fn tick_start_straight<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        if Self::effective_straight(settings, live) {
            Self::key_on(io, sink, live);
            self.straight_press_start_ms = now;
            self.state = KeyerState::SendStraight;
        } else {
            self.deadline_ms = now + self.timing.hang;
            self.state = KeyerState::Check;
        }
    }

    fn tick_send_dot<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        Self::key_off(io, sink, live);
        Self::append_collector(live, now, false);
        self.deadline_ms = now + self.timing.ele_pause;
        self.state = KeyerState::DotDelay;
    }

    fn tick_send_dash<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        Self::key_off(io, sink, live);
        Self::append_collector(live, now, true);
        self.deadline_ms = now + self.timing.ele_pause;
        self.state = KeyerState::DashDelay;
    }

    fn tick_send_straight<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        now: u32,
    ) {
        if Self::effective_straight(settings, live) {
            return;
        }
        Self::key_off(io, sink, live);
        let held = now.wrapping_sub(self.straight_press_start_ms);
        let is_dash = held > 2 * self.timing.ele_pause;
        Self::append_collector(live, now, is_dash);
        self.deadline_ms = now + self.timing.hang;
        self.state = KeyerState::Check;
    }

    /// Shared Iambic decision for `DotDelay`/`DashDelay`: the opposite
    /// paddle's latched "held" flag takes priority (true alternation),
    /// then the same paddle's memory, else return to `CHECK` to start the
    /// hang countdown (spec §4.4).
    fn tick_element_delay(&mut self, settings: &Settings, live: &mut LiveState, now: u32, was_dot: bool) {
        if now < self.deadline_ms {
            return;
        }
        let iambic_a = settings.paddle_mode() == PaddleMode::IambicA;
        let (eff_dot, eff_dash) = Self::effective_paddles(settings, live);
        let hang_remainder = self.timing.hang.saturating_sub(self.timing.ele_pause);

        if was_dot {
            if iambic_a && !eff_dot && !eff_dash {
                live.dash_held = false;
            }
            if Self::eff_memdash(settings, live) || eff_dash || live.dash_held {
                live.memdash = false;
                self.deadline_ms = now;
                self.state = KeyerState::StartDash;
            } else if eff_dot || live.memdot {
                live.memdot = false;
                self.deadline_ms = now;
                self.state = KeyerState::StartDot;
            } else {
                self.deadline_ms = now + hang_remainder;
                self.state = KeyerState::Check;
            }
        } else {
            if iambic_a && !eff_dot && !eff_dash {
                live.dot_held = false;
            }
            if eff_dot || live.memdot || live.dot_held {
                live.memdot = false;
                self.deadline_ms = now;
                self.state = KeyerState::StartDot;
            } else if eff_dash || Self::eff_memdash(settings, live) {
                live.memdash = false;
                self.deadline_ms = now;
                self.state = KeyerState::StartDash;
            } else {
                self.deadline_ms = now + hang_remainder;
                self.state = KeyerState::Check;
            }
        }
    }

    fn tick_snd_ptt<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        self.relatch_if_long_run(settings, live);
        let dur = self.start_element();
        Self::key_on(io, sink, live);
        self.deadline_ms = now + dur;
        self.state = KeyerState::SndEle;
    }

    fn tick_snd_ele<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        Self::key_off(io, sink, live);
        let mut deadline = now + self.timing.ele_pause;
        if morse::is_complete(self.sending) {
            if self.prosign {
                self.prosign = false;
            } else {
                deadline += self.timing.char_pause;
            }
        }
        self.deadline_ms = deadline;
        self.state = KeyerState::SndDelay;
    }

    fn tick_snd_delay<P: Platform, E: EventSink>(
        &mut self,
        io: &mut P,
        sink: &mut E,
        settings: &Settings,
        live: &mut LiveState,
        now: u32,
    ) {
        if now < self.deadline_ms {
            return;
        }
        if morse::is_complete(self.sending) {
            self.state = KeyerState::Check;
            return;
        }
        self.relatch_if_long_run(settings, live);
        let dur = self.start_element();
        Self::key_on(io, sink, live);
        self.deadline_ms = now + dur;
        self.state = KeyerState::SndEle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_shim::{RecordingSink, TestIo};

    fn run_ticks(
        keyer: &mut Keyer,
        io: &mut TestIo,
        sink: &mut RecordingSink,
        settings: &Settings,
        live: &mut LiveState,
        buffer: &mut RingBuffer,
        ticks: u32,
    ) {
        for _ in 0..ticks {
            keyer.step(io, sink, settings, live, buffer);
            io.advance_ms(1);
        }
    }

    #[test]
    fn serial_echo_mirrors_buffered_characters_in_host_mode() {
        let mut keyer = Keyer::new();
        let mut io = TestIo::new();
        let mut sink = RecordingSink::default();
        let settings = Settings::default(); // serial echo is on by default
        let mut live = LiveState::new();
        live.host_mode = true;
        let mut buffer = RingBuffer::new();
        buffer.enqueue(b"cq");

        run_ticks(&mut keyer, &mut io, &mut sink, &settings, &mut live, &mut buffer, 4000);

        let echoed = io.take_device_output();
        assert_eq!(echoed, b"CQ");
    }

    #[test]
    fn serial_echo_silent_outside_host_mode() {
        let mut keyer = Keyer::new();
        let mut io = TestIo::new();
        let mut sink = RecordingSink::default();
        let settings = Settings::default();
        let mut live = LiveState::new(); // host_mode left false
        let mut buffer = RingBuffer::new();
        buffer.enqueue(b"cq");

        run_ticks(&mut keyer, &mut io, &mut sink, &settings, &mut live, &mut buffer, 4000);

        assert!(io.take_device_output().is_empty());
    }

    #[test]
    fn single_dot_paddle_press_produces_one_element() {
        let mut keyer = Keyer::new();
        let mut io = TestIo::new();
        let mut sink = RecordingSink::default();
        let settings = Settings::default();
        let mut live = LiveState::new();
        let mut buffer = RingBuffer::new();

        io.paddle_left = true;
        run_ticks(&mut keyer, &mut io, &mut sink, &settings, &mut live, &mut buffer, 5);
        io.paddle_left = false;
        run_ticks(&mut keyer, &mut io, &mut sink, &settings, &mut live, &mut buffer, 300);

        assert_eq!(
            sink.events.iter().filter(|e| **e == "key_on").count(),
            1,
            "{:?}",
            sink.events
        );
        assert_eq!(sink.events.iter().filter(|e| **e == "key_off").count(), 1);
    }

    #[test]
    fn iambic_b_tail_dot_after_dash_hold() {
        // Press dot, then press dash while the dot is sounding, release
        // both during the dash: Iambic-B emits dot, dash, dot (spec §8
        // scenario 3).
        let mut keyer = Keyer::new();
        let mut io = TestIo::new();
        let mut sink = RecordingSink::default();
        let settings = Settings::default(); // Iambic-B is the default mode.
        let mut live = LiveState::new();
        let mut buffer = RingBuffer::new();

        io.paddle_left = true;
        for _ in 0..20 {
            keyer.step(&mut io, &mut sink, &settings, &mut live, &mut buffer);
            io.advance_ms(1);
            if !keyer.is_idle() {
                io.paddle_right = true;
                break;
            }
        }
        run_ticks(&mut keyer, &mut io, &mut sink, &settings, &mut live, &mut buffer, 30);
        io.paddle_left = false;
        io.paddle_right = false;
        run_ticks(&mut keyer, &mut io, &mut sink, &settings, &mut live, &mut buffer, 400);

        let key_ons = sink.events.iter().filter(|e| **e == "key_on").count();
        // dot, dash, and the Iambic-B tail dot.
        assert_eq!(key_ons, 3, "{:?}", sink.events);
    }

    #[test]
    fn break_in_clears_buffer_and_sets_status_flag() {
        let mut keyer = Keyer::new();
        let mut io = TestIo::new();
        let mut sink = RecordingSink::default();
        let settings = Settings::default();
        let mut live = LiveState::new();
        let mut buffer = RingBuffer::new();
        buffer.enqueue(b"CQ CQ DE");

        for _ in 0..200 {
            keyer.step(&mut io, &mut sink, &settings, &mut live, &mut buffer);
            io.advance_ms(1);
            if matches!(keyer.state, KeyerState::SndEle) {
                io.paddle_left = true;
                break;
            }
        }
        keyer.step(&mut io, &mut sink, &settings, &mut live, &mut buffer);

        assert_eq!(buffer.count(), 0);
        assert!(live.wk_status & crate::state::WK_STATUS_BREAKIN != 0);
    }

    #[test]
    fn ultimatic_last_pressed_wins() {
        let mut settings = Settings::default();
        settings.set_paddle_mode(PaddleMode::Ultimatic);
        let mut live = LiveState::new();
        live.kdash = true;
        live.kdot = true;
        live.last_pressed = Some(Paddle::Dot);

        let (eff_dot, eff_dash) = Keyer::effective_paddles(&settings, &live);
        assert!(eff_dot);
        assert!(!eff_dash);
    }

    #[test]
    fn bug_mode_suppresses_dash_memory_and_paddle() {
        let mut settings = Settings::default();
        settings.set_paddle_mode(PaddleMode::Bug);
        let mut live = LiveState::new();
        live.kdash = true;
        live.memdash = true;

        let (_, eff_dash) = Keyer::effective_paddles(&settings, &live);
        assert!(!eff_dash);
        assert!(!Keyer::eff_memdash(&settings, &live));
    }
}

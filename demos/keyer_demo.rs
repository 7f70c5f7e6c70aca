//! Demonstrates the Scheduler driving both engines against an in-memory
//! `TestIo`: Admin-Open, a buffered text send, and the paddle's Morse
//! output printed as dots/dashes as they key.
//!
//! This is not a hardware bring-up tool — no real serial port or GPIO is
//! touched. Run with `cargo run --example keyer_demo` once a real
//! `Platform`/`EventSink` pair is wired up for actual hardware.

use cw_keyer::{EventSink, Platform, Scheduler, TestIo};

struct PrintingSink;

impl EventSink for PrintingSink {
    fn key_on(&mut self) {
        print!(".");
        use std::io::Write;
        std::io::stdout().flush().ok();
    }
    fn key_off(&mut self) {}
    fn ptt_on(&mut self) {}
    fn ptt_off(&mut self) {
        println!();
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut io = TestIo::new();
    let mut scheduler = Scheduler::new(&mut io, PrintingSink).expect("default settings are valid");

    println!("capabilities: {:?}", scheduler.capabilities());

    // Host opens the link (Admin 0x00, Open 0x02) and sends "CQ".
    io.host_sends(&[0x00, 0x02]);
    io.host_sends(b"CQ");

    for _ in 0..20_000 {
        scheduler.run_once(&mut io);
        io.advance_ms(1);
    }

    let reply = io.take_device_output();
    println!("device -> host bytes: {reply:?}");
}

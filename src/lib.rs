//! A synchronous Morse (CW) keyer and WinKey (K1EL) v2.3-subset serial
//! protocol engine, driven by a cooperative eight-slot scheduler.
//!
//! The crate is split along the same seam the spec draws between the two
//! engines: [`keyer`] turns paddle/straight-key contacts into precisely
//! timed CW, [`protocol_engine`] speaks the WinKey wire protocol, and
//! [`scheduler`] round-robins the two against a [`io_shim::Platform`]
//! hardware shim. Nothing here touches a thread, a socket, or the OS
//! clock directly — every external effect goes through `Platform` or
//! `io_shim::EventSink`, so the whole crate runs identically against a
//! real board or the in-memory `TestIo` harness.

pub mod buffer;
pub mod debounce;
pub mod error;
pub mod io_shim;
pub mod keyer;
pub mod morse;
pub mod protocol;
pub mod protocol_engine;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use buffer::RingBuffer;
pub use error::{Error, Result};
pub use io_shim::{EventSink, NullSink, Platform, RecordingSink, TestIo};
pub use keyer::Keyer;
pub use protocol::types::{ModeRegister, PaddleMode, PinConfig, WINKEY_VERSION};
pub use protocol_engine::ProtocolEngine;
pub use scheduler::{Capabilities, Scheduler, CAPABILITIES};
pub use settings::Settings;
pub use state::{LiveState, Paddle};

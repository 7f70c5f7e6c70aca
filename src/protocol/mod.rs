//! WinKey (K1EL) wire-format constants and bit layouts shared by the
//! protocol engine: command byte values, the mode register, and the pin
//! configuration register.

pub mod types;

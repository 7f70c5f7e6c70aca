//! Error and Result types for the core crate.
//!
//! The engines themselves have no fatal error path (see spec §7): bad
//! parameters clamp, unknown protocol bytes are skipped, corrupt NV is
//! treated as first-run. `Error` is reserved for programming misuse at
//! construction time, not for runtime keying/protocol conditions.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Decoding errors for the SST container format.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SstError {
    /// The input is not current-format SST data: bad magic, or a header too
    /// short to be the 16-byte layout. Older header variants are rejected
    /// here as well rather than guessed at.
    #[error("data is not SST format")]
    NotSst,
}

pub type Result<T> = eyre::Result<T>;

//! Error types for the one-wire backlight library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving the backlight.
#[derive(Error, Debug)]
pub enum Error {
    /// The host requested a light this module does not provide.
    #[error("unsupported light: {0}")]
    UnsupportedLight(String),

    /// Backlight device node could not be opened or written.
    #[error("backlight I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Status code for the host framework: always a negative errno value.
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::UnsupportedLight(_) => -libc::EINVAL,
            Error::Io(err) => -err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

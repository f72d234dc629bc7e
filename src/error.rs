//! Error types for the printer poller and LED output.
//!
//! Poll failures (`Request`, `Api`, `MalformedResponse`) are transient: the
//! main loop keeps the last good snapshot and tries again next cycle.
//! `HardwareWrite` costs one frame. The rest only happen at startup.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Printer unreachable, connection reset, or request timed out.
    #[error("printer request failed: {0}")]
    Request(String),

    /// Printer answered with a non-success status code.
    #[error("printer returned HTTP {status} for {url}")]
    Api { status: u16, url: String },

    /// Response body was not JSON at all.
    #[error("malformed printer response: {0}")]
    MalformedResponse(String),

    /// Pushing a frame to the strip failed.
    #[error("LED write failed: {0}")]
    HardwareWrite(String),

    /// The LED driver could not claim its pins or DMA channel.
    #[error("LED driver initialization failed: {0}")]
    HardwareInit(String),

    /// Ctrl+C handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the main loop should simply retry on the next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Request(_) | Error::Api { .. } | Error::MalformedResponse(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::MalformedResponse(err.to_string())
        } else {
            Error::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

impl From<ctrlc::Error> for Error {
    fn from(err: ctrlc::Error) -> Self {
        Error::Signal(err.to_string())
    }
}

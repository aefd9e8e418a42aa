//! Errors raised by the host bridge.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Host channel is disconnected")]
    Disconnected,

    #[error("Host rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("Malformed response from host: {0}")]
    MalformedResponse(String),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid bridge settings at {path}: {message}")]
    Settings { path: PathBuf, message: String },
}

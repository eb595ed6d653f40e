use std::path::PathBuf;

use thiserror::Error;

/// A pixel buffer the sensing engine can't interpret.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SensingError {
    #[error("empty region ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },
    #[error("row stride {bytes_per_row} too small for width {width}")]
    BadStride { width: u32, bytes_per_row: u32 },
    #[error("buffer holds {actual} bytes, expected at least {expected}")]
    Truncated { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot capture empty rectangle {0}")]
    EmptyRect(crate::types::Rect),
    #[error("screen capture failed: {0}")]
    Platform(String),
}

/// Failure of a single key/mouse operation.
#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("input injection failed: {0}")]
    Injection(String),
    #[error("window {0} not found")]
    WindowNotFound(crate::types::WindowId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that aborts a single controller tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("settings lock poisoned")]
    SettingsPoisoned,
    #[error("tick panicked: {0}")]
    Panicked(String),
}

//! Error types for Fresco.
//!
//! This module provides the unified error type used at the daemon boundary.
//! Component errors carry their own structure; they collapse into
//! [`FrescoError`] when a result crosses the IPC surface, where only the
//! category and message survive serialization.

use serde::Serialize;
use thiserror::Error;

use crate::coordinator::ActivationError;
use crate::settings::StoreError;
use crate::widget::WidgetError;

/// Errors that can occur during application execution.
///
/// This enum implements `Serialize` so request handlers can return structured
/// error information to CLI clients over the control socket.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum FrescoError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Another operation of the same kind is still in flight.
    #[error("Busy: {0}")]
    Busy(String),
    /// Wallpaper activation failed.
    #[error("Wallpaper error: {0}")]
    WallpaperError(String),
    /// Date widget operation failed.
    #[error("Widget error: {0}")]
    WidgetError(String),
    /// Settings storage error.
    #[error("Settings error: {0}")]
    SettingsError(String),
    /// IPC communication error.
    #[error("IPC error: {0}")]
    IpcError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<ActivationError> for FrescoError {
    fn from(err: ActivationError) -> Self {
        match err {
            ActivationError::Busy => Self::Busy(err.to_string()),
            ActivationError::InvalidInput(msg) => Self::InvalidArguments(msg),
            ActivationError::Backend { .. } => Self::WallpaperError(err.to_string()),
        }
    }
}

impl From<WidgetError> for FrescoError {
    fn from(err: WidgetError) -> Self {
        match err {
            WidgetError::Busy => Self::Busy(err.to_string()),
            WidgetError::InvalidInput(msg) => Self::InvalidArguments(msg),
            WidgetError::Backend { .. } => Self::WidgetError(err.to_string()),
        }
    }
}

impl From<crate::backend::BackendError> for FrescoError {
    fn from(err: crate::backend::BackendError) -> Self { Self::CommandError(err.to_string()) }
}

impl From<StoreError> for FrescoError {
    fn from(err: StoreError) -> Self { Self::SettingsError(err.to_string()) }
}

impl From<std::io::Error> for FrescoError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for FrescoError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for FrescoError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for FrescoError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

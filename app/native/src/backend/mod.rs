//! The asynchronous boundary to the native desktop.
//!
//! Everything the coordinator, scheduler, and widget bridge do to the actual
//! desktop goes through [`DesktopBackend`]: painting a static background,
//! starting and stopping the live render process, the overlay widget window,
//! media listing, autostart registration, and main-window visibility. The
//! trait keeps the core logic testable against a recording mock and keeps
//! the native details in one place.

pub mod process;

use std::future::Future;
use std::path::Path;

use thiserror::Error;

use crate::catalog::MediaItem;
use crate::settings::WidgetSettings;

pub use process::{BackendConfig, ProcessBackend};

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by backend operations.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The call could not be dispatched at all: the helper or player binary
    /// is missing, the process could not be spawned, the pipe is gone.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The call was dispatched and the external operation reported failure:
    /// path not found, unsupported media, non-zero exit.
    #[error("backend rejected the operation: {0}")]
    Rejected(String),
}

/// Asynchronous operations consumed from the native desktop.
///
/// All operations may fail; none are cancellable once issued, callers await
/// completion or failure. Methods return `impl Future + Send` so coordinator
/// operations remain spawnable from scheduler tasks.
pub trait DesktopBackend: Send + Sync + 'static {
    /// Paints a static image as the desktop background.
    fn set_static(&self, path: &Path) -> impl Future<Output = BackendResult<()>> + Send;

    /// Starts the external process that renders a looping video or GIF as
    /// the live background layer.
    fn start_live(&self, path: &Path) -> impl Future<Output = BackendResult<()>> + Send;

    /// Stops the live background render process, if one is running.
    fn stop_live(&self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Creates the overlay widget window with the given settings.
    fn create_overlay(
        &self,
        settings: &WidgetSettings,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Closes the overlay widget window.
    fn close_overlay(&self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Pushes a single changed setting to the open overlay window.
    fn update_overlay(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Resolves media records for explicitly picked files.
    fn list_media_info(
        &self,
        paths: &[String],
    ) -> impl Future<Output = BackendResult<Vec<MediaItem>>> + Send;

    /// Lists media records for every recognized file in a folder.
    fn list_media_in_folder(
        &self,
        dir: &Path,
    ) -> impl Future<Output = BackendResult<Vec<MediaItem>>> + Send;

    /// Registers or unregisters the daemon to start with the session.
    fn set_autostart(&self, enable: bool) -> impl Future<Output = BackendResult<()>> + Send;

    /// Reports whether autostart registration is present.
    fn autostart_status(&self) -> impl Future<Output = BackendResult<bool>> + Send;

    /// Shows the management UI window, if one exists.
    fn show_main_window(&self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Hides the management UI window, if one exists.
    fn hide_main_window(&self) -> impl Future<Output = BackendResult<()>> + Send;
}

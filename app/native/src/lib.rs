//! Fresco - a desktop wallpaper manager with slideshow rotation and a date
//! widget overlay.
//!
//! This library provides both the daemon and CLI functionality. The daemon
//! owns the media catalog, activates static and live backgrounds through the
//! desktop backend, rotates them on a timer, and serves a Unix-socket control
//! interface that the CLI talks to.

pub mod backend;
pub mod catalog;
pub mod cli;
pub mod coordinator;
pub mod error;
pub mod ipc;
pub mod platform;
pub mod settings;
pub mod slideshow;
pub mod widget;

use std::sync::Arc;

use serde_json::{Value, json};

use crate::backend::{BackendConfig, DesktopBackend, ProcessBackend};
use crate::catalog::MediaCatalog;
use crate::coordinator::{ActivationState, Coordinator};
use crate::error::FrescoError;
use crate::ipc::{Request, Response};
use crate::settings::{PersistedState, SettingsStore, SlideshowSettings, SyncHandle, spawn_writer};
use crate::slideshow::{Scheduler, SuspendCheck};
use crate::widget::WidgetBridge;

/// Everything the control socket handler needs, shared across its threads.
struct Daemon {
    backend: Arc<ProcessBackend>,
    coordinator: Arc<Coordinator<ProcessBackend>>,
    scheduler: Scheduler<ProcessBackend>,
    widget: WidgetBridge<ProcessBackend>,
    slideshow: parking_lot::Mutex<SlideshowSettings>,
    sync: SyncHandle,
}

impl Daemon {
    /// Restores persisted state after startup.
    ///
    /// Re-activation of the last background is best effort: a moved or
    /// deleted file leaves the daemon idle instead of failing startup.
    async fn restore(&self, state: &PersistedState, reopen_widget: bool) {
        self.scheduler.apply(&state.slideshow, self.coordinator.catalog_len().await);

        if reopen_widget && let Err(err) = self.widget.enable().await {
            tracing::warn!(error = %err, "failed to reopen the date widget");
        }

        if let Some(path) = &state.last_active {
            let (items, _) = self.coordinator.snapshot().await;
            match items.into_iter().find(|item| &item.path == path) {
                Some(item) => {
                    if let Err(err) = self.coordinator.activate(item).await {
                        tracing::warn!(error = %err, path, "failed to restore last background");
                    }
                }
                None => tracing::warn!(path, "last background is no longer in the catalog"),
            }
        }
    }

    /// Handles one control socket request.
    async fn handle(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(data) => Response::Success { data },
            Err(err) => Response::error(err.to_string()),
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Value, FrescoError> {
        match request {
            Request::Ping => Ok(json!("pong")),

            Request::Status => {
                let (items, state) = self.coordinator.snapshot().await;
                let kind = match &state {
                    ActivationState::Idle => Value::Null,
                    ActivationState::StaticActive(_) => json!("static"),
                    ActivationState::LiveActive(_) => json!("live"),
                };
                Ok(json!({
                    "active": state.active_item().map(|item| item.path.clone()),
                    "kind": kind,
                    "catalogSize": items.len(),
                    "slideshow": self.slideshow.lock().clone(),
                    "widget": self.widget.settings().await,
                    "autostartEnabled": self.backend.autostart_status().await.unwrap_or(false),
                }))
            }

            Request::List => {
                let (items, _) = self.coordinator.snapshot().await;
                Ok(serde_json::to_value(items)?)
            }

            Request::Add { paths } => {
                let items = self.backend.list_media_info(&paths).await?;
                let added = self.coordinator.add_items(items).await;
                self.refresh_scheduler().await;
                Ok(json!({ "added": added }))
            }

            Request::AddFolder { dir } => {
                let items =
                    self.backend.list_media_in_folder(std::path::Path::new(&dir)).await?;
                let added = self.coordinator.add_items(items).await;
                self.refresh_scheduler().await;
                Ok(json!({ "added": added }))
            }

            Request::Activate { path } => {
                let (items, _) = self.coordinator.snapshot().await;
                let item = items.into_iter().find(|item| item.path == path).ok_or_else(|| {
                    FrescoError::InvalidArguments(format!(
                        "{path} is not in the catalog; add it first"
                    ))
                })?;
                self.coordinator.activate(item).await?;
                Ok(Value::Null)
            }

            Request::Stop => {
                self.coordinator.stop().await?;
                Ok(Value::Null)
            }

            Request::Next => {
                let random_order = self.slideshow.lock().random_order;
                let (items, state) = self.coordinator.snapshot().await;
                let current = state.active_item().map(|item| item.path.clone());
                let next = slideshow::select_next(&items, current.as_deref(), random_order)
                    .ok_or_else(|| {
                        FrescoError::CommandError(
                            "no other catalog item to switch to".to_string(),
                        )
                    })?;
                let path = next.path.clone();
                self.coordinator.activate(next).await?;
                Ok(json!({ "active": path }))
            }

            Request::Remove { path } => {
                self.coordinator.remove(&path).await?;
                self.refresh_scheduler().await;
                Ok(Value::Null)
            }

            Request::Slideshow { settings } => {
                settings.validate().map_err(FrescoError::InvalidArguments)?;
                *self.slideshow.lock() = settings.clone();
                let persist = settings.clone();
                self.sync.update(move |state| state.slideshow = persist);
                self.scheduler.apply(&settings, self.coordinator.catalog_len().await);
                Ok(Value::Null)
            }

            Request::WidgetEnable { enabled } => {
                if enabled {
                    self.widget.enable().await?;
                } else {
                    self.widget.disable().await?;
                }
                Ok(Value::Null)
            }

            Request::WidgetSet { key, value } => {
                self.widget.set(&key, &value).await?;
                Ok(Value::Null)
            }

            Request::Autostart { enable } => {
                self.backend.set_autostart(enable).await?;
                self.sync.update(move |state| state.autostart_enabled = enable);
                Ok(Value::Null)
            }

            Request::Show => {
                self.backend.show_main_window().await?;
                Ok(Value::Null)
            }

            Request::Hide => {
                self.backend.hide_main_window().await?;
                Ok(Value::Null)
            }
        }
    }

    /// Re-applies the slideshow timer after the catalog size changed.
    async fn refresh_scheduler(&self) {
        let settings = self.slideshow.lock().clone();
        self.scheduler.apply(&settings, self.coordinator.catalog_len().await);
    }
}

/// Runs the daemon until interrupted.
///
/// # Errors
///
/// Returns an error when the settings store location cannot be determined or
/// the async runtime fails to start.
pub fn run() -> Result<(), FrescoError> {
    init_tracing();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let store = SettingsStore::default_location()?;
        let state = store.load();
        tracing::info!(
            path = %store.path().display(),
            catalog = state.catalog.len(),
            "settings loaded"
        );

        let sync = spawn_writer(store.clone(), state.clone());
        let backend = Arc::new(ProcessBackend::new(BackendConfig::default()));
        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&backend),
            MediaCatalog::from_items(state.catalog.clone()),
            sync.clone(),
        ));

        // Fullscreen detection is desktop specific; the default hook never
        // suspends the slideshow.
        let suspend: SuspendCheck = Arc::new(|| false);
        let scheduler = Scheduler::new(Arc::clone(&coordinator), suspend);

        // The bridge re-opens the widget itself so the overlay process state
        // matches the flag instead of trusting it blindly.
        let mut widget_settings = state.widget.clone();
        let reopen_widget = std::mem::take(&mut widget_settings.enabled);
        let widget =
            WidgetBridge::new(Arc::clone(&backend), widget_settings, store.clone(), sync.clone());

        let daemon = Arc::new(Daemon {
            backend,
            coordinator,
            scheduler,
            widget,
            slideshow: parking_lot::Mutex::new(state.slideshow.clone()),
            sync,
        });

        daemon.restore(&state, reopen_widget).await;

        let handle = tokio::runtime::Handle::current();
        let server_daemon = Arc::clone(&daemon);
        ipc::start_server(move |request| handle.block_on(server_daemon.handle(request)));

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");

        ipc::stop_server();
        daemon.scheduler.stop();
        daemon.backend.shutdown().await;
        Ok(())
    })
}

/// Initializes the tracing subscriber.
///
/// Log verbosity follows `RUST_LOG`; the default is `info`.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

//! Overlay date-widget bridge.
//!
//! Mirrors `WidgetSettings.enabled` onto the external overlay process:
//! enabled means open, disabled means closed. Settings edits are persisted
//! no matter what; only while the overlay is open is the single changed key
//! pushed to the backend as an incremental update (never a full recreate).
//! A failed create or close never flips `enabled` optimistically; the
//! user-visible state follows backend acknowledgment.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::backend::{BackendError, DesktopBackend};
use crate::settings::{Alignment, SettingsStore, SyncHandle, WidgetSettings};

/// Errors surfaced by widget bridge operations.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// Another widget operation is in flight.
    #[error("another widget operation is in flight, try again")]
    Busy,
    /// The overlay backend call failed; `enabled` was left unchanged.
    #[error("overlay {op} failed: {source}")]
    Backend {
        op: &'static str,
        #[source]
        source: BackendError,
    },
    /// Rejected before any backend call was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Bridge between the widget settings and the external overlay process.
pub struct WidgetBridge<B> {
    backend: Arc<B>,
    settings: Mutex<WidgetSettings>,
    store: SettingsStore,
    sync: SyncHandle,
}

impl<B: DesktopBackend> WidgetBridge<B> {
    /// Creates a bridge seeded with the persisted widget settings.
    ///
    /// The persisted `enabled` flag is carried as-is; the daemon decides at
    /// startup whether to re-open the overlay.
    pub fn new(backend: Arc<B>, settings: WidgetSettings, store: SettingsStore, sync: SyncHandle) -> Self {
        Self { backend, settings: Mutex::new(settings), store, sync }
    }

    /// Current settings snapshot.
    pub async fn settings(&self) -> WidgetSettings { self.settings.lock().await.clone() }

    /// Opens the overlay window.
    ///
    /// The last persisted position is merged in first, so a drag position
    /// recorded while the widget was previously open survives a
    /// close/reopen cycle. Already open is a no-op.
    ///
    /// # Errors
    ///
    /// [`WidgetError::Busy`] or the `create` failure; on failure `enabled`
    /// stays `false`.
    pub async fn enable(&self) -> Result<(), WidgetError> {
        let mut settings = self.settings.try_lock().map_err(|_| WidgetError::Busy)?;
        if settings.enabled {
            return Ok(());
        }

        // The overlay process persists drag positions on its own; pick up
        // the latest one rather than the position we booted with. The read
        // hits the filesystem, so it runs off the async threads.
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(state) => {
                settings.position_x = state.widget.position_x;
                settings.position_y = state.widget.position_y;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not read the persisted widget position");
            }
        }

        self.backend
            .create_overlay(&settings)
            .await
            .map_err(|source| WidgetError::Backend { op: "create", source })?;

        settings.enabled = true;
        tracing::info!("date widget opened");
        self.persist(&settings);
        Ok(())
    }

    /// Closes the overlay window. Already closed is a no-op.
    ///
    /// # Errors
    ///
    /// [`WidgetError::Busy`] or the `close` failure; on failure `enabled`
    /// stays `true`.
    pub async fn disable(&self) -> Result<(), WidgetError> {
        let mut settings = self.settings.try_lock().map_err(|_| WidgetError::Busy)?;
        if !settings.enabled {
            return Ok(());
        }

        self.backend
            .close_overlay()
            .await
            .map_err(|source| WidgetError::Backend { op: "close", source })?;

        settings.enabled = false;
        tracing::info!("date widget closed");
        self.persist(&settings);
        Ok(())
    }

    /// Updates one widget setting by key.
    ///
    /// The new snapshot is persisted regardless of widget state; the single
    /// key/value pair is additionally pushed to the backend only while the
    /// overlay is open. A push failure is logged, not surfaced: the edit
    /// already took effect in settings and storage.
    ///
    /// # Errors
    ///
    /// [`WidgetError::Busy`] or [`WidgetError::InvalidInput`] for unknown
    /// keys and out-of-range values (rejected before any backend call).
    pub async fn set(&self, key: &str, value: &str) -> Result<(), WidgetError> {
        let mut settings = self.settings.try_lock().map_err(|_| WidgetError::Busy)?;

        let mut updated = settings.clone();
        apply_field(&mut updated, key, value)?;
        updated.validate().map_err(WidgetError::InvalidInput)?;

        *settings = updated;
        self.persist(&settings);

        if settings.enabled
            && let Err(err) = self.backend.update_overlay(key, value).await
        {
            tracing::warn!(error = %err, key, "failed to push widget property update");
        }
        Ok(())
    }

    fn persist(&self, settings: &WidgetSettings) {
        let snapshot = settings.clone();
        self.sync.update(move |state| state.widget = snapshot);
    }
}

/// Applies a single key/value edit to a settings copy.
fn apply_field(settings: &mut WidgetSettings, key: &str, value: &str) -> Result<(), WidgetError> {
    let invalid =
        || WidgetError::InvalidInput(format!("invalid value {value:?} for widget key {key:?}"));

    match key {
        "locked" => settings.locked = value.parse().map_err(|_| invalid())?,
        "showTime" => settings.show_time = value.parse().map_err(|_| invalid())?,
        "boldText" => settings.bold_text = value.parse().map_err(|_| invalid())?,
        "scale" => settings.scale = value.parse().map_err(|_| invalid())?,
        "color" => {
            if !value.starts_with('#') || value.len() != 7 {
                return Err(invalid());
            }
            settings.color = value.to_string();
        }
        "font" => settings.font = value.to_string(),
        "alignment" => settings.alignment = Alignment::parse(value).ok_or_else(invalid)?,
        "positionX" => settings.position_x = value.parse().map_err(|_| invalid())?,
        "positionY" => settings.position_y = value.parse().map_err(|_| invalid())?,
        _ => {
            return Err(WidgetError::InvalidInput(format!("unknown widget key {key:?}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Call, MockBackend};
    use crate::settings::{PersistedState, spawn_writer};

    fn harness(
        settings: WidgetSettings,
        persisted: PersistedState,
    ) -> (Arc<MockBackend>, WidgetBridge<MockBackend>, tempfile::TempDir) {
        let backend = Arc::new(MockBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store.save(&persisted).unwrap();
        let sync = spawn_writer(store.clone(), persisted);
        let bridge = WidgetBridge::new(Arc::clone(&backend), settings, store, sync);
        (backend, bridge, dir)
    }

    #[tokio::test]
    async fn test_enable_merges_persisted_position() {
        let persisted = PersistedState {
            widget: WidgetSettings {
                position_x: 640.0,
                position_y: 480.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let (backend, bridge, _dir) = harness(WidgetSettings::default(), persisted);

        bridge.enable().await.unwrap();

        let calls = backend.calls();
        let Call::CreateOverlay(sent) = &calls[0] else {
            panic!("expected a create_overlay call");
        };
        assert!((sent.position_x - 640.0).abs() < f64::EPSILON);
        assert!((sent.position_y - 480.0).abs() < f64::EPSILON);
        assert!(bridge.settings().await.enabled);
    }

    #[tokio::test]
    async fn test_enable_failure_does_not_flip_enabled() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());
        *backend.fail_create_overlay.lock() = true;

        let err = bridge.enable().await.unwrap_err();
        assert!(matches!(err, WidgetError::Backend { op: "create", .. }));
        assert!(!bridge.settings().await.enabled);
    }

    #[tokio::test]
    async fn test_disable_closes_and_keeps_position() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());
        bridge.enable().await.unwrap();

        bridge.disable().await.unwrap();
        assert_eq!(backend.count(|c| matches!(c, Call::CloseOverlay)), 1);
        assert!(!bridge.settings().await.enabled);
    }

    #[tokio::test]
    async fn test_disable_failure_keeps_enabled() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());
        bridge.enable().await.unwrap();
        *backend.fail_close_overlay.lock() = true;

        assert!(bridge.disable().await.is_err());
        assert!(bridge.settings().await.enabled);
    }

    #[tokio::test]
    async fn test_edit_while_closed_is_stored_but_not_pushed() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());

        bridge.set("color", "#22AAFF").await.unwrap();

        assert_eq!(backend.count(|c| matches!(c, Call::UpdateOverlay(..))), 0);
        assert_eq!(bridge.settings().await.color, "#22AAFF");
    }

    #[tokio::test]
    async fn test_edit_while_open_pushes_single_key() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());
        bridge.enable().await.unwrap();

        bridge.set("boldText", "true").await.unwrap();

        assert_eq!(
            backend.calls().last(),
            Some(&Call::UpdateOverlay("boldText".to_string(), "true".to_string()))
        );
        // No recreate for a field update.
        assert_eq!(backend.count(|c| matches!(c, Call::CreateOverlay(_))), 1);
        assert!(bridge.settings().await.bold_text);
    }

    #[tokio::test]
    async fn test_set_rejects_unknown_key_and_bad_values() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());

        assert!(matches!(
            bridge.set("sparkles", "on").await.unwrap_err(),
            WidgetError::InvalidInput(_)
        ));
        assert!(bridge.set("scale", "9.5").await.is_err());
        assert!(bridge.set("scale", "not-a-number").await.is_err());
        assert!(bridge.set("color", "red").await.is_err());
        assert!(bridge.set("alignment", "diagonal").await.is_err());

        // Nothing reached the backend and nothing changed.
        assert!(backend.calls().is_empty());
        assert_eq!(bridge.settings().await, WidgetSettings::default());
    }

    #[tokio::test]
    async fn test_set_accepts_each_known_key() {
        let (_backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());

        bridge.set("locked", "true").await.unwrap();
        bridge.set("showTime", "false").await.unwrap();
        bridge.set("scale", "1.5").await.unwrap();
        bridge.set("font", "Megrim").await.unwrap();
        bridge.set("alignment", "right").await.unwrap();
        bridge.set("positionX", "42.0").await.unwrap();

        let settings = bridge.settings().await;
        assert!(settings.locked);
        assert!(!settings.show_time);
        assert!((settings.scale - 1.5).abs() < f64::EPSILON);
        assert_eq!(settings.font, "Megrim");
        assert_eq!(settings.alignment, Alignment::Right);
        assert!((settings.position_x - 42.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_enable_twice_is_noop() {
        let (backend, bridge, _dir) =
            harness(WidgetSettings::default(), PersistedState::default());
        bridge.enable().await.unwrap();
        bridge.enable().await.unwrap();
        assert_eq!(backend.count(|c| matches!(c, Call::CreateOverlay(_))), 1);
    }
}

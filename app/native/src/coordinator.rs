//! Wallpaper activation coordinator.
//!
//! The coordinator is the single entry point through which background state
//! changes. It owns the catalog and the activation state, enforces the
//! stop-before-start ordering when the active item was live, and commits a
//! state transition only after the backend acknowledged the call. At most
//! one live render process exists at any instant; that is the invariant this
//! module guarantees.
//!
//! Concurrency: one operation at a time. A `try_lock` on the inner state is
//! the in-flight guard: an operation arriving while another is running is
//! rejected with [`ActivationError::Busy`], not queued.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::backend::{BackendError, DesktopBackend};
use crate::catalog::{MediaCatalog, MediaItem, MediaKind};
use crate::settings::SyncHandle;

/// Which background slot is occupied, and by what.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActivationState {
    /// No background managed by us.
    #[default]
    Idle,
    /// A static image is painted as the background.
    StaticActive(MediaItem),
    /// A live render process is playing this item.
    LiveActive(MediaItem),
}

impl ActivationState {
    /// The active item, if any.
    #[must_use]
    pub const fn active_item(&self) -> Option<&MediaItem> {
        match self {
            Self::Idle => None,
            Self::StaticActive(item) | Self::LiveActive(item) => Some(item),
        }
    }
}

/// The backend operation an activation error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    SetStatic,
    StartLive,
    StopLive,
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetStatic => write!(f, "set static background"),
            Self::StartLive => write!(f, "start live background"),
            Self::StopLive => write!(f, "stop live background"),
        }
    }
}

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// Another operation is in flight; this one was rejected, not queued.
    #[error("another wallpaper operation is in flight, try again")]
    Busy,
    /// A backend call failed. State was left unchanged and nothing is
    /// retried automatically.
    #[error("failed to {op} for {path}: {source}")]
    Backend {
        op: BackendOp,
        path: String,
        #[source]
        source: BackendError,
    },
    /// Rejected before any backend call was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// State owned exclusively by the coordinator.
#[derive(Debug, Default)]
struct Inner {
    catalog: MediaCatalog,
    state: ActivationState,
}

/// The activation coordinator.
///
/// Constructed once in the daemon and shared by `Arc`; there is no global
/// instance. All operations fully await their backend calls (including the
/// mandatory stop-before-start) before returning.
pub struct Coordinator<B> {
    backend: Arc<B>,
    inner: Mutex<Inner>,
    sync: SyncHandle,
}

impl<B: DesktopBackend> Coordinator<B> {
    /// Creates a coordinator over a backend, seeded with the persisted
    /// catalog.
    pub fn new(backend: Arc<B>, catalog: MediaCatalog, sync: SyncHandle) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner { catalog, state: ActivationState::Idle }),
            sync,
        }
    }

    /// Activates an item as the desktop background.
    ///
    /// If the currently active item is live and the new item has a different
    /// path, the live process is stopped and its completion awaited before
    /// the new activation is issued. Re-activating the already-active item
    /// is legal and re-issues the backend call.
    ///
    /// The item does not have to be in the catalog; callers pass
    /// catalog-resident items in practice.
    ///
    /// # Errors
    ///
    /// [`ActivationError::Busy`] when another operation is in flight, or a
    /// tagged backend error; in both cases state is unchanged.
    pub async fn activate(&self, item: MediaItem) -> Result<(), ActivationError> {
        let mut inner = self.inner.try_lock().map_err(|_| ActivationError::Busy)?;

        // Stop the previous live process before anything new starts.
        if let ActivationState::LiveActive(current) = &inner.state
            && current.path != item.path
        {
            self.backend.stop_live().await.map_err(|source| ActivationError::Backend {
                op: BackendOp::StopLive,
                path: current.path.clone(),
                source,
            })?;
            inner.state = ActivationState::Idle;
        }

        let next_state = match item.kind() {
            MediaKind::Live => {
                self.backend.start_live(Path::new(&item.path)).await.map_err(|source| {
                    ActivationError::Backend {
                        op: BackendOp::StartLive,
                        path: item.path.clone(),
                        source,
                    }
                })?;
                ActivationState::LiveActive(item)
            }
            MediaKind::Static => {
                self.backend.set_static(Path::new(&item.path)).await.map_err(|source| {
                    ActivationError::Backend {
                        op: BackendOp::SetStatic,
                        path: item.path.clone(),
                        source,
                    }
                })?;
                ActivationState::StaticActive(item)
            }
        };

        tracing::info!(path = %next_state.active_item().map_or("", |i| i.path.as_str()), "background activated");
        inner.state = next_state;
        self.persist_active(&inner);
        Ok(())
    }

    /// Stops the live background, if one is active.
    ///
    /// Static backgrounds are not stopped, only replaced; for
    /// `StaticActive` and `Idle` this is a no-op.
    ///
    /// # Errors
    ///
    /// [`ActivationError::Busy`] or the tagged `stop_live` failure, with
    /// state unchanged.
    pub async fn stop(&self) -> Result<(), ActivationError> {
        let mut inner = self.inner.try_lock().map_err(|_| ActivationError::Busy)?;

        if let ActivationState::LiveActive(current) = &inner.state {
            self.backend.stop_live().await.map_err(|source| ActivationError::Backend {
                op: BackendOp::StopLive,
                path: current.path.clone(),
                source,
            })?;
            tracing::info!(path = %current.path, "live background stopped");
            inner.state = ActivationState::Idle;
            self.persist_active(&inner);
        }
        Ok(())
    }

    /// Removes an item from the catalog.
    ///
    /// Removing the active item stops it first (one `stop_live` if it was
    /// live) and leaves the coordinator idle. Removing an unknown path is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`ActivationError::Busy`] or the tagged `stop_live` failure; on
    /// failure neither the catalog nor the activation state changes.
    pub async fn remove(&self, path: &str) -> Result<(), ActivationError> {
        let mut inner = self.inner.try_lock().map_err(|_| ActivationError::Busy)?;

        let is_active = inner.state.active_item().is_some_and(|item| item.path == path);
        if is_active {
            if let ActivationState::LiveActive(_) = &inner.state {
                self.backend.stop_live().await.map_err(|source| ActivationError::Backend {
                    op: BackendOp::StopLive,
                    path: path.to_string(),
                    source,
                })?;
            }
            inner.state = ActivationState::Idle;
        }

        if inner.catalog.remove(path).is_some() {
            tracing::info!(path, removed_active = is_active, "catalog item removed");
            self.persist_catalog(&inner);
        }
        Ok(())
    }

    /// Adds items to the catalog, skipping paths already present.
    ///
    /// Returns how many items were actually inserted.
    pub async fn add_items(&self, items: Vec<MediaItem>) -> usize {
        let mut inner = self.inner.lock().await;
        let added = items.into_iter().filter(|item| inner.catalog.add(item.clone())).count();
        if added > 0 {
            tracing::info!(added, total = inner.catalog.len(), "catalog items added");
            self.persist_catalog(&inner);
        }
        added
    }

    /// The currently active item, if any.
    pub async fn current(&self) -> Option<MediaItem> {
        self.inner.lock().await.state.active_item().cloned()
    }

    /// Snapshot of the catalog items and the activation state.
    pub async fn snapshot(&self) -> (Vec<MediaItem>, ActivationState) {
        let inner = self.inner.lock().await;
        (inner.catalog.items().to_vec(), inner.state.clone())
    }

    /// Number of catalog items.
    pub async fn catalog_len(&self) -> usize { self.inner.lock().await.catalog.len() }

    fn persist_catalog(&self, inner: &Inner) {
        let items = inner.catalog.items().to_vec();
        let last = inner.state.active_item().map(|item| item.path.clone());
        self.sync.update(move |state| {
            state.catalog = items;
            state.last_active = last;
        });
    }

    fn persist_active(&self, inner: &Inner) {
        let last = inner.state.active_item().map(|item| item.path.clone());
        self.sync.update(move |state| state.last_active = last);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Notify;

    use super::*;
    use crate::backend::mock::{Call, MockBackend};
    use crate::settings::{SettingsStore, spawn_writer};

    fn item(path: &str, file_type: &str) -> MediaItem {
        MediaItem {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            file_type: file_type.to_string(),
            size: 1,
        }
    }

    fn coordinator_with(
        backend: Arc<MockBackend>,
        items: Vec<MediaItem>,
    ) -> (Coordinator<MockBackend>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let sync = spawn_writer(store, crate::settings::PersistedState::default());
        (Coordinator::new(backend, MediaCatalog::from_items(items), sync), dir)
    }

    #[tokio::test]
    async fn test_activate_static_commits_after_ack() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);

        coordinator.activate(item("/a.jpg", "jpg")).await.unwrap();

        assert_eq!(backend.calls(), vec![Call::SetStatic("/a.jpg".to_string())]);
        let (_, state) = coordinator.snapshot().await;
        assert_eq!(state, ActivationState::StaticActive(item("/a.jpg", "jpg")));
    }

    #[tokio::test]
    async fn test_live_then_static_stops_before_painting() {
        let backend = Arc::new(MockBackend::default());
        let a = item("/a.jpg", "jpg");
        let b = item("/b.mp4", "mp4");
        let (coordinator, _dir) =
            coordinator_with(Arc::clone(&backend), vec![a.clone(), b.clone()]);

        coordinator.activate(b.clone()).await.unwrap();
        assert_eq!(backend.calls(), vec![Call::StartLive("/b.mp4".to_string())]);
        assert_eq!(coordinator.snapshot().await.1, ActivationState::LiveActive(b));

        coordinator.activate(a.clone()).await.unwrap();
        assert_eq!(
            backend.calls(),
            vec![
                Call::StartLive("/b.mp4".to_string()),
                Call::StopLive,
                Call::SetStatic("/a.jpg".to_string()),
            ]
        );
        assert_eq!(coordinator.snapshot().await.1, ActivationState::StaticActive(a));
    }

    #[tokio::test]
    async fn test_live_to_other_live_stops_previous_first() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);

        coordinator.activate(item("/b.mp4", "mp4")).await.unwrap();
        coordinator.activate(item("/c.webm", "webm")).await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                Call::StartLive("/b.mp4".to_string()),
                Call::StopLive,
                Call::StartLive("/c.webm".to_string()),
            ]
        );
        // Never two opens without a stop in between.
        let mut open = 0_i32;
        for call in backend.calls() {
            match call {
                Call::StartLive(_) => {
                    open += 1;
                    assert!(open <= 1, "two live processes were open at once");
                }
                Call::StopLive => open -= 1,
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_reactivating_same_item_reissues_call() {
        let backend = Arc::new(MockBackend::default());
        let b = item("/b.mp4", "mp4");
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![b.clone()]);

        coordinator.activate(b.clone()).await.unwrap();
        coordinator.activate(b.clone()).await.unwrap();

        // Same path: no stop, the start is simply issued twice.
        assert_eq!(
            backend.calls(),
            vec![
                Call::StartLive("/b.mp4".to_string()),
                Call::StartLive("/b.mp4".to_string()),
            ]
        );
        assert_eq!(coordinator.snapshot().await.1, ActivationState::LiveActive(b));
    }

    #[tokio::test]
    async fn test_rejected_set_static_leaves_state_unchanged() {
        let backend = Arc::new(MockBackend::default());
        let a = item("/a.jpg", "jpg");
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);

        coordinator.activate(a.clone()).await.unwrap();

        *backend.fail_set_static.lock() = true;
        let err = coordinator.activate(item("/broken.png", "png")).await.unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Backend { op: BackendOp::SetStatic, .. }
        ));
        assert_eq!(coordinator.snapshot().await.1, ActivationState::StaticActive(a));
    }

    #[tokio::test]
    async fn test_failed_stop_aborts_switch_without_partial_transition() {
        let backend = Arc::new(MockBackend::default());
        let b = item("/b.mp4", "mp4");
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);

        coordinator.activate(b.clone()).await.unwrap();

        *backend.fail_stop_live.lock() = true;
        let err = coordinator.activate(item("/a.jpg", "jpg")).await.unwrap_err();
        assert!(matches!(err, ActivationError::Backend { op: BackendOp::StopLive, .. }));
        // The new activation was never issued.
        assert_eq!(backend.count(|c| matches!(c, Call::SetStatic(_))), 0);
    }

    #[tokio::test]
    async fn test_stop_is_noop_for_static_and_idle() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);

        coordinator.stop().await.unwrap();
        coordinator.activate(item("/a.jpg", "jpg")).await.unwrap();
        coordinator.stop().await.unwrap();

        assert_eq!(backend.count(|c| matches!(c, Call::StopLive)), 0);
        assert!(matches!(coordinator.snapshot().await.1, ActivationState::StaticActive(_)));
    }

    #[tokio::test]
    async fn test_stop_live_transitions_to_idle() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);

        coordinator.activate(item("/b.mp4", "mp4")).await.unwrap();
        coordinator.stop().await.unwrap();

        assert_eq!(backend.count(|c| matches!(c, Call::StopLive)), 1);
        assert_eq!(coordinator.snapshot().await.1, ActivationState::Idle);
    }

    #[tokio::test]
    async fn test_remove_active_live_item_stops_once_and_goes_idle() {
        let backend = Arc::new(MockBackend::default());
        let b = item("/b.mp4", "mp4");
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![b.clone()]);

        coordinator.activate(b).await.unwrap();
        coordinator.remove("/b.mp4").await.unwrap();

        assert_eq!(backend.count(|c| matches!(c, Call::StopLive)), 1);
        let (items, state) = coordinator.snapshot().await;
        assert_eq!(state, ActivationState::Idle);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_remove_active_static_item_goes_idle_without_stop() {
        let backend = Arc::new(MockBackend::default());
        let a = item("/a.jpg", "jpg");
        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![a.clone()]);

        coordinator.activate(a).await.unwrap();
        coordinator.remove("/a.jpg").await.unwrap();

        assert_eq!(backend.count(|c| matches!(c, Call::StopLive)), 0);
        assert_eq!(coordinator.snapshot().await.1, ActivationState::Idle);
    }

    #[tokio::test]
    async fn test_remove_inactive_item_keeps_activation() {
        let backend = Arc::new(MockBackend::default());
        let a = item("/a.jpg", "jpg");
        let c = item("/c.png", "png");
        let (coordinator, _dir) =
            coordinator_with(Arc::clone(&backend), vec![a.clone(), c.clone()]);

        coordinator.activate(a.clone()).await.unwrap();
        coordinator.remove("/c.png").await.unwrap();

        let (items, state) = coordinator.snapshot().await;
        assert_eq!(state, ActivationState::StaticActive(a));
        assert_eq!(items.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_activate_is_rejected_not_queued() {
        let backend = Arc::new(MockBackend::default());
        let gate = Arc::new(Notify::new());
        *backend.gate.lock() = Some(Arc::clone(&gate));

        let (coordinator, _dir) = coordinator_with(Arc::clone(&backend), vec![]);
        let coordinator = Arc::new(coordinator);

        let first = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.activate(item("/b.mp4", "mp4")).await })
        };

        // Wait until the first activation is parked inside the backend call.
        while backend.count(|c| matches!(c, Call::StartLive(_))) == 0 {
            tokio::task::yield_now().await;
        }

        let err = coordinator.activate(item("/a.jpg", "jpg")).await.unwrap_err();
        assert!(matches!(err, ActivationError::Busy));

        gate.notify_waiters();
        first.await.unwrap().unwrap();

        // The rejected call never reached the backend.
        assert_eq!(backend.count(|c| matches!(c, Call::SetStatic(_))), 0);
    }

    #[tokio::test]
    async fn test_add_items_deduplicates_and_counts() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _dir) = coordinator_with(backend, vec![item("/a.jpg", "jpg")]);

        let added = coordinator
            .add_items(vec![item("/a.jpg", "jpg"), item("/b.mp4", "mp4")])
            .await;
        assert_eq!(added, 1);
        assert_eq!(coordinator.catalog_len().await, 2);
    }
}

//! Durable snapshot storage and the fire-and-forget synchronizer.
//!
//! The store owns one JSON file. Saves write a sibling temp file and rename
//! it over the snapshot, so the file read at the next startup is always the
//! last write that completed, never one that was in flight when the process
//! died.
//!
//! Interactive code never waits on the disk: mutations are sent through
//! [`SyncHandle`] to a writer task that applies them to the authoritative
//! snapshot copy and rewrites the file. Write failures are logged and
//! swallowed; in-memory state stays the source of truth for the session.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;

use super::PersistedState;

/// Snapshot filename inside the data directory.
const SNAPSHOT_FILENAME: &str = "settings.json";

/// Errors from durable snapshot reads and writes.
///
/// These never propagate into an interactive call path; callers log them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("settings store IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot could not be serialized.
    #[error("settings store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// No usable data directory on this system.
    #[error("no data directory available for the settings store")]
    NoDataDir,
}

/// Handle to the JSON snapshot on disk.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self { Self { path } }

    /// Creates a store at the platform data directory,
    /// e.g. `~/.local/share/fresco/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataDir`] when the platform reports no data
    /// directory.
    pub fn default_location() -> Result<Self, StoreError> {
        let dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(dir.join("fresco").join(SNAPSHOT_FILENAME)))
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &PathBuf { &self.path }

    /// Loads the persisted snapshot.
    ///
    /// A missing file is first-run and yields defaults silently. An
    /// unreadable or corrupt file also yields defaults: the user keeps a
    /// working app and the next save rewrites a valid snapshot.
    #[must_use]
    pub fn load(&self) -> PersistedState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings snapshot, using defaults");
                return PersistedState::default();
            }
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "failed to read settings snapshot, using defaults");
                return PersistedState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, path = %self.path.display(), "settings snapshot is corrupt, using defaults");
                PersistedState::default()
            }
        }
    }

    /// Writes the snapshot atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the directory cannot be created, the
    /// temp file cannot be written, or the rename fails.
    pub fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// A mutation applied to the authoritative snapshot copy.
type Mutation = Box<dyn FnOnce(&mut PersistedState) + Send>;

/// Fire-and-forget handle for persisting settings changes.
///
/// Cheap to clone. Sending never blocks and never reports disk errors back;
/// the writer task logs them.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<Mutation>,
}

impl SyncHandle {
    /// Schedules a mutation of the persisted snapshot.
    ///
    /// The mutation runs on the writer task against the authoritative copy;
    /// the full snapshot is rewritten afterwards. If the writer has stopped
    /// (daemon shutdown) the mutation is dropped.
    pub fn update(&self, mutate: impl FnOnce(&mut PersistedState) + Send + 'static) {
        if self.tx.send(Box::new(mutate)).is_err() {
            tracing::debug!("settings writer stopped, dropping persist request");
        }
    }
}

/// Spawns the snapshot writer task and returns its handle.
///
/// The task owns the authoritative [`PersistedState`] copy, applies queued
/// mutations, coalesces bursts into a single write, and logs (never
/// surfaces) write failures.
pub fn spawn_writer(store: SettingsStore, initial: PersistedState) -> SyncHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Mutation>();

    tokio::spawn(async move {
        let mut state = initial;
        while let Some(mutate) = rx.recv().await {
            mutate(&mut state);
            // Coalesce rapid-fire mutations into one write.
            while let Ok(mutate) = rx.try_recv() {
                mutate(&mut state);
            }
            if let Err(err) = store.save(&state) {
                tracing::warn!(error = %err, "failed to persist settings snapshot");
            }
        }
        tracing::debug!("settings writer stopped");
    });

    SyncHandle { tx }
}

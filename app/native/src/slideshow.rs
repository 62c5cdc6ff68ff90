//! Slideshow scheduler: timed rotation through the catalog.
//!
//! The scheduler is either `Stopped` or `Running` one timer task. Any change
//! to the slideshow settings or the catalog size goes through a full timer
//! reset (cancel, then schedule fresh) instead of adjusting a running timer,
//! which avoids drift and double-fires.
//!
//! Cancellation is cooperative, closed with a generation counter: each timer
//! task captures the generation it was spawned under, a tick whose
//! generation has been bumped does nothing, and a cancel wakes the sleeping
//! task instead of aborting it. An activation already issued to the backend
//! always runs to completion, so the coordinator state and the live render
//! process never diverge. Once `stop` returns, no further activation can be
//! issued by the scheduler, even if a tick was already pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::backend::DesktopBackend;
use crate::catalog::MediaItem;
use crate::coordinator::Coordinator;
use crate::settings::SlideshowSettings;

/// Predicate the scheduler consults before each tick.
///
/// Enforcement of `pause_on_fullscreen` lives outside this crate's core; the
/// scheduler only honors whatever hook it is given. While suspended, ticks
/// are skipped entirely and the timer keeps running (no catch-up).
pub type SuspendCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Picks the next slideshow target from `items`, excluding `current`.
///
/// Sequential mode takes the item after the current one in insertion order,
/// wrapping at the end; when the current item is missing (deleted, or
/// nothing active) it falls back to the first item. Random mode picks
/// uniformly among all items except the current one.
///
/// Returns `None` when there is no candidate besides the current item.
#[must_use]
pub fn select_next(
    items: &[MediaItem],
    current: Option<&str>,
    random_order: bool,
) -> Option<MediaItem> {
    let candidates: Vec<&MediaItem> =
        items.iter().filter(|item| Some(item.path.as_str()) != current).collect();
    if candidates.is_empty() {
        return None;
    }

    if random_order {
        let index = rand::rng().random_range(0..candidates.len());
        return Some(candidates[index].clone());
    }

    let next_index = current
        .and_then(|path| items.iter().position(|item| item.path == path))
        .map_or(0, |index| (index + 1) % items.len());

    // The wrapped successor can only be the current item itself when the
    // catalog has a single entry, which the candidate check already ruled
    // out.
    Some(items[next_index].clone())
}

/// Whether the scheduler should run under these settings and catalog size.
const fn should_run(settings: &SlideshowSettings, catalog_len: usize) -> bool {
    settings.enabled && settings.interval_secs > 0 && catalog_len > 1
}

/// The slideshow scheduler.
///
/// Reads settings on every `apply`; it never mutates them. Activations go
/// through the coordinator exactly as a user action would, and a failed or
/// rejected tick is logged without stalling future ticks.
pub struct Scheduler<B> {
    coordinator: Arc<Coordinator<B>>,
    is_suspended: SuspendCheck,
    generation: Arc<AtomicU64>,
    wake: Arc<Notify>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<B: DesktopBackend> Scheduler<B> {
    /// Creates a stopped scheduler.
    pub fn new(coordinator: Arc<Coordinator<B>>, is_suspended: SuspendCheck) -> Self {
        Self {
            coordinator,
            is_suspended,
            generation: Arc::new(AtomicU64::new(0)),
            wake: Arc::new(Notify::new()),
            task: parking_lot::Mutex::new(None),
        }
    }

    /// Applies the current settings and catalog size.
    ///
    /// Always performs a full reset: the running timer (if any) is cancelled
    /// and a new one is scheduled when the settings call for it.
    pub fn apply(&self, settings: &SlideshowSettings, catalog_len: usize) {
        self.cancel();

        if !should_run(settings, catalog_len) {
            tracing::debug!("slideshow stopped");
            return;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let interval = Duration::from_secs(settings.interval_secs);
        let random_order = settings.random_order;
        let honor_pause = settings.pause_on_fullscreen;
        let coordinator = Arc::clone(&self.coordinator);
        let is_suspended = Arc::clone(&self.is_suspended);
        let generation_counter = Arc::clone(&self.generation);
        let wake = Arc::clone(&self.wake);

        tracing::info!(interval_secs = settings.interval_secs, random_order, "slideshow running");

        let handle = tokio::spawn(async move {
            loop {
                // A cancel cuts the wait short; the backend call below is
                // never cut short.
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = wake.notified() => {}
                }

                if generation_counter.load(Ordering::SeqCst) != generation {
                    return;
                }
                if honor_pause && is_suspended() {
                    tracing::debug!("slideshow tick skipped while suspended");
                    continue;
                }

                let (items, state) = coordinator.snapshot().await;
                let current = state.active_item().map(|item| item.path.clone());
                let Some(next) = select_next(&items, current.as_deref(), random_order) else {
                    continue;
                };

                // Close the cancel race: nothing is activated once stop()
                // has bumped the generation.
                if generation_counter.load(Ordering::SeqCst) != generation {
                    return;
                }

                if let Err(err) = coordinator.activate(next).await {
                    tracing::warn!(error = %err, "scheduled wallpaper change failed");
                }

                // A stop that arrived while the activation was in flight
                // takes effect here, after the call completed.
                if generation_counter.load(Ordering::SeqCst) != generation {
                    return;
                }
            }
        });

        *self.task.lock() = Some(handle);
    }

    /// Stops the scheduler. After this returns, no further tick fires.
    pub fn stop(&self) {
        self.cancel();
        tracing::debug!("slideshow stopped");
    }
}

impl<B> Scheduler<B> {
    /// Whether a timer task is currently scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        // Wake a sleeping task so it observes the bumped generation; a task
        // inside an activation finishes that call first and exits after.
        self.wake.notify_waiters();
        drop(self.task.lock().take());
    }
}

impl<B> Drop for Scheduler<B> {
    fn drop(&mut self) { self.cancel(); }
}

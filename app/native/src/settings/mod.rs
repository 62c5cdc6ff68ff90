//! Settings types and the durable snapshot they persist into.
//!
//! All settings serialize as camelCase JSON with every field defaulting when
//! missing, so snapshots written by older or newer builds load cleanly.

mod store;

use serde::{Deserialize, Serialize};

pub use store::{SettingsStore, StoreError, SyncHandle, spawn_writer};

use crate::catalog::MediaItem;

/// Smallest accepted widget scale factor.
pub const MIN_WIDGET_SCALE: f64 = 0.5;

/// Largest accepted widget scale factor.
pub const MAX_WIDGET_SCALE: f64 = 2.0;

/// Default slideshow interval: 30 minutes.
const DEFAULT_INTERVAL_SECS: u64 = 1800;

/// Slideshow rotation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlideshowSettings {
    /// Whether automatic rotation is on.
    pub enabled: bool,
    /// Seconds between rotations. Must be greater than zero.
    pub interval_secs: u64,
    /// Pick the next item at random instead of in insertion order.
    pub random_order: bool,
    /// Skip ticks while a fullscreen application is in front.
    /// Enforcement is an external hook; the scheduler only honors the
    /// suspension predicate it is given.
    pub pause_on_fullscreen: bool,
}

impl Default for SlideshowSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            random_order: false,
            pause_on_fullscreen: true,
        }
    }
}

impl SlideshowSettings {
    /// Validates field ranges before the settings are applied anywhere.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the interval is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_secs == 0 {
            return Err("slideshow interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Horizontal text alignment of the date widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    /// Parses an alignment from its lowercase wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Display settings for the on-screen date/time overlay widget.
///
/// `enabled` owns the overlay process lifecycle. Every other field may be
/// edited at any time; edits made while the widget is disabled are stored
/// but not pushed to the overlay backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetSettings {
    /// Whether the overlay window is open.
    pub enabled: bool,
    /// Ignore drag attempts on the overlay.
    pub locked: bool,
    /// Show the clock in addition to the date.
    pub show_time: bool,
    /// Render the text in bold.
    pub bold_text: bool,
    /// Scale factor, clamped to 0.5–2.0.
    pub scale: f64,
    /// Text color as a hex string, e.g. `#FFFFFF`.
    pub color: String,
    /// Font family name.
    pub font: String,
    /// Horizontal text alignment.
    pub alignment: Alignment,
    /// Last known window X position.
    pub position_x: f64,
    /// Last known window Y position.
    pub position_y: f64,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            locked: false,
            show_time: true,
            bold_text: false,
            scale: 1.0,
            color: "#FFFFFF".to_string(),
            font: "Arial".to_string(),
            alignment: Alignment::Center,
            position_x: 100.0,
            position_y: 100.0,
        }
    }
}

impl WidgetSettings {
    /// Validates field ranges.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the scale is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_WIDGET_SCALE..=MAX_WIDGET_SCALE).contains(&self.scale) {
            return Err(format!(
                "widget scale must be between {MIN_WIDGET_SCALE} and {MAX_WIDGET_SCALE}"
            ));
        }
        Ok(())
    }
}

/// The durable snapshot read at startup and rewritten on every change.
///
/// One JSON document holding all field groups. A snapshot on disk always
/// reflects the last fully completed write; partial writes never land
/// because saves go through a temp file and an atomic rename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    /// Catalog items in insertion order.
    pub catalog: Vec<MediaItem>,
    /// Slideshow rotation settings.
    pub slideshow: SlideshowSettings,
    /// Date widget settings.
    pub widget: WidgetSettings,
    /// Whether the daemon is registered to start with the session.
    pub autostart_enabled: bool,
    /// Path of the item that was active when the daemon last ran, if any.
    /// Re-activated on startup, best effort.
    pub last_active: Option<String>,
}

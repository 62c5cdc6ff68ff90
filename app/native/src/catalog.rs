//! Media catalog and kind classification.
//!
//! The catalog is an ordered collection of background media records. Insertion
//! order is significant: it drives sequential slideshow selection and display
//! order. Items are keyed by absolute path and never duplicated.

use serde::{Deserialize, Serialize};

/// Video container extensions that activate through the live render path.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "avi", "mov", "mkv"];

/// Still image extensions accepted when scanning a folder.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// How a catalog item is activated as the desktop background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A single image painted once as the desktop background.
    Static,
    /// A continuously rendering backdrop (video loop or animated GIF) that
    /// requires an external render process.
    Live,
}

/// Classifies a file-type tag into an activation kind.
///
/// Live covers both video containers and animated GIFs, which share the
/// continuously-rendering activation path. Unknown or empty tags degrade to
/// `Static`; there is no error case.
#[must_use]
pub fn classify(tag: &str) -> MediaKind {
    let tag = tag.to_lowercase();
    if tag == "gif" || VIDEO_EXTENSIONS.contains(&tag.as_str()) {
        MediaKind::Live
    } else {
        MediaKind::Static
    }
}

/// Returns whether a file-type tag is recognized as background media at all.
///
/// Used when scanning a folder so that stray files (sidecars, text files)
/// are not pulled into the catalog.
#[must_use]
pub fn is_media_extension(tag: &str) -> bool {
    let tag = tag.to_lowercase();
    tag == "gif"
        || VIDEO_EXTENSIONS.contains(&tag.as_str())
        || IMAGE_EXTENSIONS.contains(&tag.as_str())
}

/// A single background media record.
///
/// Identity is the absolute path. Records are immutable once added and are
/// removed only by explicit delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Absolute path to the media file (unique key).
    pub path: String,
    /// Display name, normally the file name.
    pub name: String,
    /// Lowercased extension tag, e.g. "jpg", "mp4", "gif".
    pub file_type: String,
    /// File size in bytes.
    pub size: u64,
}

impl MediaItem {
    /// Returns the activation kind of this item.
    #[must_use]
    pub fn kind(&self) -> MediaKind { classify(&self.file_type) }
}

/// Ordered, path-deduplicated collection of background media.
#[derive(Debug, Clone, Default)]
pub struct MediaCatalog {
    items: Vec<MediaItem>,
}

impl MediaCatalog {
    /// Creates a catalog from persisted items, dropping duplicate paths.
    #[must_use]
    pub fn from_items(items: Vec<MediaItem>) -> Self {
        let mut catalog = Self::default();
        for item in items {
            catalog.add(item);
        }
        catalog
    }

    /// Appends an item, keeping insertion order.
    ///
    /// Returns `false` if an item with the same path is already present.
    pub fn add(&mut self, item: MediaItem) -> bool {
        if self.items.iter().any(|existing| existing.path == item.path) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Removes the item with the given path.
    ///
    /// Returns the removed item, or `None` if the path was not in the catalog.
    pub fn remove(&mut self, path: &str) -> Option<MediaItem> {
        let index = self.items.iter().position(|item| item.path == path)?;
        Some(self.items.remove(index))
    }

    /// Looks up an item by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.path == path)
    }

    /// Returns the insertion-order position of a path, if present.
    #[must_use]
    pub fn position(&self, path: &str) -> Option<usize> {
        self.items.iter().position(|item| item.path == path)
    }

    /// All items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[MediaItem] { &self.items }

    /// Number of items in the catalog.
    #[must_use]
    pub fn len(&self) -> usize { self.items.len() }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

//! Path utilities for shell-like path expansion.
//!
//! CLI arguments arrive as the user typed them: tilde-prefixed, relative, or
//! absolute. The catalog keys items by absolute path, so every path crossing
//! the control socket is expanded and resolved here first.

use std::path::PathBuf;

/// Expands shell-like paths (tilde) to a `PathBuf`.
///
/// Absolute and relative paths pass through unchanged; `~` and `~/...` are
/// expanded to the user's home directory. Whitespace is trimmed.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

/// Expands a path and resolves it to an absolute one.
///
/// Relative paths are resolved against the current working directory. The
/// result is a plain join; symlinks and `..` components are left as-is so a
/// path can be addressed the same way it was added.
#[must_use]
pub fn absolutize(path: &str) -> PathBuf {
    let expanded = expand(path);

    if expanded.as_os_str().is_empty() || expanded.is_absolute() {
        return expanded;
    }

    std::env::current_dir().map_or(expanded.clone(), |cwd| cwd.join(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_empty_and_whitespace() {
        assert_eq!(expand(""), PathBuf::new());
        assert_eq!(expand("   "), PathBuf::new());
    }

    #[test]
    fn test_expand_absolute_path_unchanged() {
        assert_eq!(expand("/walls/ocean.mp4"), PathBuf::from("/walls/ocean.mp4"));
    }

    #[test]
    fn test_expand_relative_path_unchanged() {
        assert_eq!(expand("walls/ocean.mp4"), PathBuf::from("walls/ocean.mp4"));
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand("~/walls/ocean.mp4");
        assert!(!result.to_string_lossy().starts_with('~'));
        assert!(result.to_string_lossy().ends_with("walls/ocean.mp4"));
    }

    #[test]
    fn test_absolutize_absolute_unchanged() {
        assert_eq!(absolutize("/walls/a.jpg"), PathBuf::from("/walls/a.jpg"));
    }

    #[test]
    fn test_absolutize_relative_becomes_absolute() {
        let result = absolutize("walls/a.jpg");
        assert!(result.is_absolute());
        assert!(result.to_string_lossy().ends_with("walls/a.jpg"));
    }

    #[test]
    fn test_absolutize_trims_whitespace() {
        let result = absolutize("  walls/a.jpg  ");
        assert!(result.to_string_lossy().ends_with("walls/a.jpg"));
        assert!(!result.to_string_lossy().contains(' '));
    }

    #[test]
    fn test_absolutize_empty_stays_empty() {
        assert_eq!(absolutize(""), PathBuf::new());
    }
}

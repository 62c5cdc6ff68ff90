//! Process-based desktop backend.
//!
//! Static images go through the system wallpaper interface. Live backgrounds
//! and the overlay widget are external helper processes: the backend spawns
//! them, keeps their `Child` handles, and kills them on stop. The overlay
//! helper is driven over its stdin with one JSON object per line.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::{BackendError, BackendResult, DesktopBackend};
use crate::catalog::{MediaItem, is_media_extension};
use crate::settings::WidgetSettings;

/// Autostart entry filename under the user autostart directory.
const AUTOSTART_FILENAME: &str = "fresco.desktop";

/// External commands the backend drives.
///
/// Command templates are argv vectors; `{path}` in any argument is replaced
/// with the media file path at spawn time.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Player command rendering a looping video or GIF behind the desktop.
    pub player_command: Vec<String>,
    /// Overlay widget helper. Receives settings as JSON lines on stdin.
    pub overlay_command: Vec<String>,
    /// Optional management UI command, invoked with `show` or `hide`.
    pub ui_command: Option<Vec<String>>,
    /// Override for the autostart entry directory (used in tests).
    pub autostart_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            player_command: vec![
                "mpvpaper".to_string(),
                "-o".to_string(),
                "no-audio loop".to_string(),
                "*".to_string(),
                "{path}".to_string(),
            ],
            overlay_command: vec!["fresco-widget".to_string()],
            ui_command: None,
            autostart_dir: None,
        }
    }
}

/// [`DesktopBackend`] backed by the system wallpaper interface and helper
/// processes.
pub struct ProcessBackend {
    config: BackendConfig,
    live: Mutex<Option<Child>>,
    overlay: Mutex<Option<Child>>,
}

impl ProcessBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self { config, live: Mutex::new(None), overlay: Mutex::new(None) }
    }

    /// Kills both helper processes at daemon shutdown. Best effort.
    pub async fn shutdown(&self) {
        if let Err(err) = self.stop_live().await {
            tracing::warn!(error = %err, "failed to stop live background at shutdown");
        }
        if let Some(mut child) = self.overlay.lock().await.take() {
            kill_child(&mut child, "overlay helper").await;
        }
    }

    fn autostart_entry(&self) -> BackendResult<PathBuf> {
        let dir = match &self.config.autostart_dir {
            Some(dir) => dir.clone(),
            None => dirs::config_dir()
                .ok_or_else(|| {
                    BackendError::Unavailable("no user config directory".to_string())
                })?
                .join("autostart"),
        };
        Ok(dir.join(AUTOSTART_FILENAME))
    }

    async fn run_ui_command(&self, action: &str) -> BackendResult<()> {
        let Some(template) = &self.config.ui_command else {
            tracing::debug!(action, "no management UI command configured");
            return Ok(());
        };
        let mut argv = template.clone();
        argv.push(action.to_string());
        let status = build_command(&argv, None)?
            .status()
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(BackendError::Rejected(format!("ui command exited with {status}")))
        }
    }
}

impl DesktopBackend for ProcessBackend {
    async fn set_static(&self, path: &Path) -> BackendResult<()> {
        ensure_file(path).await?;

        // Any live layer must be gone before the static image shows through;
        // the coordinator already ordered a stop, this is the paint itself.
        let path = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            wallpaper::set_from_path(&path.display().to_string())
                .map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        result.map_err(BackendError::Rejected)
    }

    async fn start_live(&self, path: &Path) -> BackendResult<()> {
        ensure_file(path).await?;

        let mut live = self.live.lock().await;
        if let Some(mut previous) = live.take() {
            kill_child(&mut previous, "live render").await;
        }

        let child = build_command(&self.config.player_command, Some(path))?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        tracing::debug!(path = %path.display(), pid = child.id(), "live render started");
        *live = Some(child);
        Ok(())
    }

    async fn stop_live(&self) -> BackendResult<()> {
        let Some(mut child) = self.live.lock().await.take() else {
            return Ok(());
        };
        child
            .start_kill()
            .map_err(|err| BackendError::Rejected(err.to_string()))?;
        let _ = child.wait().await;
        tracing::debug!("live render stopped");
        Ok(())
    }

    async fn create_overlay(&self, settings: &WidgetSettings) -> BackendResult<()> {
        let mut overlay = self.overlay.lock().await;
        if let Some(mut previous) = overlay.take() {
            kill_child(&mut previous, "overlay helper").await;
        }

        let mut child = build_command(&self.config.overlay_command, None)?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        write_overlay_line(&mut child, &json!({ "settings": settings })).await?;
        tracing::debug!(pid = child.id(), "overlay helper started");
        *overlay = Some(child);
        Ok(())
    }

    async fn close_overlay(&self) -> BackendResult<()> {
        let Some(mut child) = self.overlay.lock().await.take() else {
            return Ok(());
        };
        child
            .start_kill()
            .map_err(|err| BackendError::Rejected(err.to_string()))?;
        let _ = child.wait().await;
        tracing::debug!("overlay helper stopped");
        Ok(())
    }

    async fn update_overlay(&self, key: &str, value: &str) -> BackendResult<()> {
        let mut overlay = self.overlay.lock().await;
        let Some(child) = overlay.as_mut() else {
            return Err(BackendError::Rejected("overlay is not open".to_string()));
        };
        write_overlay_line(child, &json!({ "key": key, "value": value })).await
    }

    async fn list_media_info(&self, paths: &[String]) -> BackendResult<Vec<MediaItem>> {
        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            match media_item(Path::new(path)).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {
                    tracing::warn!(path = %path, "skipping file with unrecognized media type");
                }
                Err(err) => {
                    tracing::warn!(error = %err, path = %path, "skipping unreadable file");
                }
            }
        }
        Ok(items)
    }

    async fn list_media_in_folder(&self, dir: &Path) -> BackendResult<Vec<MediaItem>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|err| BackendError::Rejected(err.to_string()))?;

        let mut items = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, dir = %dir.display(), "folder scan aborted early");
                    break;
                }
            };
            match media_item(&entry.path()).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, path = %entry.path().display(), "skipping unreadable file");
                }
            }
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn set_autostart(&self, enable: bool) -> BackendResult<()> {
        let entry = self.autostart_entry()?;
        if enable {
            let exe = std::env::current_exe()
                .map_err(|err| BackendError::Unavailable(err.to_string()))?;
            let contents = format!(
                "[Desktop Entry]\n\
                 Type=Application\n\
                 Name=Fresco\n\
                 Comment=Wallpaper manager daemon\n\
                 Exec={}\n\
                 X-GNOME-Autostart-enabled=true\n",
                exe.display()
            );
            if let Some(parent) = entry.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| BackendError::Rejected(err.to_string()))?;
            }
            tokio::fs::write(&entry, contents)
                .await
                .map_err(|err| BackendError::Rejected(err.to_string()))?;
            tracing::info!(path = %entry.display(), "autostart entry installed");
        } else {
            match tokio::fs::remove_file(&entry).await {
                Ok(()) => tracing::info!(path = %entry.display(), "autostart entry removed"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(BackendError::Rejected(err.to_string())),
            }
        }
        Ok(())
    }

    async fn autostart_status(&self) -> BackendResult<bool> {
        Ok(tokio::fs::try_exists(self.autostart_entry()?).await.unwrap_or(false))
    }

    async fn show_main_window(&self) -> BackendResult<()> {
        self.run_ui_command("show").await
    }

    async fn hide_main_window(&self) -> BackendResult<()> {
        self.run_ui_command("hide").await
    }
}

/// Kills a helper process and reaps it.
async fn kill_child(child: &mut Child, what: &str) {
    if let Err(err) = child.start_kill() {
        tracing::warn!(error = %err, what, "failed to kill helper process");
    }
    let _ = child.wait().await;
}

/// Builds a command from an argv template, substituting `{path}`.
fn build_command(argv: &[String], path: Option<&Path>) -> BackendResult<Command> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        BackendError::Unavailable("empty command template".to_string())
    })?;

    let mut command = Command::new(program);
    for arg in args {
        if let Some(path) = path {
            command.arg(arg.replace("{path}", &path.display().to_string()));
        } else {
            command.arg(arg);
        }
    }
    command.kill_on_drop(true);
    Ok(command)
}

async fn ensure_file(path: &Path) -> BackendResult<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|err| BackendError::Rejected(format!("{}: {err}", path.display())))?;
    if meta.is_file() {
        Ok(())
    } else {
        Err(BackendError::Rejected(format!("{} is not a file", path.display())))
    }
}

async fn write_overlay_line(child: &mut Child, payload: &serde_json::Value) -> BackendResult<()> {
    let stdin = child.stdin.as_mut().ok_or_else(|| {
        BackendError::Unavailable("overlay helper stdin is closed".to_string())
    })?;
    let mut line = payload.to_string();
    line.push('\n');
    stdin
        .write_all(line.as_bytes())
        .await
        .map_err(|err| BackendError::Unavailable(err.to_string()))?;
    stdin
        .flush()
        .await
        .map_err(|err| BackendError::Unavailable(err.to_string()))
}

/// Resolves one filesystem path into a media record.
///
/// `Ok(None)` means the file exists but is not a recognized media type.
async fn media_item(path: &Path) -> std::io::Result<Option<MediaItem>> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Ok(None);
    }

    let file_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !is_media_extension(&file_type) {
        return Ok(None);
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(Some(MediaItem { path: path.display().to_string(), name, file_type, size: meta.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_autostart(dir: &tempfile::TempDir) -> ProcessBackend {
        ProcessBackend::new(BackendConfig {
            autostart_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
    }

    #[test]
    fn test_build_command_substitutes_path() {
        let argv = vec![
            "player".to_string(),
            "--loop".to_string(),
            "{path}".to_string(),
        ];
        let command = build_command(&argv, Some(Path::new("/walls/sea.mp4"))).unwrap();
        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "player");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args, ["--loop", "/walls/sea.mp4"]);
    }

    #[test]
    fn test_build_command_rejects_empty_template() {
        assert!(build_command(&[], None).is_err());
    }

    #[tokio::test]
    async fn test_media_item_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.jpg");
        std::fs::write(&path, b"fake image bytes").unwrap();

        let item = media_item(&path).await.unwrap().unwrap();
        assert_eq!(item.name, "beach.jpg");
        assert_eq!(item.file_type, "jpg");
        assert_eq!(item.size, 16);
    }

    #[tokio::test]
    async fn test_media_item_ignores_non_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();
        assert!(media_item(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_media_info_skips_unreadable_paths() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.png");
        std::fs::write(&good, b"png").unwrap();

        let backend = ProcessBackend::new(BackendConfig::default());
        let paths = vec![
            good.display().to_string(),
            dir.path().join("missing.jpg").display().to_string(),
        ];
        let items = backend.list_media_info(&paths).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "a.png");
    }

    #[tokio::test]
    async fn test_list_media_in_folder_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zebra.mp4"), b"vid").unwrap();
        std::fs::write(dir.path().join("alpine.jpg"), b"img").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"doc").unwrap();

        let backend = ProcessBackend::new(BackendConfig::default());
        let items = backend.list_media_in_folder(dir.path()).await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["alpine.jpg", "zebra.mp4"]);
    }

    #[tokio::test]
    async fn test_list_media_in_folder_missing_dir_is_rejected() {
        let backend = ProcessBackend::new(BackendConfig::default());
        let err = backend
            .list_media_in_folder(Path::new("/no/such/folder"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_autostart_install_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend_with_autostart(&dir);

        assert!(!backend.autostart_status().await.unwrap());
        backend.set_autostart(true).await.unwrap();
        assert!(backend.autostart_status().await.unwrap());

        let entry = dir.path().join(AUTOSTART_FILENAME);
        let contents = std::fs::read_to_string(&entry).unwrap();
        assert!(contents.starts_with("[Desktop Entry]"));
        assert!(contents.contains("Exec="));

        backend.set_autostart(false).await.unwrap();
        assert!(!backend.autostart_status().await.unwrap());
    }

    #[tokio::test]
    async fn test_autostart_remove_when_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend_with_autostart(&dir);
        backend.set_autostart(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_live_without_player_is_noop() {
        let backend = ProcessBackend::new(BackendConfig::default());
        backend.stop_live().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_overlay_when_closed_is_rejected() {
        let backend = ProcessBackend::new(BackendConfig::default());
        let err = backend.update_overlay("scale", "1.5").await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }
}

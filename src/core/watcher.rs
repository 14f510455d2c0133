use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches a single file for creation, modification and removal.
///
/// The parent directory is watched rather than the file itself so that the
/// file may come and go. Bursts of events are collapsed into one message.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn start(path: &Path) -> Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .context("Watched file has no parent directory")?;
        let file_name = path
            .file_name()
            .map(|f| f.to_os_string())
            .context("Watched path has no file name")?;

        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let (async_tx, async_rx) = mpsc::unbounded_channel::<()>();
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else {
                    return;
                };
                if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
                    return;
                }
                let touches_file = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));
                if touches_file {
                    let _ = notify_tx.send(());
                }
            },
            Config::default(),
        )?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
        tracing::info!(path = %path.display(), "Watching file");

        let watched: PathBuf = path.to_path_buf();
        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while notify_rx.try_recv().is_ok() {}

                tracing::debug!(path = %watched.display(), "Watched file changed");
                if async_tx.send(()).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paused");
        let (_watcher, mut rx) = FileWatcher::start(&path).unwrap();

        std::fs::write(&path, b"").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(event, Ok(Some(()))));
    }

    #[tokio::test]
    async fn test_ignores_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let (_watcher, mut rx) = FileWatcher::start(&path).unwrap();

        std::fs::write(dir.path().join("other.json"), b"{}").unwrap();

        let event = tokio::time::timeout(Duration::from_millis(600), rx.recv()).await;
        assert!(event.is_err());
    }
}

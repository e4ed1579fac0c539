//! File watching for configuration hot-reload.
//!
//! The [`FileWatcher`] monitors configuration files through the `notify`
//! crate. Each file's parent directory is watched rather than the file
//! itself, so editors that save by writing a temporary file and renaming it
//! over the original are still noticed.
//!
//! When a file system event arrives, the watcher:
//! 1. Drops event kinds other than create, modify and remove
//! 2. Keeps only events that touch one of the watched file names
//! 3. Waits for a quiet period and reports the latest event per file
//!
//! # Example
//!
//! ```no_run
//! use tessera_config::FileWatcher;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), tessera_config::ConfigError> {
//! let mut watcher = FileWatcher::new()
//!     .with_debounce(Duration::from_millis(200))
//!     .watch_file("config.toml")?
//!     .build()?;
//!
//! while let Some(event) = watcher.next().await {
//!     println!("{} changed ({:?})", event.path.display(), event.kind);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::ConfigError;

/// Result of a file change event.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    /// Path of the watched file, as it was registered.
    pub path: PathBuf,
    /// Kind of change (create, modify, delete, rename).
    pub kind: FileChangeKind,
    /// Timestamp when the change was detected.
    pub timestamp: Instant,
}

/// Kind of file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was deleted.
    Deleted,
    /// File was renamed.
    Renamed,
}

impl From<&EventKind> for FileChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => FileChangeKind::Created,
            EventKind::Modify(ModifyKind::Name(_)) => FileChangeKind::Renamed,
            EventKind::Remove(_) => FileChangeKind::Deleted,
            EventKind::Modify(_) | EventKind::Access(_) | EventKind::Other | EventKind::Any => {
                FileChangeKind::Modified
            }
        }
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Files to watch.
    pub files: Vec<PathBuf>,
    /// Debounce duration for rapid changes.
    pub debounce: Duration,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            debounce: Duration::from_millis(100),
        }
    }
}

/// Builder for creating a [`FileWatcher`].
pub struct FileWatcherBuilder {
    config: FileWatcherConfig,
}

impl FileWatcherBuilder {
    /// Create a new file watcher builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: FileWatcherConfig::default(),
        }
    }

    /// Set the debounce duration.
    ///
    /// Multiple changes to the same file within this duration are coalesced
    /// into a single event. Default is 100ms.
    #[must_use]
    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.config.debounce = duration;
        self
    }

    /// Add a file to watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist.
    pub fn watch_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File does not exist: {}", path.display()),
            )));
        }
        self.config.files.push(path.to_path_buf());
        Ok(self)
    }

    /// Build the file watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if no files are configured or if the watcher cannot be created.
    pub fn build(self) -> Result<FileWatcher, ConfigError> {
        if self.config.files.is_empty() {
            return Err(ConfigError::invalid_config(
                "No files configured for file watcher",
            ));
        }

        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                // Only send if channel is open
                let _ = tx.blocking_send(event);
            }
        })
        .map_err(|e| ConfigError::invalid_config(format!("Failed to create file watcher: {}", e)))?;

        let mut targets = HashMap::new();
        let mut watched_dirs = HashSet::new();
        for file in &self.config.files {
            let dir = watch_dir(file).canonicalize()?;
            if watched_dirs.insert(dir.clone()) {
                watcher
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .map_err(|e| {
                        ConfigError::Io(std::io::Error::other(format!(
                            "Failed to watch directory {}: {}",
                            dir.display(),
                            e
                        )))
                    })?;
            }
            if let Some(name) = file.file_name() {
                targets.insert((dir, name.to_os_string()), file.clone());
            }
        }

        Ok(FileWatcher {
            _watcher: watcher,
            rx,
            targets,
            debounce: self.config.debounce,
            ready: VecDeque::new(),
        })
    }
}

impl Default for FileWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// File watcher for configuration hot-reload.
///
/// Dropping the watcher stops the underlying OS watch.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Event>,
    // Keyed by canonical parent directory and file name.
    targets: HashMap<(PathBuf, OsString), PathBuf>,
    debounce: Duration,
    ready: VecDeque<FileChangeEvent>,
}

impl FileWatcher {
    /// Create a new file watcher builder.
    #[must_use]
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> FileWatcherBuilder {
        FileWatcherBuilder::new()
    }

    /// Poll for a pending file change event.
    ///
    /// Returns immediately. Events already received are coalesced per file,
    /// but no debounce wait takes place.
    pub async fn poll(&mut self) -> Option<FileChangeEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if let Some(change) = self.accept(&event) {
                self.queue(change);
            }
        }
        self.ready.pop_front()
    }

    /// Wait for the next file change event.
    ///
    /// Once a relevant event arrives, further events are collected until no
    /// new one shows up for the debounce duration, and the latest event for
    /// each file is reported. A save that truncates and then writes the file
    /// therefore yields a single event after the write.
    ///
    /// Returns `None` once the underlying watcher has shut down.
    pub async fn next(&mut self) -> Option<FileChangeEvent> {
        if let Some(change) = self.ready.pop_front() {
            return Some(change);
        }

        loop {
            let event = self.rx.recv().await?;
            if let Some(change) = self.accept(&event) {
                self.queue(change);
                break;
            }
        }

        while let Ok(Some(event)) = tokio::time::timeout(self.debounce, self.rx.recv()).await {
            if let Some(change) = self.accept(&event) {
                self.queue(change);
            }
        }

        self.ready.pop_front()
    }

    fn accept(&self, event: &Event) -> Option<FileChangeEvent> {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
            _ => return None,
        }

        let path = event.paths.iter().find_map(|p| {
            let name = p.file_name()?.to_os_string();
            let dir = watch_dir(p).canonicalize().ok()?;
            self.targets.get(&(dir, name))
        })?;

        Some(FileChangeEvent {
            path: path.clone(),
            kind: FileChangeKind::from(&event.kind),
            timestamp: Instant::now(),
        })
    }

    // Latest event per file wins; files keep their first-seen order.
    fn queue(&mut self, change: FileChangeEvent) {
        match self.ready.iter_mut().find(|queued| queued.path == change.path) {
            Some(queued) => *queued = change,
            None => self.ready.push_back(change),
        }
    }
}

fn watch_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use std::fs;
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    fn watcher_for(dir: &TempDir, name: &str) -> (FileWatcher, PathBuf) {
        let path = dir.path().join(name);
        fs::write(&path, "a = 1").unwrap();
        let watcher = FileWatcher::new()
            .with_debounce(Duration::from_millis(50))
            .watch_file(&path)
            .unwrap()
            .build()
            .unwrap();
        (watcher, path)
    }

    #[test]
    fn test_change_kind_from_event_kind() {
        assert_eq!(
            FileChangeKind::from(&EventKind::Create(CreateKind::File)),
            FileChangeKind::Created
        );
        assert_eq!(
            FileChangeKind::from(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            FileChangeKind::Modified
        );
        assert_eq!(
            FileChangeKind::from(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            FileChangeKind::Renamed
        );
        assert_eq!(
            FileChangeKind::from(&EventKind::Remove(RemoveKind::File)),
            FileChangeKind::Deleted
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = FileWatcherConfig::default();
        assert!(config.files.is_empty());
        assert_eq!(config.debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_watch_missing_file() {
        let result = FileWatcher::new().watch_file("/nonexistent/app.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_watch_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileWatcher::new().watch_file(temp_dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_build_without_files() {
        let result = FileWatcher::new().build();
        assert!(matches!(result, Err(ConfigError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_accept_filters_by_name_and_kind() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, path) = watcher_for(&temp_dir, "app.toml");

        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        let change = watcher.accept(&event(modify, &path)).unwrap();
        assert_eq!(change.path, path);
        assert_eq!(change.kind, FileChangeKind::Modified);

        let other = temp_dir.path().join("other.toml");
        assert!(watcher.accept(&event(modify, &other)).is_none());

        let access = EventKind::Access(AccessKind::Read);
        assert!(watcher.accept(&event(access, &path)).is_none());
    }

    #[tokio::test]
    async fn test_same_name_in_different_directories() {
        let first_dir = TempDir::new().unwrap();
        let second_dir = TempDir::new().unwrap();
        let first = first_dir.path().join("app.toml");
        let second = second_dir.path().join("app.toml");
        fs::write(&first, "a = 1").unwrap();
        fs::write(&second, "a = 1").unwrap();

        let watcher = FileWatcher::new()
            .watch_file(&first)
            .unwrap()
            .watch_file(&second)
            .unwrap()
            .build()
            .unwrap();

        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert_eq!(watcher.accept(&event(modify, &first)).unwrap().path, first);
        assert_eq!(watcher.accept(&event(modify, &second)).unwrap().path, second);
    }

    #[tokio::test]
    async fn test_accept_rename_onto_watched_file() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, path) = watcher_for(&temp_dir, "app.toml");

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(temp_dir.path().join(".app.toml.swp"))
            .add_path(path.clone());
        let change = watcher.accept(&rename).unwrap();
        assert_eq!(change.path, path);
        assert_eq!(change.kind, FileChangeKind::Renamed);
    }

    #[tokio::test]
    async fn test_next_coalesces_burst() {
        let temp_dir = TempDir::new().unwrap();
        let (mut watcher, path) = watcher_for(&temp_dir, "app.toml");

        let (tx, rx) = mpsc::channel(8);
        watcher.rx = rx;

        let truncate = EventKind::Modify(ModifyKind::Data(DataChange::Size));
        let remove = EventKind::Remove(RemoveKind::File);
        tx.send(event(truncate, &path)).await.unwrap();
        tx.send(event(remove, &path)).await.unwrap();

        let change = watcher.next().await.unwrap();
        assert_eq!(change.path, path);
        assert_eq!(change.kind, FileChangeKind::Deleted);

        let again = tokio::time::timeout(Duration::from_millis(150), watcher.next()).await;
        assert!(again.is_err(), "burst should produce a single event");
    }

    #[tokio::test]
    async fn test_next_ends_when_channel_closes() {
        let temp_dir = TempDir::new().unwrap();
        let (mut watcher, _) = watcher_for(&temp_dir, "app.toml");

        let (tx, rx) = mpsc::channel(1);
        watcher.rx = rx;
        drop(tx);

        assert!(watcher.next().await.is_none());
    }

    #[tokio::test]
    async fn test_poll_without_events() {
        let temp_dir = TempDir::new().unwrap();
        let (mut watcher, _) = watcher_for(&temp_dir, "app.toml");

        let (_tx, rx) = mpsc::channel(1);
        watcher.rx = rx;

        assert!(watcher.poll().await.is_none());
    }

    #[tokio::test]
    async fn test_detects_real_change() {
        let temp_dir = TempDir::new().unwrap();
        let (mut watcher, path) = watcher_for(&temp_dir, "app.toml");

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&path, "a = 2").unwrap();

        // Some CI file systems deliver events late or not at all.
        if let Ok(Some(change)) = tokio::time::timeout(Duration::from_secs(2), watcher.next()).await {
            assert_eq!(change.path, path);
        }
    }
}

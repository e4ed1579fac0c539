//! Change subscriptions and live reload.
//!
//! Callbacks are registered on a [`ConfigStore`] with
//! [`ConfigStore::on_change`]. Calling [`ConfigStore::watch`] starts a
//! notification task that reloads the store whenever the source file
//! changes and then runs every callback. Callback failures are collected
//! into a [`ReloadReport`] instead of being dropped.
//!
//! # Example
//!
//! ```no_run
//! use tessera_config::ConfigStore;
//!
//! # async fn example() -> Result<(), tessera_config::ConfigError> {
//! let store = ConfigStore::from_file("conf/app.yaml")?;
//!
//! let observed = store.downgrade();
//! store.on_change(move |event| {
//!     if let Some(store) = observed.upgrade() {
//!         println!("{} changed, level is now {}", event.path.display(), store.get_string("log.level"));
//!     }
//!     Ok(())
//! });
//!
//! let mut watch = store.watch()?;
//! while let Some(report) = watch.next_report().await {
//!     for failure in &report.callback_failures {
//!         eprintln!("subscriber {} failed: {}", failure.subscription, failure.error);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{ConfigError, ConfigStore, FileChangeEvent, FileChangeKind, FileWatcher};

/// Error type returned by change callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

type ChangeCallback = Arc<dyn Fn(&FileChangeEvent) -> Result<(), CallbackError> + Send + Sync>;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
const REPORT_BUFFER: usize = 32;

/// Identifies a registered change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, ChangeCallback)>,
}

/// A callback that returned an error while handling a change.
#[derive(Debug)]
pub struct CallbackFailure {
    /// The failing subscription.
    pub subscription: SubscriptionId,
    /// The error it returned.
    pub error: CallbackError,
}

/// Outcome of handling one file change.
#[derive(Debug)]
pub struct ReloadReport {
    /// The change that triggered the reload.
    pub event: FileChangeEvent,
    /// Set when the file could not be reloaded; the previous values are kept
    /// and no callbacks ran.
    pub reload_error: Option<ConfigError>,
    /// Callbacks that returned an error, in registration order.
    pub callback_failures: Vec<CallbackFailure>,
}

impl ReloadReport {
    /// Whether the reload and every callback succeeded.
    pub fn is_success(&self) -> bool {
        self.reload_error.is_none() && self.callback_failures.is_empty()
    }
}

/// Handle to a running configuration watch.
///
/// Dropping the handle stops the notification task and the OS watcher.
pub struct ConfigWatch {
    reports: mpsc::Receiver<ReloadReport>,
    task: JoinHandle<()>,
}

impl ConfigWatch {
    /// Wait for the next reload report.
    ///
    /// Reports that are not read promptly may be dropped once the buffer is
    /// full; reloads and callbacks still happen.
    pub async fn next_report(&mut self) -> Option<ReloadReport> {
        self.reports.recv().await
    }

    /// Stop watching.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for ConfigWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for ConfigWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigWatch")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Register a callback to run after each successful reload.
    ///
    /// Callbacks run in registration order on Tokio's blocking thread pool,
    /// together with the file read of the reload, so they may block. A
    /// callback that panics loses that change's report; watching goes on.
    ///
    /// The store keeps its callbacks alive. A callback that needs the store
    /// should capture [`ConfigStore::downgrade`] rather than a clone, or the
    /// store and the callback keep each other alive forever.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FileChangeEvent) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write();
        subscribers.next_id += 1;
        let id = SubscriptionId(subscribers.next_id);
        subscribers.entries.push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.entries.len();
        subscribers.entries.retain(|(entry, _)| *entry != id);
        subscribers.entries.len() != before
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().entries.len()
    }

    /// Watch the loaded file and reload on change, with a 100ms debounce.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::watch_with_debounce`].
    pub fn watch(&self) -> Result<ConfigWatch, ConfigError> {
        self.watch_with_debounce(DEFAULT_DEBOUNCE)
    }

    /// Watch the loaded file and reload on change.
    ///
    /// Must be called from within a Tokio runtime; the notification task is
    /// spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotLoaded` if no file was loaded,
    /// `ConfigError::InvalidConfig` outside a Tokio runtime, or the
    /// watcher's error if the file cannot be watched.
    pub fn watch_with_debounce(&self, debounce: Duration) -> Result<ConfigWatch, ConfigError> {
        let source = self.source().ok_or(ConfigError::NotLoaded)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ConfigError::invalid_config(format!("watching requires a Tokio runtime: {}", e))
        })?;

        let mut watcher = FileWatcher::new()
            .with_debounce(debounce)
            .watch_file(&source)?
            .build()?;

        let (tx, rx) = mpsc::channel(REPORT_BUFFER);
        let store = self.clone();
        let task = runtime.spawn(async move {
            while let Some(event) = watcher.next().await {
                let Some(report) = handle_change(&store, event).await else {
                    continue;
                };
                if let Err(e) = tx.try_send(report) {
                    debug!("Dropping reload report: {}", e);
                }
            }
        });

        info!("Watching configuration file {}", source.display());
        Ok(ConfigWatch { reports: rx, task })
    }

    pub(crate) fn apply_change(&self, event: FileChangeEvent) -> ReloadReport {
        if event.kind == FileChangeKind::Deleted && !event.path.exists() {
            warn!(
                "Configuration file {} was removed, keeping last loaded values",
                event.path.display()
            );
            return ReloadReport {
                reload_error: Some(ConfigError::file_not_found(&event.path)),
                callback_failures: Vec::new(),
                event,
            };
        }

        if let Err(e) = self.reload() {
            warn!(
                "Failed to reload configuration from {}: {}",
                event.path.display(),
                e
            );
            return ReloadReport {
                event,
                reload_error: Some(e),
                callback_failures: Vec::new(),
            };
        }

        let callback_failures = self.notify_subscribers(&event);
        ReloadReport {
            event,
            reload_error: None,
            callback_failures,
        }
    }

    fn notify_subscribers(&self, event: &FileChangeEvent) -> Vec<CallbackFailure> {
        // Snapshot so callbacks may subscribe or unsubscribe without deadlocking.
        let snapshot = self.subscribers.read().entries.clone();

        snapshot
            .into_iter()
            .filter_map(|(subscription, callback)| match callback(event) {
                Ok(()) => None,
                Err(error) => {
                    warn!("Configuration change callback {} failed: {}", subscription, error);
                    Some(CallbackFailure {
                        subscription,
                        error,
                    })
                }
            })
            .collect()
    }
}

/// Reload and notify off the async workers; `None` if that work panicked.
async fn handle_change(store: &ConfigStore, event: FileChangeEvent) -> Option<ReloadReport> {
    let store = store.clone();
    match tokio::task::spawn_blocking(move || store.apply_change(event)).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Configuration change handling failed: {}", e);
            None
        }
    }
}

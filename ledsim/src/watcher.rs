use std::{
    env,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace};
use notify::{
    event::{ModifyKind, RenameMode},
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Asks the tick driver to reload the effect at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReloadRequest {
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("cannot watch {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },
    #[error("cannot resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Watches the directory holding an effect source and turns changes to that
/// one file into [`ReloadRequest`]s.
///
/// Never touches the effect host itself; requests go over `requests` and are
/// applied by whoever drains the channel.
pub struct EffectWatcher {
    _watcher: RecommendedWatcher,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EffectWatcher {
    pub fn start(path: &Path, requests: Sender<ReloadRequest>) -> Result<Self, WatcherError> {
        let target = absolute(path)?;
        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_sender, event_receiver) = channel::unbounded::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |result| {
            event_sender.send(result).ok();
        })
        .map_err(|source| WatcherError::Notify {
            path: directory.clone(),
            source,
        })?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::Notify {
                path: directory.clone(),
                source,
            })?;

        info!("Watching {} for changes", target.display());

        let running: Arc<AtomicBool> = Arc::new(AtomicBool::new(true));
        let alive = running.clone();

        let handle = thread::spawn(move || {
            forward_events(&alive, &event_receiver, &requests, &target);
        });

        Ok(EffectWatcher {
            _watcher: watcher,
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops forwarding and joins the forwarding thread. Safe to call twice.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Effect watcher thread panicked");
            }
            debug!("Effect watcher stopped");
        }
    }
}

impl Drop for EffectWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward_events(
    alive: &AtomicBool,
    events: &Receiver<notify::Result<Event>>,
    requests: &Sender<ReloadRequest>,
    target: &Path,
) {
    while alive.load(Ordering::SeqCst) {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                trace!("File event {:?}", event);
                if event_touches(&event, target) {
                    let request = ReloadRequest {
                        path: target.to_path_buf(),
                    };
                    if requests.send(request).is_err() {
                        debug!("Reload channel closed, stopping watcher");
                        return;
                    }
                }
            }
            Ok(Err(err)) => error!("File watch error: {}", err),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Content changes, creates and renames onto the target. Editors that save
/// by renaming a temp file produce the latter two. Metadata changes and the
/// source side of a rename are ignored.
pub fn event_touches(event: &Event, target: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Modify(
            ModifyKind::Data(_)
                | ModifyKind::Any
                | ModifyKind::Name(RenameMode::To | RenameMode::Both)
        ) | EventKind::Create(_)
    );
    if !relevant {
        return false;
    }

    event
        .paths
        .iter()
        .any(|path| absolute(path).map(|p| p == target).unwrap_or(false))
}

/// Absolute form of `path` with its directory resolved through symlinks. The
/// file itself does not have to exist.
pub fn absolute(path: &Path) -> Result<PathBuf, WatcherError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|source| WatcherError::Resolve {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };

    match (joined.parent(), joined.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => Ok(parent.join(name)),
            Err(_) => Ok(joined),
        },
        _ => Ok(joined),
    }
}

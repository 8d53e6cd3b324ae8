// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem observation contract
//!
//! The joiner watches its artifact's directory for edits. The real
//! implementation rides `notify`'s recommended watcher; tests drive a
//! fake. Handlers run on the watcher's thread and must only enqueue.

use notify::{RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A filesystem change, carrying every path the underlying event
/// mentions (source and destination for renames).
#[derive(Debug, Clone)]
pub struct FsEvent {
    pub paths: Vec<PathBuf>,
}

impl FsEvent {
    /// Whether the change touches `root` or anything below it.
    pub fn touches(&self, root: &Path) -> bool {
        self.paths.iter().any(|p| p.starts_with(root))
    }
}

/// Callback invoked for each filesystem change, from the observer's
/// thread.
pub type FsHandler = Box<dyn Fn(FsEvent) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("cannot watch path: {0}")]
    Watch(#[from] notify::Error),
}

/// Something that can watch a directory tree for the lifetime of an
/// agent.
pub trait FsObserver: Send + 'static {
    fn schedule(&mut self, path: &Path, recursive: bool, handler: FsHandler)
        -> Result<(), ObserverError>;
}

/// Real observer backed by `notify`'s recommended watcher.
///
/// The watcher is kept alive for as long as the observer itself.
#[derive(Default)]
pub struct NotifyObserver {
    watcher: Option<notify::RecommendedWatcher>,
}

impl NotifyObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FsObserver for NotifyObserver {
    fn schedule(
        &mut self,
        path: &Path,
        recursive: bool,
        handler: FsHandler,
    ) -> Result<(), ObserverError> {
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => handler(FsEvent { paths: event.paths }),
                    Err(e) => tracing::warn!(error = %e, "filesystem watch error"),
                }
            })?;
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(path, mode)?;
        self.watcher = Some(watcher);
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{FsEvent, FsHandler, FsObserver, ObserverError};
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeObserverState {
        scheduled: Vec<(PathBuf, bool)>,
        handlers: Vec<FsHandler>,
    }

    /// Recording observer; tests fire events through it.
    #[derive(Clone, Default)]
    pub struct FakeObserver {
        state: Arc<Mutex<FakeObserverState>>,
    }

    impl FakeObserver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Paths scheduled so far, with their recursive flag.
        pub fn scheduled(&self) -> Vec<(PathBuf, bool)> {
            self.state.lock().scheduled.clone()
        }

        /// Deliver an event to every scheduled handler.
        pub fn emit(&self, event: FsEvent) {
            let state = self.state.lock();
            for handler in &state.handlers {
                handler(event.clone());
            }
        }

        /// Deliver an event touching a single path.
        pub fn emit_path(&self, path: impl Into<PathBuf>) {
            self.emit(FsEvent {
                paths: vec![path.into()],
            });
        }
    }

    impl FsObserver for FakeObserver {
        fn schedule(
            &mut self,
            path: &Path,
            recursive: bool,
            handler: FsHandler,
        ) -> Result<(), ObserverError> {
            let mut state = self.state.lock();
            state.scheduled.push((path.to_path_buf(), recursive));
            state.handlers.push(handler);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeObserver;

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;

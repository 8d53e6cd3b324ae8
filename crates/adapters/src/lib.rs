// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zkfarm-adapters: contracts for the services the engine talks to
//!
//! The coordination service and the filesystem watcher are consumed
//! through traits so the engine can be driven by in-memory doubles in
//! tests and by real clients in production.

pub mod coordinator;
pub mod observer;

#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use coordinator::{
    parent, Acl, CoordError, Coordinator, NodeMeta, SessionListener, SessionState, WatchEvent,
    WatchHandler, WatchKind, OPEN_ACL_UNSAFE,
};
pub use observer::{FsEvent, FsHandler, FsObserver, NotifyObserver, ObserverError};

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryCoordinator;
#[cfg(any(test, feature = "test-support"))]
pub use observer::FakeObserver;

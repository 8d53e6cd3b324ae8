// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination-service contract
//!
//! The engine consumes the coordination service through this trait:
//! a hierarchical tree of nodes with one-shot watches, ephemeral
//! ownership, and monotonic write identifiers (zxids). Watches are set
//! semantics per path and kind: re-registering while one is outstanding
//! coalesces to a single notification.

use std::time::Duration;
use thiserror::Error;

/// Connection state reported to session listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Suspended,
    Lost,
}

/// Callback invoked on session-state transitions, from the client's
/// own threads.
pub type SessionListener = Box<dyn Fn(SessionState) + Send + Sync>;

/// Metadata returned alongside node payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMeta {
    /// zxid of the write that last modified the node
    pub mzxid: i64,
    /// Bumped on every data change, used for compare-and-set
    pub version: i32,
    /// Session that owns the node, 0 for persistent nodes
    pub ephemeral_owner: u64,
}

/// What a one-shot watch observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Data,
    Children,
}

/// Delivered to a watch handler exactly once, from the client's
/// callback thread.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchKind,
}

/// One-shot watch callback
pub type WatchHandler = Box<dyn FnOnce(WatchEvent) + Send>;

pub const PERM_ALL: u32 = 0x1f;

/// Access-control entry for created nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acl {
    pub perms: u32,
    pub scheme: &'static str,
    pub id: &'static str,
}

/// World-writable ACL used for farm nodes
pub const OPEN_ACL_UNSAFE: &[Acl] = &[Acl {
    perms: PERM_ALL,
    scheme: "world",
    id: "anyone",
}];

/// Errors from coordination operations
#[derive(Debug, Error)]
pub enum CoordError {
    #[error("no node: {0}")]
    NoNode(String),
    #[error("node already exists: {0}")]
    NodeExists(String),
    #[error("version conflict on {0}")]
    BadVersion(String),
    #[error("connection lost")]
    ConnectionLoss,
    #[error("operation timed out")]
    OperationTimeout,
    #[error("session expired")]
    SessionExpired,
    #[error("session closed, retries exhausted")]
    Closed,
}

impl CoordError {
    /// Whether retrying the same call can succeed once the connection
    /// settles.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoordError::ConnectionLoss | CoordError::OperationTimeout | CoordError::SessionExpired
        )
    }

    /// Terminal errors abort the agent.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoordError::Closed)
    }
}

const RETRY_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(100);
const RETRY_DELAY_CAP: Duration = Duration::from_secs(2);

/// A client session against the coordination service.
///
/// Clones share the session. All calls are blocking; callers living on
/// an FSM thread accept that network stalls delay event processing.
pub trait Coordinator: Clone + Send + Sync + 'static {
    /// Create `path` and any missing ancestors as persistent nodes.
    /// Existing nodes are left alone.
    fn ensure_path(&self, path: &str, acl: &[Acl]) -> Result<(), CoordError>;

    /// Create a node. The parent must exist.
    fn create(&self, path: &str, data: &[u8], acl: &[Acl], ephemeral: bool)
        -> Result<(), CoordError>;

    /// Fetch a node's payload and metadata, optionally arming a
    /// one-shot data watch.
    fn get(&self, path: &str, watch: Option<WatchHandler>) -> Result<(Vec<u8>, NodeMeta), CoordError>;

    /// Overwrite a node's payload, returning the new metadata.
    fn set(&self, path: &str, data: &[u8]) -> Result<NodeMeta, CoordError>;

    /// Overwrite only if the node's version still matches.
    fn set_version(&self, path: &str, data: &[u8], version: i32) -> Result<NodeMeta, CoordError>;

    /// List a node's children, optionally arming a one-shot children
    /// watch.
    fn get_children(&self, path: &str, watch: Option<WatchHandler>)
        -> Result<Vec<String>, CoordError>;

    /// Register a session-state listener.
    fn add_listener(&self, listener: SessionListener);

    /// Run an idempotent operation, retrying transient failures with
    /// backoff. Exhausting the retry budget is terminal.
    fn retry<T>(&self, mut op: impl FnMut() -> Result<T, CoordError>) -> Result<T, CoordError> {
        let mut delay = RETRY_DELAY;
        for attempt in 0..RETRY_ATTEMPTS {
            match op() {
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, attempt, "retrying coordination call");
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(RETRY_DELAY_CAP);
                }
                other => return other,
            }
        }
        Err(CoordError::Closed)
    }
}

/// Parent of a coordination path, `None` at the root.
pub fn parent(path: &str) -> Option<&str> {
    match path.rsplit_once('/') {
        Some(("", _)) | None => None,
        Some((parent, _)) => Some(parent),
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

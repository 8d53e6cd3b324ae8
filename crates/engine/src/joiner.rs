// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Farm joiner
//!
//! Publishes the local artifact as this host's member node and keeps
//! the two reconciled: filesystem edits flow to the coordination tree,
//! remote edits flow back to the artifact, and the zxid high-water
//! mark keeps our own writes from echoing into a feedback loop.
//!
//! The member node is ephemeral and the local artifact is
//! authoritative: whenever the session is reestablished the node is
//! recreated from the current local content. In common mode the node
//! is persistent and shared, and the remote side wins instead.

use crate::bus::EventBus;
use crate::fsm::{
    Agent, AgentError, AgentState, EventKind, FarmEvent, Flow, TransitionTable,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zkfarm_adapters::{
    parent, CoordError, Coordinator, FsEvent, FsObserver, WatchHandler, OPEN_ACL_UNSAFE,
};
use zkfarm_conf::Conf;
use zkfarm_core::{payload, Value};

/// How this agent participates in the farm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// An ephemeral member named by host id; local content wins
    Member { id: String, hostname: String },
    /// The shared persistent `common` node; remote content wins
    Common,
}

impl Membership {
    fn node_name(&self) -> &str {
        match self {
            Membership::Member { id, .. } => id,
            Membership::Common => "common",
        }
    }

    fn is_common(&self) -> bool {
        matches!(self, Membership::Common)
    }
}

const EVENTS: TransitionTable = TransitionTable::new(&[
    (
        EventKind::InitialSetup,
        &[(AgentState::Initial, AgentState::ObserverReady)],
    ),
    (
        EventKind::InitialZnodeSetup,
        &[
            (AgentState::ObserverReady, AgentState::Idle),
            (AgentState::Idle, AgentState::Idle),
        ],
    ),
    (
        EventKind::ZnodeModified,
        &[
            (AgentState::Idle, AgentState::Idle),
            (AgentState::ObserverReady, AgentState::ObserverReady),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::LocalModified,
        &[
            (AgentState::Idle, AgentState::Idle),
            (AgentState::ObserverReady, AgentState::ObserverReady),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::ConnectionLost,
        &[
            (AgentState::ObserverReady, AgentState::Lost),
            (AgentState::Idle, AgentState::Lost),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::ConnectionRecovered,
        &[
            (AgentState::Lost, AgentState::ObserverReady),
            (AgentState::ObserverReady, AgentState::ObserverReady),
        ],
    ),
]);

/// Joins a farm and keeps the member node and local artifact in sync
pub struct Joiner<C: Coordinator, K: Conf, O: FsObserver> {
    coordinator: C,
    conf: K,
    node_path: String,
    membership: Membership,
    bus: Arc<EventBus>,
    observer: Option<O>,
    /// Whether a data watch on the member node is outstanding; cleared
    /// by the watch callback itself.
    monitored: Arc<AtomicBool>,
    /// zxid of our last write to the node; anything at or below it is
    /// our own echo.
    mzxid: Option<i64>,
}

impl<C: Coordinator, K: Conf, O: FsObserver> Joiner<C, K, O> {
    /// Build a joiner and queue its initial setup.
    pub fn new(
        coordinator: C,
        conf: K,
        farm_path: &str,
        membership: Membership,
        observer: O,
        bus: Arc<EventBus>,
    ) -> Self {
        bus.post(FarmEvent::InitialSetup);
        Self {
            node_path: format!("{}/{}", farm_path, membership.node_name()),
            coordinator,
            conf,
            membership,
            bus,
            observer: Some(observer),
            monitored: Arc::new(AtomicBool::new(false)),
            mzxid: None,
        }
    }

    /// The member node this agent owns.
    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    fn node_watch(&self) -> WatchHandler {
        let bus = Arc::clone(&self.bus);
        let monitored = Arc::clone(&self.monitored);
        Box::new(move |_event| {
            monitored.store(false, Ordering::SeqCst);
            bus.post(FarmEvent::ZnodeModified);
        })
    }

    /// Local bookkeeping: inject the hostname, start the filesystem
    /// observer, then move on to the coordination side.
    fn initial_setup(&mut self) -> Result<Flow, AgentError> {
        let mut info = self.conf.read()?.unwrap_or_default();
        if let Membership::Member { hostname, .. } = &self.membership {
            info.insert("hostname".to_string(), Value::from(hostname.clone()));
        }
        self.conf.write(&info)?;
        self.mzxid = None;

        let root = artifact_root(self.conf.path());
        if let Some(observer) = self.observer.as_mut() {
            let bus = Arc::clone(&self.bus);
            let guard_root = root.clone();
            observer.schedule(
                &root,
                true,
                Box::new(move |event: FsEvent| {
                    // Ignore sibling files; catch rename-into events
                    if event.touches(&guard_root) {
                        bus.post(FarmEvent::LocalModified);
                    }
                }),
            )?;
        }

        self.bus.post(FarmEvent::InitialZnodeSetup);
        Ok(Flow::Transition)
    }

    /// Create the member node and arm its data watch. An existing node
    /// is a signal, not an error: our content overwrites it, except in
    /// common mode where the remote side is adopted.
    fn initial_znode_setup(&mut self) -> Result<Flow, AgentError> {
        if let Some(parent) = parent(&self.node_path) {
            self.coordinator.ensure_path(parent, OPEN_ACL_UNSAFE)?;
        }
        let info = self.conf.read()?.unwrap_or_default();
        match self.coordinator.create(
            &self.node_path,
            &payload::encode(&info),
            OPEN_ACL_UNSAFE,
            !self.membership.is_common(),
        ) {
            Ok(()) => {}
            Err(CoordError::NodeExists(_)) if self.membership.is_common() => {
                tracing::info!(path = %self.node_path, "shared node exists, adopting remote content");
                self.bus.post(FarmEvent::ZnodeModified);
            }
            Err(CoordError::NodeExists(_)) => {
                tracing::info!(path = %self.node_path, "member node lingers, local content wins");
                self.bus.post(FarmEvent::LocalModified);
            }
            Err(e) => return Err(e.into()),
        }
        self.coordinator.get(&self.node_path, Some(self.node_watch()))?;
        self.monitored.store(true, Ordering::SeqCst);
        Ok(Flow::Transition)
    }

    /// Push a local change to the member node, remembering the zxid so
    /// the resulting watch event is recognized as our own echo.
    fn local_modified(&mut self) -> Result<Flow, AgentError> {
        let (data, _) = self.coordinator.get(&self.node_path, None)?;
        let remote = payload::decode(&data);
        let local = match self.conf.read() {
            Ok(local) => local.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read local artifact, skipping this cycle");
                return Ok(Flow::Transition);
            }
        };
        if remote != local {
            tracing::info!("local configuration changed");
            tracing::debug!(?remote, ?local, "pushing local content");
            let meta = self
                .coordinator
                .set(&self.node_path, &payload::encode(&local))?;
            self.mzxid = Some(meta.mzxid);
        }
        Ok(Flow::Transition)
    }

    /// Apply a remote change to the artifact, unless it is the echo of
    /// our own write or older.
    fn znode_modified(&mut self) -> Result<Flow, AgentError> {
        let local = self.conf.read()?.unwrap_or_default();
        let arming = !self.monitored.load(Ordering::SeqCst);
        let watch = arming.then(|| self.node_watch());
        let (data, meta) = match self.coordinator.get(&self.node_path, watch) {
            Ok(found) => found,
            Err(CoordError::NoNode(_)) => {
                tracing::warn!(path = %self.node_path, "cannot watch node, it no longer exists");
                return Ok(Flow::Transition);
            }
            Err(e) => return Err(e.into()),
        };
        if arming {
            self.monitored.store(true, Ordering::SeqCst);
        }
        if let Some(mzxid) = self.mzxid {
            if meta.mzxid <= mzxid {
                tracing::debug!(
                    remote = meta.mzxid,
                    ours = mzxid,
                    "discarding remote modification older than our latest write"
                );
                return Ok(Flow::Transition);
            }
        }
        let remote = payload::decode(&data);
        if remote != local {
            tracing::info!("remote configuration changed");
            tracing::debug!(?local, ?remote, "applying remote content");
            self.conf.write(&remote)?;
        }
        Ok(Flow::Transition)
    }
}

impl<C: Coordinator, K: Conf, O: FsObserver> Agent for Joiner<C, K, O> {
    fn table(&self) -> &'static TransitionTable {
        &EVENTS
    }

    fn handle(&mut self, event: &FarmEvent, from: AgentState) -> Result<Flow, AgentError> {
        match (event.kind(), from) {
            (EventKind::InitialSetup, _) => self.initial_setup(),
            // Tolerated when several reconnects race
            (EventKind::InitialZnodeSetup, AgentState::Idle) => Ok(Flow::Transition),
            (EventKind::InitialZnodeSetup, _) => self.initial_znode_setup(),
            (EventKind::LocalModified, AgentState::Idle) => self.local_modified(),
            (EventKind::LocalModified, _) => Ok(Flow::Transition),
            (EventKind::ZnodeModified, AgentState::Idle) => self.znode_modified(),
            (EventKind::ZnodeModified, _) => {
                self.monitored.store(false, Ordering::SeqCst);
                Ok(Flow::Transition)
            }
            (EventKind::ConnectionRecovered, _) => {
                tracing::info!("connection reestablished, recreating the member node");
                self.bus.post(FarmEvent::InitialZnodeSetup);
                Ok(Flow::Transition)
            }
            _ => Ok(Flow::Transition),
        }
    }
}

/// Directory the observer should watch: the artifact itself when it is
/// a directory, its parent otherwise.
fn artifact_root(path: &Path) -> PathBuf {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if resolved.is_dir() {
        resolved
    } else {
        match resolved.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => resolved,
        }
    }
}

#[cfg(test)]
#[path = "joiner_tests.rs"]
mod tests;

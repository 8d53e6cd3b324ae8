// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Farm exporter
//!
//! Watches the farm path recursively: a children watch on the farm
//! node, a data watch per member. Every wake rebuilds the snapshot
//! from the observed children and their latest payloads, applies the
//! filter, and hands the result to the sink (which only touches the
//! file when the content changed).

use crate::bus::EventBus;
use crate::fsm::{
    Agent, AgentError, AgentState, EventKind, FarmEvent, Flow, TransitionTable,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zkfarm_adapters::{CoordError, Coordinator, WatchHandler, OPEN_ACL_UNSAFE};
use zkfarm_conf::Conf;
use zkfarm_core::{payload, Filter, MemberMap, Value};

/// Invoked after each snapshot write
pub type UpdatedHandler = Box<dyn FnMut() + Send>;

/// Outstanding one-shot watches, shared with the watch callbacks.
///
/// A callback removes its registration before posting its event, so a
/// wake always re-arms even when the callback thread races the
/// handler.
#[derive(Default)]
struct WatchLedger {
    root: AtomicBool,
    members: Mutex<HashSet<String>>,
}

impl WatchLedger {
    /// Mark the children watch armed; false if it already was.
    fn arm_root(&self) -> bool {
        !self.root.swap(true, Ordering::SeqCst)
    }

    fn disarm_root(&self) {
        self.root.store(false, Ordering::SeqCst);
    }

    /// Mark a member data watch armed; false if it already was.
    fn arm_member(&self, path: &str) -> bool {
        self.members.lock().insert(path.to_string())
    }

    fn forget_member(&self, path: &str) {
        self.members.lock().remove(path);
    }

    fn clear(&self) {
        self.disarm_root();
        self.members.lock().clear();
    }
}

const EVENTS: TransitionTable = TransitionTable::new(&[
    (
        EventKind::InitialSetup,
        &[
            (AgentState::Initial, AgentState::Idle),
            (AgentState::Idle, AgentState::Idle),
        ],
    ),
    (
        EventKind::ChildrenModified,
        &[
            (AgentState::Idle, AgentState::Idle),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::NodeModified,
        &[
            (AgentState::Idle, AgentState::Idle),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::ConnectionLost,
        &[
            (AgentState::Initial, AgentState::Lost),
            (AgentState::Idle, AgentState::Lost),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::ConnectionRecovered,
        &[
            (AgentState::Lost, AgentState::Initial),
            (AgentState::Idle, AgentState::Initial),
            (AgentState::Initial, AgentState::Initial),
        ],
    ),
]);

/// Materializes a farm into a local sink
pub struct Exporter<C: Coordinator, K: Conf> {
    coordinator: C,
    conf: K,
    farm_path: String,
    filter: Filter,
    updated: Option<UpdatedHandler>,
    bus: Arc<EventBus>,
    watches: Arc<WatchLedger>,
}

impl<C: Coordinator, K: Conf> Exporter<C, K> {
    /// Build an exporter and queue its initial setup.
    pub fn new(
        coordinator: C,
        conf: K,
        farm_path: impl Into<String>,
        bus: Arc<EventBus>,
        filter: Filter,
    ) -> Self {
        bus.post(FarmEvent::InitialSetup);
        Self {
            coordinator,
            conf,
            farm_path: farm_path.into(),
            filter,
            updated: None,
            bus,
            watches: Arc::default(),
        }
    }

    /// Invoke `handler` after every snapshot write.
    pub fn with_updated(mut self, handler: UpdatedHandler) -> Self {
        self.updated = Some(handler);
        self
    }

    fn root_watch(&self) -> WatchHandler {
        let bus = Arc::clone(&self.bus);
        let watches = Arc::clone(&self.watches);
        Box::new(move |_event| {
            watches.disarm_root();
            bus.post(FarmEvent::ChildrenModified);
        })
    }

    fn member_watch(&self) -> WatchHandler {
        let bus = Arc::clone(&self.bus);
        let watches = Arc::clone(&self.watches);
        Box::new(move |event| {
            watches.forget_member(&event.path);
            bus.post(FarmEvent::NodeModified { path: event.path });
        })
    }

    fn initial_setup(&mut self) -> Result<Flow, AgentError> {
        self.watches.clear();
        match self.coordinator.ensure_path(&self.farm_path, OPEN_ACL_UNSAFE) {
            Ok(()) | Err(CoordError::NodeExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.bus.post(FarmEvent::ChildrenModified);
        Ok(Flow::Transition)
    }

    /// Rebuild the snapshot, re-arming whatever watches are no longer
    /// outstanding.
    fn refresh_snapshot(&mut self) -> Result<Flow, AgentError> {
        let root_watch = self.watches.arm_root().then(|| self.root_watch());
        let arming_root = root_watch.is_some();
        let children = match self.coordinator.get_children(&self.farm_path, root_watch) {
            Ok(children) => children,
            Err(e) => {
                if arming_root {
                    self.watches.disarm_root();
                }
                return Err(e.into());
            }
        };

        let mut snapshot = MemberMap::new();
        for name in children {
            let member_path = format!("{}/{}", self.farm_path, name);
            let member_watch = self
                .watches
                .arm_member(&member_path)
                .then(|| self.member_watch());
            let info = match self.coordinator.get(&member_path, member_watch) {
                Ok((data, _)) => payload::decode(&data),
                Err(CoordError::NoNode(_)) => {
                    // Vanished between listing and fetch; the next
                    // children watch will drop it from the snapshot
                    self.watches.forget_member(&member_path);
                    continue;
                }
                Err(e) => {
                    self.watches.forget_member(&member_path);
                    return Err(e.into());
                }
            };
            if self.filter.matches(&info) {
                snapshot.insert(name, Value::Map(info));
            }
        }

        self.conf.write(&snapshot)?;
        if let Some(updated) = &mut self.updated {
            updated();
        }
        Ok(Flow::Transition)
    }

    fn member_changed(&mut self, path: &str) -> Result<Flow, AgentError> {
        self.watches.forget_member(path);
        self.bus.post(FarmEvent::ChildrenModified);
        Ok(Flow::Transition)
    }
}

impl<C: Coordinator, K: Conf> Agent for Exporter<C, K> {
    fn table(&self) -> &'static TransitionTable {
        &EVENTS
    }

    fn handle(&mut self, event: &FarmEvent, from: AgentState) -> Result<Flow, AgentError> {
        match (event, from) {
            // Tolerated when several reconnects race
            (FarmEvent::InitialSetup, AgentState::Idle) => Ok(Flow::Transition),
            (FarmEvent::InitialSetup, _) => self.initial_setup(),
            (FarmEvent::ChildrenModified, AgentState::Idle) => self.refresh_snapshot(),
            (FarmEvent::ChildrenModified, _) => {
                self.watches.disarm_root();
                Ok(Flow::Transition)
            }
            (FarmEvent::NodeModified { path }, _) => self.member_changed(path),
            (FarmEvent::ConnectionRecovered, _) => {
                tracing::info!("connection reestablished, rebuilding the farm view");
                self.bus.post(FarmEvent::InitialSetup);
                Ok(Flow::Transition)
            }
            _ => Ok(Flow::Transition),
        }
    }
}

#[cfg(test)]
#[path = "exporter_tests.rs"]
mod tests;

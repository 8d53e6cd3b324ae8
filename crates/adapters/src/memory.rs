// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory coordination service for tests
//!
//! A single-session tree with the same observable behavior the engine
//! relies on: monotonic zxids, ephemeral ownership, one-shot watches
//! with set semantics, and session expiry that drops both watches and
//! ephemerals.

use crate::coordinator::{
    parent, Acl, CoordError, Coordinator, NodeMeta, SessionListener, SessionState, WatchEvent,
    WatchHandler, WatchKind,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

struct Node {
    data: Vec<u8>,
    mzxid: i64,
    version: i32,
    ephemeral_owner: u64,
}

#[derive(Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    data_watches: HashMap<String, WatchHandler>,
    child_watches: HashMap<String, WatchHandler>,
    next_zxid: i64,
    session_id: u64,
}

impl Tree {
    fn zxid(&mut self) -> i64 {
        self.next_zxid += 1;
        self.next_zxid
    }

    fn take_data_watch(&mut self, path: &str) -> Option<WatchHandler> {
        self.data_watches.remove(path)
    }

    fn take_child_watch(&mut self, path: &str) -> Option<WatchHandler> {
        self.child_watches.remove(path)
    }
}

#[derive(Default)]
struct Inner {
    tree: Mutex<Tree>,
    listeners: Mutex<Vec<SessionListener>>,
}

/// An in-memory [`Coordinator`]. Clones share the same tree and
/// session.
#[derive(Clone, Default)]
pub struct MemoryCoordinator {
    inner: Arc<Inner>,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        let coordinator = Self::default();
        coordinator.inner.tree.lock().session_id = 1;
        coordinator
    }

    /// The current session id, as stamped on ephemeral nodes.
    pub fn session_id(&self) -> u64 {
        self.inner.tree.lock().session_id
    }

    /// Raw payload of a node, for assertions.
    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.tree.lock().nodes.get(path).map(|n| n.data.clone())
    }

    /// Whether a node exists.
    pub fn exists(&self, path: &str) -> bool {
        self.inner.tree.lock().nodes.contains_key(path)
    }

    /// Session owning the node, 0 when persistent, `None` when absent.
    pub fn ephemeral_owner(&self, path: &str) -> Option<u64> {
        self.inner.tree.lock().nodes.get(path).map(|n| n.ephemeral_owner)
    }

    /// Delete a node outright, firing watches as the real service
    /// would. Test-side stand-in for another session removing a member.
    pub fn delete(&self, path: &str) {
        let fired = {
            let mut tree = self.inner.tree.lock();
            if tree.nodes.remove(path).is_none() {
                return;
            }
            let mut fired = Vec::new();
            if let Some(watch) = tree.take_data_watch(path) {
                fired.push((watch, WatchEvent {
                    path: path.to_string(),
                    kind: WatchKind::Data,
                }));
            }
            if let Some(parent) = parent(path) {
                if let Some(watch) = tree.take_child_watch(parent) {
                    fired.push((watch, WatchEvent {
                        path: parent.to_string(),
                        kind: WatchKind::Children,
                    }));
                }
            }
            fired
        };
        dispatch(fired);
    }

    /// Expire the session: watches die silently, ephemerals vanish,
    /// listeners observe `Lost` then `Connected` under a new session.
    pub fn expire_session(&self) {
        self.fire_session_event(SessionState::Lost);
        {
            let mut tree = self.inner.tree.lock();
            tree.data_watches.clear();
            tree.child_watches.clear();
            let session = tree.session_id;
            tree.nodes.retain(|_, node| node.ephemeral_owner != session);
            tree.session_id += 1;
        }
        self.fire_session_event(SessionState::Connected);
    }

    /// Deliver a bare session-state transition to listeners.
    pub fn fire_session_event(&self, state: SessionState) {
        let listeners = self.inner.listeners.lock();
        for listener in listeners.iter() {
            listener(state);
        }
    }

    fn create_node(&self, path: &str, data: &[u8], ephemeral: bool) -> Result<NodeMeta, CoordError> {
        let (meta, fired) = {
            let mut tree = self.inner.tree.lock();
            if tree.nodes.contains_key(path) {
                return Err(CoordError::NodeExists(path.to_string()));
            }
            if let Some(parent) = parent(path) {
                if !tree.nodes.contains_key(parent) {
                    return Err(CoordError::NoNode(parent.to_string()));
                }
            }
            let zxid = tree.zxid();
            let session = tree.session_id;
            let node = Node {
                data: data.to_vec(),
                mzxid: zxid,
                version: 0,
                ephemeral_owner: if ephemeral { session } else { 0 },
            };
            let meta = NodeMeta {
                mzxid: node.mzxid,
                version: node.version,
                ephemeral_owner: node.ephemeral_owner,
            };
            tree.nodes.insert(path.to_string(), node);

            let mut fired = Vec::new();
            if let Some(parent) = parent(path) {
                if let Some(watch) = tree.take_child_watch(parent) {
                    fired.push((
                        watch,
                        WatchEvent {
                            path: parent.to_string(),
                            kind: WatchKind::Children,
                        },
                    ));
                }
            }
            (meta, fired)
        };
        dispatch(fired);
        Ok(meta)
    }

    fn set_node(
        &self,
        path: &str,
        data: &[u8],
        expected_version: Option<i32>,
    ) -> Result<NodeMeta, CoordError> {
        let (meta, fired) = {
            let mut tree = self.inner.tree.lock();
            let zxid = {
                let Some(node) = tree.nodes.get(path) else {
                    return Err(CoordError::NoNode(path.to_string()));
                };
                if expected_version.is_some_and(|v| v != node.version) {
                    return Err(CoordError::BadVersion(path.to_string()));
                }
                tree.zxid()
            };
            let Some(node) = tree.nodes.get_mut(path) else {
                return Err(CoordError::NoNode(path.to_string()));
            };
            node.data = data.to_vec();
            node.mzxid = zxid;
            node.version += 1;
            let meta = NodeMeta {
                mzxid: node.mzxid,
                version: node.version,
                ephemeral_owner: node.ephemeral_owner,
            };

            let mut fired = Vec::new();
            if let Some(watch) = tree.take_data_watch(path) {
                fired.push((
                    watch,
                    WatchEvent {
                        path: path.to_string(),
                        kind: WatchKind::Data,
                    },
                ));
            }
            (meta, fired)
        };
        dispatch(fired);
        Ok(meta)
    }
}

fn dispatch(fired: Vec<(WatchHandler, WatchEvent)>) {
    for (watch, event) in fired {
        watch(event);
    }
}

impl Coordinator for MemoryCoordinator {
    fn ensure_path(&self, path: &str, _acl: &[Acl]) -> Result<(), CoordError> {
        let mut tree = self.inner.tree.lock();
        let mut prefix = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            prefix.push('/');
            prefix.push_str(component);
            if !tree.nodes.contains_key(&prefix) {
                let zxid = tree.zxid();
                tree.nodes.insert(
                    prefix.clone(),
                    Node {
                        data: Vec::new(),
                        mzxid: zxid,
                        version: 0,
                        ephemeral_owner: 0,
                    },
                );
            }
        }
        Ok(())
    }

    fn create(
        &self,
        path: &str,
        data: &[u8],
        _acl: &[Acl],
        ephemeral: bool,
    ) -> Result<(), CoordError> {
        self.create_node(path, data, ephemeral).map(|_| ())
    }

    fn get(&self, path: &str, watch: Option<WatchHandler>) -> Result<(Vec<u8>, NodeMeta), CoordError> {
        let mut tree = self.inner.tree.lock();
        let Some(node) = tree.nodes.get(path) else {
            return Err(CoordError::NoNode(path.to_string()));
        };
        let result = (
            node.data.clone(),
            NodeMeta {
                mzxid: node.mzxid,
                version: node.version,
                ephemeral_owner: node.ephemeral_owner,
            },
        );
        if let Some(watch) = watch {
            tree.data_watches.insert(path.to_string(), watch);
        }
        Ok(result)
    }

    fn set(&self, path: &str, data: &[u8]) -> Result<NodeMeta, CoordError> {
        self.set_node(path, data, None)
    }

    fn set_version(&self, path: &str, data: &[u8], version: i32) -> Result<NodeMeta, CoordError> {
        self.set_node(path, data, Some(version))
    }

    fn get_children(
        &self,
        path: &str,
        watch: Option<WatchHandler>,
    ) -> Result<Vec<String>, CoordError> {
        let mut tree = self.inner.tree.lock();
        if !tree.nodes.contains_key(path) {
            return Err(CoordError::NoNode(path.to_string()));
        }
        let children = tree
            .nodes
            .keys()
            .filter_map(|candidate| {
                let rest = candidate.strip_prefix(path)?.strip_prefix('/')?;
                (!rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        if let Some(watch) = watch {
            tree.child_watches.insert(path.to_string(), watch);
        }
        Ok(children)
    }

    fn add_listener(&self, listener: SessionListener) {
        self.inner.listeners.lock().push(listener);
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

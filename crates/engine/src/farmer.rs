// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! High-level farm operations
//!
//! The embedding API: join or export a farm (running the agent loop
//! forever), and inspect or edit farm nodes directly.

use crate::bus::EventBus;
use crate::exporter::{Exporter, UpdatedHandler};
use crate::fsm::{Fsm, FsmError};
use crate::joiner::{Joiner, Membership};
use crate::listener::bridge_session;
use std::sync::Arc;
use thiserror::Error;
use zkfarm_adapters::{CoordError, Coordinator, FsObserver, OPEN_ACL_UNSAFE};
use zkfarm_conf::{Conf, ConfError};
use zkfarm_core::{
    get_path, payload, select_fields, set_path, unset_path, Filter, FilterError, MemberMap,
    NetError, Value,
};

/// Attempts at a compare-and-set field update before giving up
const SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum FarmError {
    #[error(transparent)]
    Coordination(#[from] CoordError),
    #[error(transparent)]
    Conf(#[from] ConfError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Fsm(#[from] FsmError),
    #[error("node kept changing while updating {0}")]
    Conflicted(String),
}

/// Farm health verdict, in monitoring-plugin convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl CheckStatus {
    /// Process exit code for monitoring integrations.
    pub fn exit_code(self) -> i32 {
        match self {
            CheckStatus::Ok => 0,
            CheckStatus::Warning => 1,
            CheckStatus::Critical => 2,
            CheckStatus::Unknown => 3,
        }
    }
}

/// Farm-level operations over one coordination session
pub struct Farmer<C: Coordinator> {
    coordinator: C,
}

impl<C: Coordinator> Farmer<C> {
    pub fn new(coordinator: C) -> Self {
        Self { coordinator }
    }

    /// Join a farm as this host's ephemeral member and reconcile until
    /// the process is stopped. The farm's high-water `size` property is
    /// bumped when this member grows it.
    pub fn join<K, O>(&self, farm_path: &str, conf: K, observer: O) -> Result<(), FarmError>
    where
        K: Conf + 'static,
        O: FsObserver,
    {
        let membership = Membership::Member {
            id: zkfarm_core::ip()?,
            hostname: zkfarm_core::hostname()?,
        };
        self.join_as(farm_path, conf, observer, membership)
    }

    /// Join a farm on the shared persistent `common` node, where the
    /// coordination tree is authoritative.
    pub fn join_common<K, O>(&self, farm_path: &str, conf: K, observer: O) -> Result<(), FarmError>
    where
        K: Conf + 'static,
        O: FsObserver,
    {
        self.join_as(farm_path, conf, observer, Membership::Common)
    }

    fn join_as<K, O>(
        &self,
        farm_path: &str,
        conf: K,
        observer: O,
        membership: Membership,
    ) -> Result<(), FarmError>
    where
        K: Conf + 'static,
        O: FsObserver,
    {
        self.coordinator
            .retry(|| self.coordinator.ensure_path(farm_path, OPEN_ACL_UNSAFE))?;
        self.record_farm_size(farm_path)?;

        let bus = Arc::new(EventBus::new());
        bridge_session(&self.coordinator, &bus);
        let joiner = Joiner::new(
            self.coordinator.clone(),
            conf,
            farm_path,
            membership,
            observer,
            Arc::clone(&bus),
        );
        Fsm::new(bus, joiner).run()?;
        Ok(())
    }

    /// Observe a farm and keep a local sink up to date until the
    /// process is stopped.
    pub fn export<K>(
        &self,
        farm_path: &str,
        conf: K,
        filters: Option<&str>,
        updated: Option<UpdatedHandler>,
    ) -> Result<(), FarmError>
    where
        K: Conf + 'static,
    {
        let filter = match filters {
            Some(expr) => Filter::parse(expr)?,
            None => Filter::match_all(),
        };
        let bus = Arc::new(EventBus::new());
        bridge_session(&self.coordinator, &bus);
        let mut exporter = Exporter::new(
            self.coordinator.clone(),
            conf,
            farm_path,
            Arc::clone(&bus),
            filter,
        );
        if let Some(updated) = updated {
            exporter = exporter.with_updated(updated);
        }
        Fsm::new(bus, exporter).run()?;
        Ok(())
    }

    /// Member ids currently in the farm; an absent farm is empty.
    pub fn list(&self, farm_path: &str) -> Result<Vec<String>, FarmError> {
        match self
            .coordinator
            .retry(|| self.coordinator.get_children(farm_path, None))
        {
            Ok(mut children) => {
                children.sort();
                Ok(children)
            }
            Err(CoordError::NoNode(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// A node's payload; an absent node reads as `{"size": 0}` so farm
    /// properties have a defined default.
    pub fn get(&self, node_path: &str) -> Result<MemberMap, FarmError> {
        match self.coordinator.retry(|| self.coordinator.get(node_path, None)) {
            Ok((data, _)) => Ok(payload::decode(&data)),
            Err(CoordError::NoNode(_)) => {
                let mut map = MemberMap::new();
                map.insert("size".to_string(), Value::Int(0));
                Ok(map)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A node's payload projected onto dotted field paths.
    pub fn get_fields(&self, node_path: &str, fields: &[String]) -> Result<MemberMap, FarmError> {
        Ok(select_fields(&self.get(node_path)?, fields))
    }

    /// Set one dotted field on a node.
    pub fn set(&self, node_path: &str, field: &str, value: Value) -> Result<(), FarmError> {
        self.update(node_path, |info| set_path(info, field, value.clone()))
    }

    /// Remove one dotted field from a node.
    pub fn unset(&self, node_path: &str, field: &str) -> Result<(), FarmError> {
        self.update(node_path, |info| {
            unset_path(info, field);
        })
    }

    /// Read-modify-write with compare-and-set; a concurrent writer
    /// refreshes the read and retries.
    fn update(&self, node_path: &str, mutate: impl Fn(&mut MemberMap)) -> Result<(), FarmError> {
        for _ in 0..SAVE_ATTEMPTS {
            let (data, meta) = self
                .coordinator
                .retry(|| self.coordinator.get(node_path, None))?;
            let mut info = payload::decode(&data);
            mutate(&mut info);
            let encoded = payload::encode(&info);
            match self
                .coordinator
                .retry(|| self.coordinator.set_version(node_path, &encoded, meta.version))
            {
                Ok(_) => return Ok(()),
                Err(CoordError::BadVersion(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(FarmError::Conflicted(node_path.to_string()))
    }

    /// Compute farm health from the `size` property, the member count,
    /// and an optional `running_filter` stored on the farm node.
    /// Thresholds are absolute counts or percentages of `size`.
    pub fn check(
        &self,
        farm_path: &str,
        max_failed: &str,
        warn_failed: Option<&str>,
    ) -> Result<(CheckStatus, String), FarmError> {
        let props = self.get(farm_path)?;
        let Some(size) = get_path(&props, "size").and_then(Value::as_int) else {
            return Ok((
                CheckStatus::Unknown,
                format!("no `size' property found for `{farm_path}' farm"),
            ));
        };

        let Some(max) = threshold(max_failed, size) else {
            return Ok((
                CheckStatus::Unknown,
                format!("invalid `max_failed_node' argument format: {max_failed}"),
            ));
        };
        let warn = match warn_failed {
            Some(spec) => match threshold(spec, size) {
                Some(warn) => Some(warn),
                None => {
                    return Ok((
                        CheckStatus::Unknown,
                        format!("invalid `warn_failed_node' argument format: {spec}"),
                    ))
                }
            },
            None => None,
        };

        let members = self.list(farm_path)?;
        let running = match get_path(&props, "running_filter").and_then(Value::as_str) {
            Some(expr) => {
                let filter = Filter::parse(expr)?;
                let farm = farm_path.trim_end_matches('/');
                let mut running = 0;
                for name in &members {
                    if filter.matches(&self.get(&format!("{farm}/{name}"))?) {
                        running += 1;
                    }
                }
                running
            }
            None => members.len() as i64,
        };

        let failed = size - running;
        let status = if failed as f64 >= max {
            CheckStatus::Critical
        } else if warn.is_some_and(|warn| failed as f64 >= warn) {
            CheckStatus::Warning
        } else {
            CheckStatus::Ok
        };
        Ok((
            status,
            format!("{running}/{size} nodes running, {failed} nodes failing, max allowed {max_failed}"),
        ))
    }

    /// Bump the farm's recorded high-water member count if joining
    /// grows it.
    fn record_farm_size(&self, farm_path: &str) -> Result<(), FarmError> {
        let joined_size = self.list(farm_path)?.len() as i64 + 1;
        let recorded = get_path(&self.get(farm_path)?, "size")
            .and_then(Value::as_int)
            .unwrap_or(0);
        if joined_size > recorded {
            self.set(farm_path, "size", Value::Int(joined_size))?;
        }
        Ok(())
    }
}

/// Parse a failure threshold: an absolute count, or a percentage of
/// the farm size.
fn threshold(spec: &str, size: i64) -> Option<f64> {
    if let Some(percent) = spec.strip_suffix('%') {
        let percent: f64 = percent.parse().ok()?;
        Some(size as f64 * percent / 100.0)
    } else {
        spec.parse::<i64>().ok().map(|n| n as f64)
    }
}

#[cfg(test)]
#[path = "farmer_tests.rs"]
mod tests;

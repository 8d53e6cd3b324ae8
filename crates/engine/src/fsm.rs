// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic FSM runtime
//!
//! Agents declare their legal transitions as data and implement one
//! `handle` entry point; the runtime owns dispatch, unknown-transition
//! policy, and rescheduling of events whose handlers hit transient
//! coordination errors.

use crate::bus::EventBus;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use zkfarm_adapters::{CoordError, ObserverError};
use zkfarm_conf::ConfError;

/// Default blocking time per queue pop
pub const DEFAULT_POP_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_CONSECUTIVE_ERRORS: u32 = 10;
const CLAMPED_ERRORS: u32 = 7;
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// States an agent can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Initial,
    ObserverReady,
    Idle,
    Lost,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentState::Initial => "initial",
            AgentState::ObserverReady => "observer ready",
            AgentState::Idle => "idle",
            AgentState::Lost => "lost",
        })
    }
}

/// Discriminant of a [`FarmEvent`], used as the transition-table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InitialSetup,
    InitialZnodeSetup,
    ChildrenModified,
    NodeModified,
    ZnodeModified,
    LocalModified,
    ConnectionLost,
    ConnectionRecovered,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::InitialSetup => "initial setup",
            EventKind::InitialZnodeSetup => "initial znode setup",
            EventKind::ChildrenModified => "children modified",
            EventKind::NodeModified => "node modified",
            EventKind::ZnodeModified => "znode modified",
            EventKind::LocalModified => "local modified",
            EventKind::ConnectionLost => "connection lost",
            EventKind::ConnectionRecovered => "connection recovered",
        })
    }
}

/// An event posted to an agent's queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FarmEvent {
    InitialSetup,
    InitialZnodeSetup,
    ChildrenModified,
    NodeModified { path: String },
    ZnodeModified,
    LocalModified,
    ConnectionLost,
    ConnectionRecovered,
}

impl FarmEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            FarmEvent::InitialSetup => EventKind::InitialSetup,
            FarmEvent::InitialZnodeSetup => EventKind::InitialZnodeSetup,
            FarmEvent::ChildrenModified => EventKind::ChildrenModified,
            FarmEvent::NodeModified { .. } => EventKind::NodeModified,
            FarmEvent::ZnodeModified => EventKind::ZnodeModified,
            FarmEvent::LocalModified => EventKind::LocalModified,
            FarmEvent::ConnectionLost => EventKind::ConnectionLost,
            FarmEvent::ConnectionRecovered => EventKind::ConnectionRecovered,
        }
    }
}

/// Legal `(from, to)` state pairs per event, declared as data
pub struct TransitionTable {
    entries: &'static [(EventKind, &'static [(AgentState, AgentState)])],
}

impl TransitionTable {
    pub const fn new(
        entries: &'static [(EventKind, &'static [(AgentState, AgentState)])],
    ) -> Self {
        Self { entries }
    }

    /// Target state for `kind` from `from`, if the transition is legal.
    pub fn target(&self, kind: EventKind, from: AgentState) -> Option<AgentState> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, transitions)| transitions.iter().find(|(src, _)| *src == from))
            .map(|(_, dst)| *dst)
    }
}

/// Handler outcome: apply the table's target state, or stay put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Transition,
    Stay,
}

/// Errors a handler can surface
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Coordination(#[from] CoordError),
    #[error(transparent)]
    Conf(#[from] ConfError),
    #[error(transparent)]
    Observer(#[from] ObserverError),
}

/// An agent driven by the FSM runtime
pub trait Agent {
    fn table(&self) -> &'static TransitionTable;
    fn handle(&mut self, event: &FarmEvent, from: AgentState) -> Result<Flow, AgentError>;
}

/// Errors that abort the run loop
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("unknown transition for event `{event}` in state `{state}`")]
    UnknownTransition { event: EventKind, state: AgentState },
    #[error("coordination session closed: {0}")]
    Closed(#[source] CoordError),
    #[error("cannot update local artifact: {0}")]
    Sink(#[source] ConfError),
    #[error("cannot observe local artifact: {0}")]
    Observer(#[source] ObserverError),
}

/// The runtime driving one agent
pub struct Fsm<A: Agent> {
    bus: Arc<EventBus>,
    agent: A,
    state: AgentState,
    strict: bool,
    errors: u32,
}

impl<A: Agent> Fsm<A> {
    pub fn new(bus: Arc<EventBus>, agent: A) -> Self {
        Self {
            bus,
            agent,
            state: AgentState::Initial,
            strict: false,
            errors: 0,
        }
    }

    /// Raise on unknown transitions instead of skipping them. Lenient
    /// dispatch is the production default; strict mode is a test hook.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Process events forever.
    pub fn run(&mut self) -> Result<(), FsmError> {
        self.step(None, DEFAULT_POP_TIMEOUT)
    }

    /// Process up to `count` events (forever when `None`), blocking up
    /// to `timeout` per pop. An empty pop consumes one count; tests use
    /// this to advance the machine a known number of turns.
    pub fn step(&mut self, count: Option<usize>, timeout: Duration) -> Result<(), FsmError> {
        let mut remaining = count;
        loop {
            if let Some(n) = remaining {
                if n == 0 {
                    return Ok(());
                }
                remaining = Some(n - 1);
            }

            let Some((priority, event)) = self.bus.pop(timeout) else {
                continue;
            };
            let kind = event.kind();

            let Some(to) = self.agent.table().target(kind, self.state) else {
                tracing::warn!(event = %kind, state = %self.state, "unknown transition");
                if self.strict {
                    return Err(FsmError::UnknownTransition {
                        event: kind,
                        state: self.state,
                    });
                }
                continue;
            };
            tracing::debug!(from = %self.state, to = %to, event = %kind, "transition");

            match self.agent.handle(&event, self.state) {
                Ok(Flow::Transition) => {
                    self.errors = 0;
                    self.state = to;
                }
                Ok(Flow::Stay) => {
                    self.errors = 0;
                }
                Err(AgentError::Coordination(e)) if e.is_terminal() => {
                    return Err(FsmError::Closed(e));
                }
                Err(AgentError::Coordination(e)) => {
                    tracing::warn!(error = %e, event = %kind, "coordination error, rescheduling event");
                    self.bus.post_with_priority(priority, event);
                    self.errors += 1;
                    if self.errors > MAX_CONSECUTIVE_ERRORS {
                        tracing::warn!("too many consecutive errors, backing off");
                        std::thread::sleep(ERROR_BACKOFF);
                        self.errors = CLAMPED_ERRORS;
                    }
                }
                Err(AgentError::Conf(e)) => return Err(FsmError::Sink(e)),
                Err(AgentError::Observer(e)) => return Err(FsmError::Observer(e)),
            }
        }
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;

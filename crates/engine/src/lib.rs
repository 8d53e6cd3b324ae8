// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zkfarm-engine: the farm reconciliation engine
//!
//! Each agent is a single-threaded finite-state machine fed by a
//! priority event queue. Watch callbacks, the filesystem observer, and
//! the session listener enqueue events from their own threads; all
//! coordination and artifact I/O happens on the FSM thread.

pub mod bus;
pub mod exporter;
pub mod farmer;
pub mod fsm;
pub mod joiner;
pub mod listener;

pub use bus::EventBus;
pub use exporter::{Exporter, UpdatedHandler};
pub use farmer::{CheckStatus, FarmError, Farmer};
pub use fsm::{Agent, AgentError, AgentState, EventKind, FarmEvent, Flow, Fsm, FsmError, TransitionTable};
pub use joiner::{Joiner, Membership};
pub use listener::bridge_session;

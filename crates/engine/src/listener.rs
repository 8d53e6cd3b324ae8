// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-state bridge
//!
//! Translates the coordination client's session callbacks into urgent
//! FSM events. A suspension drops watches just like a loss, so both
//! surface as `connection lost`.

use crate::bus::EventBus;
use crate::fsm::FarmEvent;
use std::sync::Arc;
use zkfarm_adapters::{Coordinator, SessionState};

/// Register a listener on the coordination client that feeds the
/// agent's queue.
pub fn bridge_session<C: Coordinator>(coordinator: &C, bus: &Arc<EventBus>) {
    let bus = Arc::clone(bus);
    coordinator.add_listener(Box::new(move |state| match state {
        SessionState::Connected => {
            tracing::info!("connected to coordination service");
            bus.post_urgent(FarmEvent::ConnectionRecovered);
        }
        SessionState::Lost => {
            tracing::warn!("connection to coordination service lost");
            bus.post_urgent(FarmEvent::ConnectionLost);
        }
        SessionState::Suspended => {
            tracing::warn!("connection suspended, watches are considered lost");
            bus.post_urgent(FarmEvent::ConnectionLost);
        }
    }));
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;

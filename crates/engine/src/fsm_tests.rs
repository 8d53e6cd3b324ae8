// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::VecDeque;
use std::time::Duration;

const SHORT: Duration = Duration::from_millis(10);

const TOY_EVENTS: TransitionTable = TransitionTable::new(&[
    (
        EventKind::InitialSetup,
        &[(AgentState::Initial, AgentState::Idle)],
    ),
    (
        EventKind::LocalModified,
        &[(AgentState::Idle, AgentState::Idle)],
    ),
    (
        EventKind::ConnectionLost,
        &[
            (AgentState::Idle, AgentState::Lost),
            (AgentState::Lost, AgentState::Lost),
        ],
    ),
    (
        EventKind::ConnectionRecovered,
        &[(AgentState::Lost, AgentState::Idle)],
    ),
]);

#[derive(Default)]
struct ToyAgent {
    handled: Vec<EventKind>,
    /// One-shot failures, consumed the first time the kind is handled
    failures: VecDeque<(EventKind, CoordError)>,
    stay_on: Option<EventKind>,
}

impl Agent for ToyAgent {
    fn table(&self) -> &'static TransitionTable {
        &TOY_EVENTS
    }

    fn handle(&mut self, event: &FarmEvent, _from: AgentState) -> Result<Flow, AgentError> {
        self.handled.push(event.kind());
        if let Some(at) = self.failures.iter().position(|(kind, _)| *kind == event.kind()) {
            if let Some((_, failure)) = self.failures.remove(at) {
                return Err(failure.into());
            }
        }
        if self.stay_on == Some(event.kind()) {
            return Ok(Flow::Stay);
        }
        Ok(Flow::Transition)
    }
}

fn harness(agent: ToyAgent) -> (Arc<EventBus>, Fsm<ToyAgent>) {
    let bus = Arc::new(EventBus::new());
    let fsm = Fsm::new(Arc::clone(&bus), agent);
    (bus, fsm)
}

#[test]
fn transitions_follow_the_table() {
    let (bus, mut fsm) = harness(ToyAgent::default());
    bus.post(FarmEvent::InitialSetup);
    fsm.step(Some(1), SHORT).unwrap();
    assert_eq!(fsm.state(), AgentState::Idle);
    assert_eq!(fsm.agent().handled, vec![EventKind::InitialSetup]);
}

#[test]
fn unknown_transition_is_skipped_in_lenient_mode() {
    let (bus, mut fsm) = harness(ToyAgent::default());
    bus.post(FarmEvent::LocalModified);
    fsm.step(Some(1), SHORT).unwrap();
    assert_eq!(fsm.state(), AgentState::Initial);
    assert!(fsm.agent().handled.is_empty());
}

#[test]
fn unknown_transition_errors_in_strict_mode() {
    let bus = Arc::new(EventBus::new());
    let mut fsm = Fsm::new(Arc::clone(&bus), ToyAgent::default()).strict();
    bus.post(FarmEvent::LocalModified);
    let result = fsm.step(Some(1), SHORT);
    assert!(matches!(
        result,
        Err(FsmError::UnknownTransition {
            event: EventKind::LocalModified,
            state: AgentState::Initial,
        })
    ));
}

#[test]
fn stay_suppresses_the_transition() {
    let (bus, mut fsm) = harness(ToyAgent {
        stay_on: Some(EventKind::ConnectionLost),
        ..Default::default()
    });
    bus.post(FarmEvent::InitialSetup);
    bus.post(FarmEvent::ConnectionLost);
    fsm.step(Some(2), SHORT).unwrap();
    // The handler asked not to transition, so the state stays idle
    assert_eq!(fsm.state(), AgentState::Idle);
}

#[test]
fn coordination_error_reenqueues_the_event() {
    let (bus, mut fsm) = harness(ToyAgent {
        failures: VecDeque::from([(EventKind::InitialSetup, CoordError::ConnectionLoss)]),
        ..Default::default()
    });
    bus.post(FarmEvent::InitialSetup);
    fsm.step(Some(1), SHORT).unwrap();
    assert_eq!(fsm.state(), AgentState::Initial);
    fsm.step(Some(1), SHORT).unwrap();
    assert_eq!(fsm.state(), AgentState::Idle);
    assert_eq!(
        fsm.agent().handled,
        vec![EventKind::InitialSetup, EventKind::InitialSetup]
    );
}

#[test]
fn reenqueued_urgent_event_stays_ahead_of_normal_events() {
    let (bus, mut fsm) = harness(ToyAgent {
        failures: VecDeque::from([(EventKind::ConnectionLost, CoordError::OperationTimeout)]),
        ..Default::default()
    });
    bus.post(FarmEvent::InitialSetup);
    fsm.step(Some(1), SHORT).unwrap();
    bus.post(FarmEvent::LocalModified);
    bus.post_urgent(FarmEvent::ConnectionLost);
    fsm.step(Some(3), SHORT).unwrap();
    assert_eq!(
        fsm.agent().handled,
        vec![
            EventKind::InitialSetup,
            EventKind::ConnectionLost,
            EventKind::ConnectionLost,
            EventKind::LocalModified,
        ]
    );
}

#[test]
fn terminal_error_aborts_the_loop() {
    let (bus, mut fsm) = harness(ToyAgent {
        failures: VecDeque::from([(EventKind::InitialSetup, CoordError::Closed)]),
        ..Default::default()
    });
    bus.post(FarmEvent::InitialSetup);
    let result = fsm.step(Some(1), SHORT);
    assert!(matches!(result, Err(FsmError::Closed(_))));
}

#[test]
fn bounded_step_returns_after_empty_pops() {
    let (_bus, mut fsm) = harness(ToyAgent::default());
    fsm.step(Some(2), SHORT).unwrap();
    assert_eq!(fsm.state(), AgentState::Initial);
}

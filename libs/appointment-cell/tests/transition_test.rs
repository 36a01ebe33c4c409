use assert_matches::assert_matches;

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use appointment_cell::services::transition::StatusTransitionEngine;

use AppointmentStatus::*;

#[test]
fn pending_can_be_approved_rejected_or_cancelled() {
    assert!(StatusTransitionEngine::validate_transition(Pending, Approved).is_ok());
    assert!(StatusTransitionEngine::validate_transition(Pending, Rejected).is_ok());
    assert!(StatusTransitionEngine::validate_transition(Pending, Cancelled).is_ok());
}

#[test]
fn pending_cannot_jump_to_completed() {
    assert_matches!(
        StatusTransitionEngine::validate_transition(Pending, Completed),
        Err(AppointmentError::InvalidTransition { from: Pending, to: Completed })
    );
}

#[test]
fn approved_moves_toward_scheduled() {
    assert!(StatusTransitionEngine::validate_transition(Approved, Scheduled).is_ok());
    assert!(StatusTransitionEngine::validate_transition(Approved, NoShow).is_ok());
    assert!(StatusTransitionEngine::validate_transition(Approved, Cancelled).is_ok());
    // An approved appointment is not yet at a slot it can be moved from
    assert_matches!(
        StatusTransitionEngine::validate_transition(Approved, Rescheduled),
        Err(AppointmentError::InvalidTransition { .. })
    );
}

#[test]
fn scheduled_supports_the_full_outcome_set() {
    for target in [Completed, Cancelled, NoShow, Rescheduled] {
        assert!(StatusTransitionEngine::validate_transition(Scheduled, target).is_ok());
    }
}

#[test]
fn rescheduled_is_reentrant() {
    assert!(StatusTransitionEngine::validate_transition(Rescheduled, Scheduled).is_ok());
    assert!(StatusTransitionEngine::validate_transition(Rescheduled, Cancelled).is_ok());
    assert_matches!(
        StatusTransitionEngine::validate_transition(Rescheduled, Completed),
        Err(AppointmentError::InvalidTransition { .. })
    );
}

#[test]
fn terminal_states_admit_no_transitions() {
    for terminal in [Completed, Cancelled, NoShow, Rejected] {
        assert!(terminal.is_terminal());
        for target in AppointmentStatus::all() {
            assert_matches!(
                StatusTransitionEngine::validate_transition(terminal, target),
                Err(AppointmentError::InvalidTransition { .. })
            );
        }
    }
}

#[test]
fn live_statuses_occupy_slots() {
    for status in AppointmentStatus::live_statuses() {
        assert!(status.is_live());
        assert!(!status.is_terminal());
    }
    assert!(!Rescheduled.is_live());
    assert!(!Completed.is_live());
}

#[test]
fn status_serializes_as_snake_case() {
    assert_eq!(serde_json::to_value(NoShow).unwrap(), "no_show");
    assert_eq!(serde_json::to_value(Pending).unwrap(), "pending");
    assert_eq!(
        serde_json::from_value::<AppointmentStatus>(serde_json::json!("rescheduled")).unwrap(),
        Rescheduled
    );
    // Unrecognized status strings are rejected at the serde boundary
    assert!(serde_json::from_value::<AppointmentStatus>(serde_json::json!("archived")).is_err());
}

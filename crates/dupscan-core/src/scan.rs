//! # Scan State Machine
//!
//! The lifecycle of one detection, from the moment the gate closes until it
//! reopens. Pure: every transition returns the next state plus the single
//! side effect the driver (the scan session) must perform.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  From       Event                    To         Effect                  │
//! │  ─────────  ───────────────────────  ─────────  ──────────────────────  │
//! │  Idle       Committed(v)             Success    StartDisplayTimer       │
//! │  Idle       DuplicateFound(v)        Duplicate  None                    │
//! │  Idle       Failed(f)                Error      None                    │
//! │  Success    DisplayTimeoutElapsed    Idle       ReopenGate              │
//! │  Duplicate  Dismiss                  Idle       ReopenGate              │
//! │  Duplicate  ForceAdd                 Duplicate  ForceInsert(v)          │
//! │  Duplicate  ForceAddCommitted        Idle       ReopenGate              │
//! │  Duplicate  Failed(f)                Error      None                    │
//! │  Error      Dismiss                  Idle       ReopenGate              │
//! │                                                                         │
//! │  Anything else → CoreError::InvalidTransition, state unchanged          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every edge into `Idle` carries `ReopenGate` and no other edge does, so a
//! completed cycle reopens the gate exactly once.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Failure Taxonomy
// =============================================================================

/// Why a scan cycle ended in the `Error` state.
///
/// "No detection" and "duplicate found" are deliberately absent: the first
/// is silently ignored at the decoder, the second has its own state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ScanFailure {
    /// A store operation failed.
    #[error("Could not save barcode: {message}")]
    PersistenceFailure { message: String },

    /// A commit was attempted with no target list.
    #[error("No list selected for scanning")]
    MissingListContext,
}

impl ScanFailure {
    /// Builds a persistence failure from any displayable store error.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        ScanFailure::PersistenceFailure {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Scan State
// =============================================================================

/// State of the scan screen, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
#[ts(export)]
pub enum ScanState {
    /// Waiting for a detection; the gate is open.
    #[default]
    Idle,
    /// The value was stored; shown until the display timeout elapses.
    Success(String),
    /// The list already holds the value; waiting for the user.
    Duplicate(String),
    /// The cycle failed; waiting for the user to dismiss.
    Error(ScanFailure),
}

impl ScanState {
    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Success(_) => "success",
            ScanState::Duplicate(_) => "duplicate",
            ScanState::Error(_) => "error",
        }
    }

    /// Returns true when a new detection may be accepted.
    pub fn is_idle(&self) -> bool {
        matches!(self, ScanState::Idle)
    }

    /// Returns true when the state is waiting on `dismiss()` / `forceAdd()`.
    pub fn awaits_user(&self) -> bool {
        matches!(self, ScanState::Duplicate(_) | ScanState::Error(_))
    }

    /// Computes the transition for `event`.
    ///
    /// ## Returns
    /// * `Ok(Transition)` - next state and the side effect to run
    /// * `Err(CoreError::InvalidTransition)` - event not valid here; the
    ///   caller keeps the current state
    pub fn apply(&self, event: ScanEvent) -> CoreResult<Transition> {
        use ScanEvent as E;
        use ScanState as S;

        let transition = match (self, event) {
            (S::Idle, E::Committed(value)) => {
                Transition::new(S::Success(value), Effect::StartDisplayTimer)
            }
            (S::Idle, E::DuplicateFound(value)) => {
                Transition::new(S::Duplicate(value), Effect::None)
            }
            (S::Idle, E::Failed(failure)) => Transition::new(S::Error(failure), Effect::None),

            (S::Success(_), E::DisplayTimeoutElapsed) => {
                Transition::new(S::Idle, Effect::ReopenGate)
            }

            (S::Duplicate(_), E::Dismiss) => Transition::new(S::Idle, Effect::ReopenGate),
            (S::Duplicate(value), E::ForceAdd) => Transition::new(
                S::Duplicate(value.clone()),
                Effect::ForceInsert(value.clone()),
            ),
            (S::Duplicate(_), E::ForceAddCommitted) => {
                Transition::new(S::Idle, Effect::ReopenGate)
            }
            (S::Duplicate(_), E::Failed(failure)) => {
                Transition::new(S::Error(failure), Effect::None)
            }

            (S::Error(_), E::Dismiss) => Transition::new(S::Idle, Effect::ReopenGate),

            (state, event) => {
                return Err(CoreError::InvalidTransition {
                    state: state.name().to_string(),
                    event: event.name().to_string(),
                })
            }
        };

        Ok(transition)
    }
}

// =============================================================================
// Events
// =============================================================================

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Resolver found no duplicate and the commit wrote a row.
    Committed(String),
    /// Resolver found the value already in the list.
    DuplicateFound(String),
    /// A store operation failed, or no list was bound.
    Failed(ScanFailure),
    /// The success banner has been shown long enough.
    DisplayTimeoutElapsed,
    /// User dismissed a duplicate or error.
    Dismiss,
    /// User chose to add a duplicate anyway.
    ForceAdd,
    /// The forced insert requested by [`Effect::ForceInsert`] succeeded.
    ForceAddCommitted,
}

impl ScanEvent {
    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::Committed(_) => "committed",
            ScanEvent::DuplicateFound(_) => "duplicate_found",
            ScanEvent::Failed(_) => "failed",
            ScanEvent::DisplayTimeoutElapsed => "display_timeout",
            ScanEvent::Dismiss => "dismiss",
            ScanEvent::ForceAdd => "force_add",
            ScanEvent::ForceAddCommitted => "force_add_committed",
        }
    }
}

// =============================================================================
// Effects
// =============================================================================

/// The side effect the driver must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to do.
    None,
    /// Arm the success display timer.
    StartDisplayTimer,
    /// Insert the value bypassing the duplicate check, then report
    /// `ForceAddCommitted` or `Failed`.
    ForceInsert(String),
    /// Reopen the scan gate.
    ReopenGate,
}

/// Result of [`ScanState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ScanState,
    pub effect: Effect,
}

impl Transition {
    fn new(state: ScanState, effect: Effect) -> Self {
        Transition { state, effect }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> ScanFailure {
        ScanFailure::persistence("disk I/O error")
    }

    fn all_states() -> Vec<ScanState> {
        vec![
            ScanState::Idle,
            ScanState::Success("123".into()),
            ScanState::Duplicate("123".into()),
            ScanState::Error(failure()),
        ]
    }

    fn all_events() -> Vec<ScanEvent> {
        vec![
            ScanEvent::Committed("123".into()),
            ScanEvent::DuplicateFound("123".into()),
            ScanEvent::Failed(failure()),
            ScanEvent::DisplayTimeoutElapsed,
            ScanEvent::Dismiss,
            ScanEvent::ForceAdd,
            ScanEvent::ForceAddCommitted,
        ]
    }

    #[test]
    fn test_success_cycle() {
        let t = ScanState::Idle
            .apply(ScanEvent::Committed("123".into()))
            .unwrap();
        assert_eq!(t.state, ScanState::Success("123".into()));
        assert_eq!(t.effect, Effect::StartDisplayTimer);

        let t = t.state.apply(ScanEvent::DisplayTimeoutElapsed).unwrap();
        assert_eq!(t.state, ScanState::Idle);
        assert_eq!(t.effect, Effect::ReopenGate);
    }

    #[test]
    fn test_duplicate_dismiss() {
        let t = ScanState::Idle
            .apply(ScanEvent::DuplicateFound("123".into()))
            .unwrap();
        assert_eq!(t.state, ScanState::Duplicate("123".into()));
        assert_eq!(t.effect, Effect::None);

        let t = t.state.apply(ScanEvent::Dismiss).unwrap();
        assert_eq!(t.state, ScanState::Idle);
        assert_eq!(t.effect, Effect::ReopenGate);
    }

    #[test]
    fn test_duplicate_force_add() {
        let dup = ScanState::Duplicate("123".into());

        let t = dup.apply(ScanEvent::ForceAdd).unwrap();
        assert_eq!(t.state, dup);
        assert_eq!(t.effect, Effect::ForceInsert("123".into()));

        let t = t.state.apply(ScanEvent::ForceAddCommitted).unwrap();
        assert_eq!(t.state, ScanState::Idle);
        assert_eq!(t.effect, Effect::ReopenGate);
    }

    #[test]
    fn test_failed_force_add_goes_to_error() {
        let t = ScanState::Duplicate("123".into())
            .apply(ScanEvent::Failed(failure()))
            .unwrap();
        assert_eq!(t.state, ScanState::Error(failure()));
        assert_eq!(t.effect, Effect::None);
    }

    #[test]
    fn test_error_dismiss() {
        let t = ScanState::Idle
            .apply(ScanEvent::Failed(ScanFailure::MissingListContext))
            .unwrap();
        assert_eq!(t.state, ScanState::Error(ScanFailure::MissingListContext));

        let t = t.state.apply(ScanEvent::Dismiss).unwrap();
        assert_eq!(t.state, ScanState::Idle);
        assert_eq!(t.effect, Effect::ReopenGate);
    }

    #[test]
    fn test_success_ignores_user_input() {
        let success = ScanState::Success("123".into());
        assert!(success.apply(ScanEvent::Dismiss).is_err());
        assert!(success.apply(ScanEvent::ForceAdd).is_err());
    }

    #[test]
    fn test_idle_rejects_user_input() {
        let err = ScanState::Idle.apply(ScanEvent::Dismiss).unwrap_err();
        assert_eq!(err.to_string(), "No transition from idle on dismiss");
        assert!(ScanState::Idle.apply(ScanEvent::ForceAdd).is_err());
    }

    #[test]
    fn test_only_edges_into_idle_reopen_gate() {
        for state in all_states() {
            for event in all_events() {
                if let Ok(t) = state.apply(event) {
                    assert_eq!(
                        t.state == ScanState::Idle,
                        t.effect == Effect::ReopenGate,
                        "{} edge from {}",
                        t.state.name(),
                        state.name()
                    );
                }
            }
        }
    }

    #[test]
    fn test_detections_only_accepted_when_idle() {
        for state in all_states().into_iter().filter(|s| !s.is_idle()) {
            assert!(state.apply(ScanEvent::Committed("x".into())).is_err());
            assert!(state.apply(ScanEvent::DuplicateFound("x".into())).is_err());
        }
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(ScanState::Duplicate("123".into())).unwrap();
        assert_eq!(json["status"], "duplicate");
        assert_eq!(json["detail"], "123");

        let json = serde_json::to_value(ScanState::Error(ScanFailure::MissingListContext)).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["detail"]["kind"], "missing_list_context");
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            failure().to_string(),
            "Could not save barcode: disk I/O error"
        );
        assert_eq!(
            ScanFailure::MissingListContext.to_string(),
            "No list selected for scanning"
        );
    }
}

//! State machine for fight challenges
//!
//! A challenge starts in `WaitingAccept`, is accepted by the opponent, started
//! once both sides are ready, and ends either `Completed` (with a winner or as
//! a draw) or `Canceled`. The transition function here is pure; winner and
//! draw bookkeeping is applied by the entity on top of it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use taskogotchi_common::StateError;

// ============================================================================
// Fight Challenge State Machine
// ============================================================================

/// Fight challenge states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FightState {
    WaitingAccept,
    Accepted,
    Pending,
    Completed,
    Canceled,
}

impl FightState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [FightState] {
        match self {
            Self::WaitingAccept => &[Self::Accepted, Self::Canceled],
            Self::Accepted => &[Self::Pending, Self::Canceled],
            Self::Pending => &[Self::Completed, Self::Canceled],
            Self::Completed => &[],
            Self::Canceled => &[],
        }
    }
}

impl std::fmt::Display for FightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingAccept => write!(f, "waiting_accept"),
            Self::Accepted => write!(f, "accepted"),
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Actions a combatant can request on a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FightAction {
    /// Opponent agrees to fight
    Accept,
    /// Both sides are ready, the fight begins
    Start,
    /// The fight is over, with a winner or as a draw
    Complete,
    /// Either side walks away (also accepted as "decline")
    #[serde(alias = "decline")]
    Cancel,
}

impl std::fmt::Display for FightAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Start => write!(f, "start"),
            Self::Complete => write!(f, "complete"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

impl FromStr for FightAction {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "start" => Ok(Self::Start),
            "complete" => Ok(Self::Complete),
            "cancel" | "decline" => Ok(Self::Cancel),
            _ => Err(StateError::UnsupportedAction(s.to_string())),
        }
    }
}

/// Fight challenge state machine
pub struct FightStateMachine;

impl FightStateMachine {
    /// Attempt a state transition
    ///
    /// Returns the new state if the transition is valid, or an error otherwise.
    pub fn transition(current: FightState, action: FightAction) -> Result<FightState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (current, action) {
            // From WaitingAccept
            (FightState::WaitingAccept, FightAction::Accept) => FightState::Accepted,
            (FightState::WaitingAccept, FightAction::Cancel) => FightState::Canceled,

            // From Accepted
            (FightState::Accepted, FightAction::Start) => FightState::Pending,
            (FightState::Accepted, FightAction::Cancel) => FightState::Canceled,

            // From Pending
            (FightState::Pending, FightAction::Complete) => FightState::Completed,
            (FightState::Pending, FightAction::Cancel) => FightState::Canceled,

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: action.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: FightState, action: FightAction) -> bool {
        Self::transition(current, action).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

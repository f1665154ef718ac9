//! Controller state machine.
//!
//! # States
//!
//! - `Idle`: waiting for a card or a long SELECT
//! - `AccessGranted` / `AccessDenied`: result screens, expire to `Idle`
//! - `Menu`: operator menu
//! - `Registering`, `Deleting`: waiting for the card to enroll or remove
//! - `ListingCards`: browsing stored identities
//! - `CloningSource`, `CloningTarget`: two-card clone flow
//!
//! # Valid Transitions
//!
//! - Idle → AccessGranted | AccessDenied | Menu
//! - AccessGranted | AccessDenied → Idle
//! - Menu → Registering | Deleting | ListingCards | CloningSource | Idle
//! - Registering | Deleting | ListingCards | CloningTarget → Idle
//! - CloningSource → CloningTarget | Idle
//!
//! # Examples
//!
//! ```
//! use std::time::Instant;
//! use cardgate_controller::{StateMachine, SystemState};
//!
//! let t0 = Instant::now();
//! let mut machine = StateMachine::new(t0);
//!
//! machine.transition_to(SystemState::Menu, t0).unwrap();
//! assert_eq!(machine.current_state(), SystemState::Menu);
//! assert!(machine.transition_to(SystemState::AccessGranted, t0).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use cardgate_core::{Error, Result};

/// Transitions kept for diagnostics. One menu round trip is five or six
/// transitions, so this covers the last few operator sessions.
const MAX_HISTORY_SIZE: usize = 100;

/// Top-level controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Idle,
    AccessGranted,
    AccessDenied,
    Menu,
    Registering,
    Deleting,
    ListingCards,
    CloningSource,
    CloningTarget,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemState::Idle => "Idle",
            SystemState::AccessGranted => "AccessGranted",
            SystemState::AccessDenied => "AccessDenied",
            SystemState::Menu => "Menu",
            SystemState::Registering => "Registering",
            SystemState::Deleting => "Deleting",
            SystemState::ListingCards => "ListingCards",
            SystemState::CloningSource => "CloningSource",
            SystemState::CloningTarget => "CloningTarget",
        };
        f.pad(name)
    }
}

impl SystemState {
    /// Returns `true` if moving to `target` is allowed.
    ///
    /// ```
    /// use cardgate_controller::SystemState;
    ///
    /// assert!(SystemState::Idle.can_transition_to(&SystemState::Menu));
    /// assert!(!SystemState::Idle.can_transition_to(&SystemState::Deleting));
    /// ```
    pub fn can_transition_to(&self, target: &SystemState) -> bool {
        use SystemState::*;
        matches!(
            (self, target),
            (Idle, AccessGranted | AccessDenied | Menu)
                | (AccessGranted | AccessDenied, Idle)
                | (Menu, Registering | Deleting | ListingCards | CloningSource | Idle)
                | (Registering | Deleting | ListingCards | CloningTarget, Idle)
                | (CloningSource, CloningTarget | Idle)
        )
    }

    /// States reached from the operator menu, the menu included. These share
    /// the inactivity timeout and BACK handling.
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            SystemState::Menu
                | SystemState::Registering
                | SystemState::Deleting
                | SystemState::ListingCards
                | SystemState::CloningSource
                | SystemState::CloningTarget
        )
    }

    /// Access result screens that expire after the message display time.
    pub fn is_access_result(&self) -> bool {
        matches!(self, SystemState::AccessGranted | SystemState::AccessDenied)
    }

    pub fn is_cloning(&self) -> bool {
        matches!(self, SystemState::CloningSource | SystemState::CloningTarget)
    }

    /// Whether a presented card is acted on in this state.
    pub fn accepts_card(&self) -> bool {
        matches!(
            self,
            SystemState::Idle
                | SystemState::Registering
                | SystemState::Deleting
                | SystemState::CloningSource
                | SystemState::CloningTarget
        )
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SystemState,
    pub to: SystemState,
    pub at: Instant,
}

/// Validated state holder with a bounded transition history.
///
/// Time is supplied by the caller so the machine can run on a simulated
/// clock.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current_state: SystemState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// New machine in `Idle`, entered at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            current_state: SystemState::Idle,
            state_entered_at: now,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> SystemState {
        self.current_state
    }

    pub fn state_entered_at(&self) -> Instant {
        self.state_entered_at
    }

    pub fn time_in_current_state(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state_entered_at)
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).copied().collect()
    }

    /// Move to `new_state` if the transition table allows it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] and leaves the machine
    /// unchanged when the transition is not allowed.
    pub fn transition_to(&mut self, new_state: SystemState, now: Instant) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition {
            from: self.current_state,
            to: new_state,
            at: now,
        };
        self.perform_state_change(transition);
        Ok(transition)
    }

    /// Force the machine back to `Idle` regardless of the current state.
    pub fn reset(&mut self, now: Instant) -> StateTransition {
        let transition = StateTransition {
            from: self.current_state,
            to: SystemState::Idle,
            at: now,
        };
        self.perform_state_change(transition);
        transition
    }

    fn perform_state_change(&mut self, transition: StateTransition) {
        self.current_state = transition.to;
        self.state_entered_at = transition.at;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

//! Access-control state machine for the cardgate door controller.
//!
//! [`AccessController`] owns the collaborators (radio, byte storage,
//! display, pins, clock) and runs the control cycle: card authorization
//! against the [`CardStore`](cardgate_storage::CardStore), the operator menu
//! for enrolling, deleting, listing and cloning cards, and the door relay.
//!
//! # Card flow
//!
//! ```text
//! Idle ──card──► AccessGranted / AccessDenied ──2 s──► Idle
//!  │
//!  └─long SELECT─► Menu ─SELECT─► Registering | Deleting | ListingCards | CloningSource
//!                                     │            │           │              │
//!                                   card         card      BACK/timeout     card
//!                                     ▼            ▼           ▼              ▼
//!                                   Idle         Idle        Idle       CloningTarget ─card─► Idle
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod menu;
pub mod screen;
pub mod state;

pub use config::{ControllerConfig, PinConfig};
pub use controller::AccessController;
pub use error::{ControllerError, Result};
pub use menu::MenuItem;
pub use screen::{DenyReason, Notice, Screen};
pub use state::{StateMachine, StateTransition, SystemState};

//! Door relay supervisor.
//!
//! Drives the lock relay on access grant and relocks it once the unlock
//! window has elapsed. Time is passed in by the caller so the supervisor runs
//! against either the system clock or a simulated one.

pub mod relay;

pub use relay::{DoorRelay, DoorState, RelayConfig};

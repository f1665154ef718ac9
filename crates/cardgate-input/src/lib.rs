//! Debounced operator input for the cardgate controller.
//!
//! [`Debouncer`] turns the raw level of one active-low button into stable
//! edges. [`ButtonPanel`] runs one debouncer per button and maps edges to
//! [`ButtonEvent`]s, including short/long discrimination for SELECT.

pub mod buttons;
pub mod debounce;

pub use buttons::{Button, ButtonEvent, ButtonPanel, ButtonPins, PressKind};
pub use debounce::{Debouncer, Edge};

//! Operator menu items.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Entries of the operator menu, in display order.
///
/// Navigation wraps in both directions.
///
/// ```
/// use cardgate_controller::MenuItem;
///
/// assert_eq!(MenuItem::Register.next(), MenuItem::Delete);
/// assert_eq!(MenuItem::Register.previous(), MenuItem::Exit);
/// assert_eq!(MenuItem::Exit.next(), MenuItem::Register);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItem {
    #[default]
    Register,
    Delete,
    List,
    Clone,
    Settings,
    ClearAll,
    Exit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 7] = [
        MenuItem::Register,
        MenuItem::Delete,
        MenuItem::List,
        MenuItem::Clone,
        MenuItem::Settings,
        MenuItem::ClearAll,
        MenuItem::Exit,
    ];

    /// Position in [`MenuItem::ALL`].
    pub fn position(self) -> usize {
        match self {
            MenuItem::Register => 0,
            MenuItem::Delete => 1,
            MenuItem::List => 2,
            MenuItem::Clone => 3,
            MenuItem::Settings => 4,
            MenuItem::ClearAll => 5,
            MenuItem::Exit => 6,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let len = Self::ALL.len();
        Self::ALL[(self.position() + len - 1) % len]
    }

    /// Text shown on the display.
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Register => "Register Card",
            MenuItem::Delete => "Delete Card",
            MenuItem::List => "List Cards",
            MenuItem::Clone => "Clone Card",
            MenuItem::Settings => "Settings",
            MenuItem::ClearAll => "Clear All",
            MenuItem::Exit => "Exit Menu",
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

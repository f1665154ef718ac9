//! Scripted input for the simulator.
//!
//! ```json
//! {
//!   "enrolled": ["04516A227C5D80"],
//!   "steps": [
//!     { "action": "present", "uid": "04123456" },
//!     { "action": "wait", "ms": 500 },
//!     { "action": "remove" },
//!     { "action": "hold", "button": "select", "ms": 1200 },
//!     { "action": "press", "button": "down" },
//!     { "action": "release", "button": "down" }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use anyhow::Context;
use cardgate_core::CardIdentity;
use cardgate_input::Button;
use serde::{Deserialize, Deserializer};

/// Milliseconds run after a step that does not say how long to wait, so the
/// controller sees the change before the screen is printed.
pub const SETTLE_MS: u64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Identities written to the store before the first step.
    #[serde(default, deserialize_with = "hex_identities")]
    pub enrolled: Vec<CardIdentity>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Put a card in the field. Unknown UIDs are factory-fresh cards.
    Present {
        #[serde(deserialize_with = "hex_identity")]
        uid: CardIdentity,
    },
    /// Take the card out of the field.
    Remove,
    Press { button: Button },
    Release { button: Button },
    /// Press, keep the button down for `ms`, release.
    Hold { button: Button, ms: u64 },
    Wait { ms: u64 },
}

impl Step {
    /// Simulated time the step runs for.
    pub fn duration_ms(&self) -> u64 {
        match self {
            Step::Hold { ms, .. } => ms + SETTLE_MS,
            Step::Wait { ms } => *ms,
            _ => SETTLE_MS,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Present { uid } => write!(f, "present {uid}"),
            Step::Remove => write!(f, "remove"),
            Step::Press { button } => write!(f, "press {button}"),
            Step::Release { button } => write!(f, "release {button}"),
            Step::Hold { button, ms } => write!(f, "hold {button} {ms}ms"),
            Step::Wait { ms } => write!(f, "wait {ms}ms"),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// Total simulated time of all steps.
    pub fn duration_ms(&self) -> u64 {
        self.steps.iter().map(Step::duration_ms).sum()
    }
}

fn hex_identity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CardIdentity, D::Error> {
    let text = String::deserialize(deserializer)?;
    CardIdentity::from_hex(&text).map_err(serde::de::Error::custom)
}

fn hex_identities<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<CardIdentity>, D::Error> {
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|text| CardIdentity::from_hex(text).map_err(serde::de::Error::custom))
        .collect()
}

//! Four-button operator panel.
//!
//! Buttons are wired active low with pull-ups: a pressed button reads
//! [`Level::Low`]. UP, DOWN and BACK report on the press edge. SELECT reports
//! on release, classified by how long it was held.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cardgate_core::constants::{
    BTN_BACK_PIN, BTN_DOWN_PIN, BTN_SELECT_PIN, BTN_UP_PIN, BUTTON_DEBOUNCE_TIME_MS,
    LONG_PRESS_TIME_MS,
};
use cardgate_hardware::traits::DigitalIo;
use cardgate_hardware::types::{Level, PinId};

use crate::debounce::{Debouncer, Edge};

/// Panel buttons in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Up,
    Down,
    Select,
    Back,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Up, Button::Down, Button::Select, Button::Back];

    fn index(self) -> usize {
        match self {
            Button::Up => 0,
            Button::Down => 1,
            Button::Select => 2,
            Button::Back => 3,
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Button::Up => "UP",
            Button::Down => "DOWN",
            Button::Select => "SELECT",
            Button::Back => "BACK",
        };
        f.write_str(name)
    }
}

/// How long SELECT was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressKind {
    Short,
    Long,
}

/// Debounced operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonEvent {
    Up,
    Down,
    Back,
    Select(PressKind),
}

/// Pin assignment for the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonPins {
    pub up: PinId,
    pub down: PinId,
    pub select: PinId,
    pub back: PinId,
}

impl ButtonPins {
    pub fn pin(&self, button: Button) -> PinId {
        match button {
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Select => self.select,
            Button::Back => self.back,
        }
    }
}

impl Default for ButtonPins {
    fn default() -> Self {
        Self {
            up: PinId(BTN_UP_PIN),
            down: PinId(BTN_DOWN_PIN),
            select: PinId(BTN_SELECT_PIN),
            back: PinId(BTN_BACK_PIN),
        }
    }
}

/// Debounced reader for the four panel buttons.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use cardgate_hardware::mock::MockPins;
/// use cardgate_input::{ButtonEvent, ButtonPanel, ButtonPins, PressKind};
///
/// let (mut pins, handle) = MockPins::new();
/// let layout = ButtonPins::default();
/// let mut panel = ButtonPanel::new(layout);
/// let t0 = Instant::now();
///
/// handle.press(layout.select);
/// assert!(panel.poll(&mut pins, t0).is_empty());
///
/// handle.release(layout.select);
/// let events = panel.poll(&mut pins, t0 + Duration::from_millis(1200));
/// assert_eq!(events, vec![ButtonEvent::Select(PressKind::Long)]);
/// ```
#[derive(Debug, Clone)]
pub struct ButtonPanel {
    pins: ButtonPins,
    long_press: Duration,
    debouncers: [Debouncer; 4],
    faulted: [bool; 4],
    select_down_at: Option<Instant>,
    last_activity: Option<Instant>,
}

impl ButtonPanel {
    /// Panel with the default debounce window and long-press threshold.
    pub fn new(pins: ButtonPins) -> Self {
        Self::with_timing(
            pins,
            Duration::from_millis(BUTTON_DEBOUNCE_TIME_MS),
            Duration::from_millis(LONG_PRESS_TIME_MS),
        )
    }

    pub fn with_timing(pins: ButtonPins, debounce: Duration, long_press: Duration) -> Self {
        Self {
            pins,
            long_press,
            debouncers: std::array::from_fn(|_| Debouncer::with_interval(debounce)),
            faulted: [false; 4],
            select_down_at: None,
            last_activity: None,
        }
    }

    /// Sample every button once and return the events produced this cycle.
    pub fn poll<IO: DigitalIo>(&mut self, io: &mut IO, now: Instant) -> Vec<ButtonEvent> {
        let mut events = Vec::new();

        for button in Button::ALL {
            let raw = self.read_pressed(io, button);
            let Some(edge) = self.debouncers[button.index()].update(raw, now) else {
                continue;
            };
            self.last_activity = Some(now);

            match (button, edge) {
                (Button::Up, Edge::Pressed) => events.push(ButtonEvent::Up),
                (Button::Down, Edge::Pressed) => events.push(ButtonEvent::Down),
                (Button::Back, Edge::Pressed) => events.push(ButtonEvent::Back),
                (Button::Select, Edge::Pressed) => self.select_down_at = Some(now),
                (Button::Select, Edge::Released) => {
                    if let Some(kind) = self.classify_select(now) {
                        events.push(ButtonEvent::Select(kind));
                    }
                }
                _ => {}
            }
        }

        for event in &events {
            debug!(?event, "Button event");
        }
        events
    }

    /// Time of the most recent stable edge on any button.
    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Stable level of `button`.
    pub fn is_pressed(&self, button: Button) -> bool {
        self.debouncers[button.index()].is_pressed()
    }

    /// How long SELECT has been held so far.
    pub fn select_held_for(&self, now: Instant) -> Option<Duration> {
        self.select_down_at
            .map(|at| now.saturating_duration_since(at))
    }

    pub fn pins(&self) -> ButtonPins {
        self.pins
    }

    fn classify_select(&mut self, now: Instant) -> Option<PressKind> {
        let held = now.saturating_duration_since(self.select_down_at.take()?);
        Some(if held >= self.long_press {
            PressKind::Long
        } else {
            PressKind::Short
        })
    }

    fn read_pressed<IO: DigitalIo>(&mut self, io: &mut IO, button: Button) -> Option<bool> {
        let pin = self.pins.pin(button);
        let slot = button.index();
        match io.read_pin(pin) {
            Ok(level) => {
                if self.faulted[slot] {
                    debug!(%button, %pin, "Button pin readable again");
                    self.faulted[slot] = false;
                }
                Some(level == Level::Low)
            }
            Err(e) => {
                if !self.faulted[slot] {
                    warn!(%button, %pin, error = %e, "Button pin read failed, keeping last level");
                    self.faulted[slot] = true;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_hardware::mock::{MockPins, MockPinsHandle};
    use rstest::rstest;

    struct Rig {
        pins: MockPins,
        handle: MockPinsHandle,
        panel: ButtonPanel,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            let (pins, handle) = MockPins::new();
            Self {
                pins,
                handle,
                panel: ButtonPanel::new(ButtonPins::default()),
                t0: Instant::now(),
            }
        }

        fn poll(&mut self, ms: u64) -> Vec<ButtonEvent> {
            self.panel
                .poll(&mut self.pins, self.t0 + Duration::from_millis(ms))
        }
    }

    #[rstest]
    #[case(Button::Up, ButtonEvent::Up)]
    #[case(Button::Down, ButtonEvent::Down)]
    #[case(Button::Back, ButtonEvent::Back)]
    fn test_press_edge_events(#[case] button: Button, #[case] expected: ButtonEvent) {
        let mut rig = Rig::new();
        let pin = ButtonPins::default().pin(button);

        rig.handle.press(pin);
        assert_eq!(rig.poll(0), vec![expected]);
        // Holding does not repeat.
        assert!(rig.poll(100).is_empty());
        assert!(rig.poll(2000).is_empty());

        rig.handle.release(pin);
        assert!(rig.poll(2100).is_empty());
        assert!(!rig.panel.is_pressed(button));
    }

    #[rstest]
    #[case(50, PressKind::Short)]
    #[case(999, PressKind::Short)]
    #[case(1000, PressKind::Long)]
    #[case(4000, PressKind::Long)]
    fn test_select_classification(#[case] held_ms: u64, #[case] kind: PressKind) {
        let mut rig = Rig::new();
        let select = ButtonPins::default().select;

        rig.handle.press(select);
        assert!(rig.poll(0).is_empty());
        rig.handle.release(select);
        assert_eq!(rig.poll(held_ms), vec![ButtonEvent::Select(kind)]);
    }

    #[test]
    fn test_activity_tracks_stable_edges_only() {
        let mut rig = Rig::new();
        assert!(rig.poll(0).is_empty());
        assert_eq!(rig.panel.last_activity(), None);

        rig.handle.press(ButtonPins::default().select);
        rig.poll(10);
        assert_eq!(
            rig.panel.last_activity(),
            Some(rig.t0 + Duration::from_millis(10))
        );
        rig.poll(500);
        assert_eq!(
            rig.panel.last_activity(),
            Some(rig.t0 + Duration::from_millis(10))
        );
    }

    #[test]
    fn test_read_failure_keeps_select_held() {
        let mut rig = Rig::new();
        let select = ButtonPins::default().select;

        rig.handle.press(select);
        rig.poll(0);
        rig.handle.set_fail_reads(true);
        assert!(rig.poll(100).is_empty());
        assert!(rig.panel.is_pressed(Button::Select));

        rig.handle.set_fail_reads(false);
        rig.handle.release(select);
        assert_eq!(rig.poll(1500), vec![ButtonEvent::Select(PressKind::Long)]);
    }

    #[test]
    fn test_two_buttons_same_cycle() {
        let mut rig = Rig::new();
        rig.handle.press(ButtonPins::default().up);
        rig.handle.press(ButtonPins::default().back);
        assert_eq!(rig.poll(0), vec![ButtonEvent::Up, ButtonEvent::Back]);
    }

    #[test]
    fn test_pins_deserialize_with_defaults() {
        let pins: ButtonPins = serde_json::from_str(r#"{"up": 2}"#).unwrap();
        assert_eq!(pins.up, PinId(2));
        assert_eq!(pins.back, PinId(BTN_BACK_PIN));
    }
}

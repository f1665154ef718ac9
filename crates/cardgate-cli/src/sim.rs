//! The controller wired to simulated devices.

use std::time::Duration;

use anyhow::Context;
use cardgate_controller::{AccessController, ControllerConfig, SystemState};
use cardgate_core::CardIdentity;
use cardgate_hardware::mock::{
    MemoryStorage, MockClock, MockNfc, MockNfcHandle, MockPins, MockPinsHandle, VirtualLcd,
};
use cardgate_input::Button;
use cardgate_rfid::DetectionMode;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::scenario::{SETTLE_MS, Scenario, Step};

type SimController = AccessController<MockNfc, MemoryStorage, VirtualLcd, MockPins, MockClock>;

/// One line of simulator output, emitted after each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub elapsed_ms: u64,
    pub step: String,
    pub state: SystemState,
    pub lcd: [String; 2],
}

pub struct Simulator {
    controller: SimController,
    radio: MockNfcHandle,
    buttons: MockPinsHandle,
    clock: MockClock,
    lcd: VirtualLcd,
    tick: Duration,
    realtime: bool,
}

impl Simulator {
    /// Boot a controller over fresh simulated devices.
    pub fn new(config: ControllerConfig, tick: Duration, realtime: bool) -> anyhow::Result<Self> {
        if tick.is_zero() {
            anyhow::bail!("tick must be at least 1 ms");
        }

        let (nfc, radio) = MockNfc::new();
        let (pins, buttons) = MockPins::new();
        let clock = MockClock::new();
        let lcd = VirtualLcd::default();

        let controller = AccessController::new(
            config,
            nfc,
            MemoryStorage::default(),
            lcd.clone(),
            pins,
            clock.clone(),
        )
        .context("controller failed to boot")?;

        if let Some(irq) = controller.irq_line() {
            radio.attach_irq(irq, clock.clone());
        }

        Ok(Self {
            controller,
            radio,
            buttons,
            clock,
            lcd,
            tick,
            realtime,
        })
    }

    /// Write identities straight into the store.
    pub fn enroll(&mut self, identities: &[CardIdentity]) -> anyhow::Result<()> {
        for identity in identities {
            let outcome = self
                .controller
                .store_mut()
                .add(identity)
                .with_context(|| format!("enrolling {identity}"))?;
            info!(%identity, ?outcome, "Pre-enrolled card");
        }
        Ok(())
    }

    /// Replay every step, collecting a frame after each.
    pub async fn run(&mut self, scenario: &Scenario) -> anyhow::Result<Vec<Frame>> {
        self.enroll(&scenario.enrolled)?;

        let mut frames = Vec::with_capacity(scenario.steps.len());
        for step in &scenario.steps {
            self.apply(step).await;
            frames.push(self.frame(step));
        }
        Ok(frames)
    }

    async fn apply(&mut self, step: &Step) {
        debug!(%step, "Applying step");
        match *step {
            Step::Present { uid } => {
                self.radio.present(uid);
                self.advance(SETTLE_MS).await;
            }
            Step::Remove => {
                self.radio.remove();
                self.advance(SETTLE_MS).await;
            }
            Step::Press { button } => {
                self.buttons.press(self.pin(button));
                self.advance(SETTLE_MS).await;
            }
            Step::Release { button } => {
                self.buttons.release(self.pin(button));
                self.advance(SETTLE_MS).await;
            }
            Step::Hold { button, ms } => {
                self.buttons.press(self.pin(button));
                self.advance(ms).await;
                self.buttons.release(self.pin(button));
                self.advance(SETTLE_MS).await;
            }
            Step::Wait { ms } => self.advance(ms).await,
        }
    }

    /// Move simulated time forward by `ms`, ticking the controller at the
    /// configured interval. In realtime mode ticks are paced by a tokio
    /// interval; otherwise they run back to back.
    async fn advance(&mut self, ms: u64) {
        let step_ms = self.tick_ms();
        let ticks = ms.div_ceil(step_ms);

        if self.realtime {
            let mut pacer = interval(self.tick);
            pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for _ in 0..ticks {
                pacer.tick().await;
                self.step_once(step_ms);
            }
        } else {
            for _ in 0..ticks {
                self.step_once(step_ms);
            }
            tokio::task::yield_now().await;
        }
    }

    fn step_once(&mut self, ms: u64) {
        self.clock.advance_ms(ms);
        self.controller.tick();
    }

    fn tick_ms(&self) -> u64 {
        (self.tick.as_millis() as u64).max(1)
    }

    fn pin(&self, button: Button) -> cardgate_hardware::PinId {
        self.controller.config().pins.buttons().pin(button)
    }

    fn frame(&self, step: &Step) -> Frame {
        Frame {
            elapsed_ms: self.clock.elapsed_ms(),
            step: step.to_string(),
            state: self.controller.state(),
            lcd: [self.lcd.line(0), self.lcd.line(1)],
        }
    }

    pub fn controller(&self) -> &SimController {
        &self.controller
    }

    pub fn radio(&self) -> &MockNfcHandle {
        &self.radio
    }
}

//! The access controller control cycle.
//!
//! [`AccessController::tick`] runs one cooperative cycle:
//!
//! 1. sample the buttons
//! 2. relock the door if its unlock window elapsed
//! 3. expire notices and apply button events
//! 4. apply state timeouts
//! 5. poll the card detector and act on a newly presented card
//! 6. redraw the display if the screen changed
//!
//! All collaborator I/O happens inside the cycle. Failures are logged and
//! reported on the display; the cycle itself never fails.

use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use cardgate_core::CardIdentity;
use cardgate_door::DoorRelay;
use cardgate_hardware::traits::{ByteStorage, CharacterDisplay, Clock, DigitalIo, NfcDevice};
use cardgate_hardware::IrqLine;
use cardgate_input::{ButtonEvent, ButtonPanel, PressKind};
use cardgate_rfid::{CardDetector, IdentityResolver, ScannedCard};
use cardgate_storage::{AddOutcome, CardStore};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::menu::MenuItem;
use crate::screen::{DenyReason, Notice, Screen};
use crate::state::{StateMachine, StateTransition, SystemState};

/// Single-door access controller.
///
/// Generic over its collaborators so the same code runs on board drivers and
/// on the simulated devices in [`cardgate_hardware::mock`].
///
/// # Examples
///
/// ```
/// use cardgate_controller::{AccessController, ControllerConfig, SystemState};
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::{MemoryStorage, MockClock, MockNfc, MockPins, VirtualLcd};
///
/// let (nfc, radio) = MockNfc::new();
/// let (pins, _buttons) = MockPins::new();
/// let clock = MockClock::new();
/// let lcd = VirtualLcd::default();
///
/// let mut controller = AccessController::new(
///     ControllerConfig::default(),
///     nfc,
///     MemoryStorage::default(),
///     lcd.clone(),
///     pins,
///     clock.clone(),
/// )
/// .unwrap();
/// assert_eq!(lcd.render(), "  System Ready|  Scan Card...");
///
/// radio.present(CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap());
/// assert_eq!(controller.tick(), SystemState::AccessDenied);
///
/// radio.remove();
/// clock.advance_ms(2000);
/// assert_eq!(controller.tick(), SystemState::Idle);
/// ```
pub struct AccessController<N, S, D, P, C> {
    config: ControllerConfig,
    nfc: N,
    store: CardStore<S>,
    display: D,
    pins: P,
    clock: C,
    machine: StateMachine,
    detector: CardDetector,
    resolver: IdentityResolver,
    buttons: ButtonPanel,
    door: DoorRelay,
    menu_item: MenuItem,
    list_index: usize,
    deny_reason: DenyReason,
    clone_source: Option<ScannedCard>,
    notice: Option<Notice>,
    activity_at: Instant,
    shown: Option<Screen>,
}

impl<N, S, D, P, C> AccessController<N, S, D, P, C>
where
    N: NfcDevice,
    S: ByteStorage,
    D: CharacterDisplay,
    P: DigitalIo,
    C: Clock,
{
    /// Boot the controller: check the radio, lock the door, open the store
    /// and draw the idle screen.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::Config`] if `config` fails validation
    /// - [`ControllerError::NfcNotFound`] if the radio does not report firmware
    /// - [`ControllerError::Hardware`] if the relay pin cannot be driven
    /// - [`ControllerError::Storage`] if the store cannot be opened
    pub fn new(
        config: ControllerConfig,
        mut nfc: N,
        storage: S,
        mut display: D,
        mut pins: P,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;

        if let Err(e) = Screen::boot().render(&mut display) {
            warn!(error = %e, "Display not responding at boot");
        }

        let firmware = match nfc.firmware_version() {
            Ok(firmware) => firmware,
            Err(e) => {
                error!(error = %e, "NFC reader not found");
                let _ = Screen::nfc_error().render(&mut display);
                return Err(ControllerError::NfcNotFound(e));
            }
        };
        info!(%firmware, "NFC reader ready");

        let mut door = DoorRelay::new(config.relay());
        door.lock(&mut pins)?;

        let store = CardStore::with_capacity(storage, config.capacity)?;
        info!(
            cards = store.count(),
            capacity = store.capacity(),
            "Card store ready"
        );

        let detector = CardDetector::new(config.detector());
        info!(mode = ?detector.mode(), "Card detector ready");

        let now = clock.now();
        let mut controller = Self {
            buttons: ButtonPanel::with_timing(
                config.pins.buttons(),
                config.debounce(),
                config.long_press(),
            ),
            config,
            nfc,
            store,
            display,
            pins,
            clock,
            machine: StateMachine::new(now),
            detector,
            resolver: IdentityResolver::default(),
            door,
            menu_item: MenuItem::default(),
            list_index: 0,
            deny_reason: DenyReason::UnknownCard,
            clone_source: None,
            notice: None,
            activity_at: now,
            shown: None,
        };
        controller.refresh_display();

        info!("System ready");
        Ok(controller)
    }

    /// Run one control cycle and return the resulting state.
    pub fn tick(&mut self) -> SystemState {
        let now = self.clock.now();

        let events = self.buttons.poll(&mut self.pins, now);
        if let Some(at) = self.buttons.last_activity()
            && at > self.activity_at
        {
            self.activity_at = at;
        }

        if let Err(e) = self.door.update(&mut self.pins, now) {
            error!(error = %e, "Failed to relock door");
        }

        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            trace!("Notice expired");
            self.notice = None;
        }

        for event in events {
            self.notice = None;
            self.handle_button(event, now);
        }

        self.check_timeouts(now);

        if !self.detection_held()
            && let Some(raw) = self.detector.poll(&mut self.nfc, now)
        {
            let card = self.resolver.resolve(&mut self.nfc, raw);
            self.handle_card(card, now);
        }

        self.refresh_display();
        self.state()
    }

    pub fn state(&self) -> SystemState {
        self.machine.current_state()
    }

    /// Highlighted menu entry.
    pub fn menu_item(&self) -> MenuItem {
        self.menu_item
    }

    /// Cursor position while listing cards.
    pub fn list_index(&self) -> usize {
        self.list_index
    }

    /// Notice currently shown over the state screen.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Source card captured by an in-progress clone.
    pub fn clone_source(&self) -> Option<&ScannedCard> {
        self.clone_source.as_ref()
    }

    /// Screen the display should currently show.
    pub fn screen(&self) -> Screen {
        if let Some(notice) = &self.notice {
            return notice.screen.clone();
        }

        match self.state() {
            SystemState::Idle => Screen::idle(),
            SystemState::AccessGranted => Screen::access_granted(),
            SystemState::AccessDenied => Screen::access_denied(self.deny_reason),
            SystemState::Menu => Screen::menu(self.menu_item),
            SystemState::Registering => Screen::registering(),
            SystemState::Deleting => Screen::deleting(),
            SystemState::ListingCards => {
                let record = self.store.list(self.list_index).ok().flatten();
                Screen::listing(self.list_index, self.store.count(), record.as_ref())
            }
            SystemState::CloningSource => Screen::cloning_source(),
            SystemState::CloningTarget => Screen::cloning_target(),
        }
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.machine.history().iter().copied().collect()
    }

    pub fn store(&self) -> &CardStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CardStore<S> {
        &mut self.store
    }

    pub fn door(&self) -> &DoorRelay {
        &self.door
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// IRQ line to wire to the radio interrupt (interrupt mode only).
    pub fn irq_line(&self) -> Option<IrqLine> {
        self.detector.irq_line()
    }

    fn detection_held(&self) -> bool {
        self.notice.as_ref().is_some_and(|n| n.hold)
    }

    fn enter(&mut self, target: SystemState, now: Instant) {
        match self.machine.transition_to(target, now) {
            Ok(t) => info!(from = %t.from, to = %t.to, "State transition"),
            Err(e) => {
                error!(error = %e, "Rejected state transition, resetting to Idle");
                self.machine.reset(now);
            }
        }

        if !self.state().is_cloning() && self.clone_source.take().is_some() {
            debug!("Clone session closed");
        }
        self.activity_at = now;
    }

    fn show_notice(&mut self, screen: Screen, hold: bool, now: Instant) {
        debug!(top = screen.line(0).trim_end(), bottom = screen.line(1).trim_end(), hold, "Notice");
        self.notice = Some(Notice {
            screen,
            until: now + self.config.message_display(),
            hold,
        });
    }

    fn check_timeouts(&mut self, now: Instant) {
        let state = self.state();

        if state.is_access_result()
            && self.machine.time_in_current_state(now) >= self.config.message_display()
        {
            self.enter(SystemState::Idle, now);
        } else if state.is_operator()
            && now.saturating_duration_since(self.activity_at) >= self.config.menu_timeout()
        {
            info!(%state, "Menu inactivity timeout");
            self.enter(SystemState::Idle, now);
        }
    }

    fn handle_button(&mut self, event: ButtonEvent, now: Instant) {
        let state = self.state();

        match (state, event) {
            (SystemState::Idle, ButtonEvent::Select(PressKind::Long)) => {
                self.menu_item = MenuItem::default();
                self.enter(SystemState::Menu, now);
            }
            (s, ButtonEvent::Back) if s.is_operator() => self.enter(SystemState::Idle, now),
            (SystemState::Menu, ButtonEvent::Up) => self.menu_item = self.menu_item.previous(),
            (SystemState::Menu, ButtonEvent::Down) => self.menu_item = self.menu_item.next(),
            (SystemState::Menu, ButtonEvent::Select(PressKind::Short)) => self.select_menu_item(now),
            (SystemState::ListingCards, ButtonEvent::Up) => {
                self.list_index = self.list_index.saturating_sub(1);
            }
            (SystemState::ListingCards, ButtonEvent::Down) => {
                if self.list_index + 1 < self.store.count() {
                    self.list_index += 1;
                }
            }
            _ => trace!(%state, ?event, "Button ignored"),
        }
    }

    fn select_menu_item(&mut self, now: Instant) {
        info!(item = %self.menu_item, "Menu selection");

        match self.menu_item {
            MenuItem::Register => self.enter(SystemState::Registering, now),
            MenuItem::Delete => self.enter(SystemState::Deleting, now),
            MenuItem::List => {
                if self.store.is_empty() {
                    self.show_notice(Screen::new("No Cards", "Stored"), false, now);
                    self.enter(SystemState::Idle, now);
                } else {
                    self.list_index = 0;
                    self.enter(SystemState::ListingCards, now);
                }
            }
            MenuItem::Clone => self.enter(SystemState::CloningSource, now),
            MenuItem::Settings => {
                self.show_notice(Screen::new("Settings", "Not implemented"), false, now);
            }
            MenuItem::ClearAll => {
                let screen = match self.store.clear() {
                    Ok(()) => {
                        info!("All cards cleared");
                        Screen::new("All Cards", "Cleared!")
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to clear card store");
                        Screen::new("Error!", "Storage error")
                    }
                };
                self.show_notice(screen, false, now);
            }
            MenuItem::Exit => self.enter(SystemState::Idle, now),
        }
    }

    fn handle_card(&mut self, card: ScannedCard, now: Instant) {
        let state = self.state();
        if !state.accepts_card() {
            debug!(%state, uid = %card.physical_uid(), "Card ignored");
            return;
        }
        self.notice = None;

        match state {
            SystemState::Idle => self.authorize(&card, now),
            SystemState::Registering => self.register(&card, now),
            SystemState::Deleting => self.delete(&card, now),
            SystemState::CloningSource => self.capture_clone_source(card, now),
            SystemState::CloningTarget => self.clone_onto(&card, now),
            _ => {}
        }
    }

    fn authorize(&mut self, card: &ScannedCard, now: Instant) {
        let identity = card.effective_identity();

        match self.store.find(&identity) {
            Ok(Some(_)) if card.suspected_blank_clone() => {
                warn!(
                    uid = %card.physical_uid(),
                    "Stored UID on a card with a blank reserved block, denying"
                );
                self.deny(DenyReason::InvalidCard, now);
            }
            Ok(Some(index)) => {
                info!(%identity, index, cloned = card.has_cloned_identity(), "Access granted");
                self.enter(SystemState::AccessGranted, now);
                if let Err(e) = self.door.unlock(&mut self.pins, now) {
                    error!(error = %e, "Failed to unlock door");
                }
            }
            Ok(None) => {
                info!(%identity, "Access denied: unknown card");
                self.deny(DenyReason::UnknownCard, now);
            }
            Err(e) => {
                error!(error = %e, "Card store lookup failed, denying");
                self.deny(DenyReason::UnknownCard, now);
            }
        }
    }

    fn deny(&mut self, reason: DenyReason, now: Instant) {
        self.deny_reason = reason;
        self.enter(SystemState::AccessDenied, now);
    }

    fn register(&mut self, card: &ScannedCard, now: Instant) {
        let identity = card.effective_identity();

        let screen = match self.store.add(&identity) {
            Ok(AddOutcome::Added { index }) if card.suspected_blank_clone() => {
                self.stamp_enrolled(card, &identity, index)
            }
            Ok(AddOutcome::Added { index }) => {
                info!(%identity, index, "Card registered");
                Screen::new("Card Added!", "Successfully")
            }
            Ok(AddOutcome::Duplicate { index }) => {
                info!(%identity, index, "Card already registered");
                Screen::new("Error!", "Card exists/full")
            }
            Ok(AddOutcome::Full) => {
                warn!(%identity, capacity = self.store.capacity(), "Card store full");
                Screen::new("Error!", "Card exists/full")
            }
            Err(e) => {
                error!(error = %e, "Failed to register card");
                Screen::new("Error!", "Storage error")
            }
        };

        self.show_notice(screen, false, now);
        self.enter(SystemState::Idle, now);
    }

    /// Write the enrolled identity into a blank reserved block so the card
    /// passes the blank-block check. Rolls the enrollment back on failure.
    fn stamp_enrolled(&mut self, card: &ScannedCard, identity: &CardIdentity, index: usize) -> Screen {
        match self.resolver.write_cloned_uid(&mut self.nfc, card, identity) {
            Ok(()) => {
                info!(%identity, index, "Card registered and reserved block stamped");
                Screen::new("Card Added!", "Successfully")
            }
            Err(e) => {
                warn!(%identity, error = %e, "Reserved block stamp failed, rolling back");
                if let Err(e) = self.store.remove(identity) {
                    error!(%identity, error = %e, "Rollback of registration failed");
                }
                Screen::new("Add Failed!", "Write error")
            }
        }
    }

    fn delete(&mut self, card: &ScannedCard, now: Instant) {
        let identity = card.effective_identity();

        let screen = match self.store.remove(&identity) {
            Ok(true) => {
                info!(%identity, "Card deleted");
                Screen::new("Card Deleted!", "Successfully")
            }
            Ok(false) => {
                info!(%identity, "Card to delete not found");
                Screen::new("Error!", "Card not found")
            }
            Err(e) => {
                error!(error = %e, "Failed to delete card");
                Screen::new("Error!", "Storage error")
            }
        };

        self.show_notice(screen, false, now);
        self.enter(SystemState::Idle, now);
    }

    fn capture_clone_source(&mut self, card: ScannedCard, now: Instant) {
        let identity = card.effective_identity();
        info!(
            uid = %card.physical_uid(),
            %identity,
            cloned = card.has_cloned_identity(),
            "Clone source captured"
        );

        self.enter(SystemState::CloningTarget, now);
        self.clone_source = Some(card);
        self.show_notice(Screen::clone_source_captured(&identity), false, now);
    }

    fn clone_onto(&mut self, target: &ScannedCard, now: Instant) {
        let Some(source) = self.clone_source.take() else {
            error!("Clone target presented without a source");
            self.enter(SystemState::Idle, now);
            return;
        };

        // Physical UIDs: a card already carrying a cloned identity must not
        // pass as a different card.
        if target.physical_uid() == source.physical_uid() {
            warn!(uid = %target.physical_uid(), "Clone target is the source card");
            self.show_notice(Screen::new("Error!", "Same card"), false, now);
            self.enter(SystemState::Idle, now);
            return;
        }

        if !target.card_class().is_classic() {
            warn!(class = %target.card_class(), "Clone target is not a classic card");
            self.show_notice(Screen::new("Error!", "Need Classic 1K"), false, now);
            self.enter(SystemState::Idle, now);
            return;
        }

        let identity = source.effective_identity();
        let screen = match self
            .resolver
            .write_cloned_uid(&mut self.nfc, target, &identity)
        {
            Ok(()) => {
                info!(target = %target.physical_uid(), %identity, "Clone written");
                Screen::new("Clone SUCCESS!", "Sector 1 OK")
            }
            Err(e) => {
                warn!(target = %target.physical_uid(), error = %e, "Clone failed");
                Screen::new("Clone Failed!", "Write error")
            }
        };

        self.detector.reset();
        self.show_notice(screen, true, now);
        self.enter(SystemState::Idle, now);
    }

    fn refresh_display(&mut self) {
        let screen = self.screen();
        if self.shown.as_ref() == Some(&screen) {
            return;
        }

        match screen.render(&mut self.display) {
            Ok(()) => self.shown = Some(screen),
            Err(e) => {
                warn!(error = %e, "Display update failed");
                self.shown = None;
            }
        }
    }
}

//! End-to-end controller scenarios on simulated hardware.

use cardgate_controller::{
    AccessController, ControllerConfig, ControllerError, MenuItem, PinConfig, SystemState,
};
use cardgate_core::CardIdentity;
use cardgate_core::constants::RESERVED_BLOCK;
use cardgate_hardware::mock::{
    MemoryStorage, MockClock, MockNfc, MockNfcHandle, MockPins, MockPinsHandle, SimCard,
    VirtualLcd,
};
use cardgate_hardware::types::{Level, PinId};
use cardgate_rfid::DetectionMode;
use cardgate_rfid::reserved;

type Controller = AccessController<MockNfc, MemoryStorage, VirtualLcd, MockPins, MockClock>;

const TICK_MS: u64 = 10;

struct Rig {
    controller: Controller,
    radio: MockNfcHandle,
    buttons: MockPinsHandle,
    clock: MockClock,
    lcd: VirtualLcd,
    pins: PinConfig,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    fn with_config(config: ControllerConfig) -> Self {
        let (nfc, radio) = MockNfc::new();
        let (pins, buttons) = MockPins::new();
        let clock = MockClock::new();
        let lcd = VirtualLcd::default();
        let pin_config = config.pins;

        let controller = AccessController::new(
            config,
            nfc,
            MemoryStorage::default(),
            lcd.clone(),
            pins,
            clock.clone(),
        )
        .unwrap();

        Self {
            controller,
            radio,
            buttons,
            clock,
            lcd,
            pins: pin_config,
        }
    }

    /// Advance simulated time by `ms`, ticking every 10 ms.
    fn run(&mut self, ms: u64) -> SystemState {
        for _ in 0..ms / TICK_MS {
            self.clock.advance_ms(TICK_MS);
            self.controller.tick();
        }
        self.controller.state()
    }

    fn state(&self) -> SystemState {
        self.controller.state()
    }

    fn screen(&self) -> String {
        self.lcd.render()
    }

    fn click(&mut self, pin: PinId) {
        self.buttons.press(pin);
        self.run(50);
        self.buttons.release(pin);
        self.run(50);
    }

    fn short_select(&mut self) {
        self.click(self.pins.select);
    }

    fn long_select(&mut self) {
        self.buttons.press(self.pins.select);
        self.run(1200);
        self.buttons.release(self.pins.select);
        self.run(50);
    }

    fn down(&mut self) {
        self.click(self.pins.down);
    }

    fn up(&mut self) {
        self.click(self.pins.up);
    }

    fn back(&mut self) {
        self.click(self.pins.back);
    }

    /// Open the menu and select `item`.
    fn choose(&mut self, item: MenuItem) {
        self.long_select();
        assert_eq!(self.state(), SystemState::Menu);
        for _ in 0..item.position() {
            self.down();
        }
        assert_eq!(self.controller.menu_item(), item);
        self.short_select();
    }

    /// Put a card in the field long enough for one detection.
    fn present(&mut self, uid: CardIdentity) -> SystemState {
        self.radio.present(uid);
        self.run(150)
    }

    /// Take the card away and wait until it counts as removed.
    fn take_away(&mut self) {
        self.radio.remove();
        self.run(1100);
    }

    fn stored(&self, uid: &CardIdentity) -> bool {
        self.controller.store().contains(uid).unwrap()
    }

    fn reserved_block(&self, uid: &CardIdentity) -> [u8; 16] {
        self.radio.card(uid).unwrap().block(RESERVED_BLOCK).unwrap()
    }
}

fn classic(bytes: [u8; 4]) -> CardIdentity {
    CardIdentity::new(&bytes).unwrap()
}

fn ultralight() -> CardIdentity {
    CardIdentity::new(&[0x04, 0x51, 0x6A, 0x22, 0x7C, 0x5D, 0x80]).unwrap()
}

// ============================================================================
// Boot
// ============================================================================

#[test]
fn test_boot_shows_idle_and_locks_door() {
    let rig = Rig::new();
    assert_eq!(rig.state(), SystemState::Idle);
    assert_eq!(rig.screen(), "  System Ready|  Scan Card...");
    assert_eq!(rig.buttons.writes(rig.pins.relay), vec![Level::Low]);
}

#[test]
fn test_boot_fails_without_reader() {
    let (nfc, radio) = MockNfc::new();
    radio.set_firmware(None);
    let lcd = VirtualLcd::default();

    let result = AccessController::new(
        ControllerConfig::default(),
        nfc,
        MemoryStorage::default(),
        lcd.clone(),
        MockPins::default(),
        MockClock::new(),
    );

    assert!(matches!(result, Err(ControllerError::NfcNotFound(_))));
    assert_eq!(lcd.render(), "NFC ERROR!|Check wiring");
}

#[test]
fn test_boot_rejects_invalid_config() {
    let (nfc, _radio) = MockNfc::new();
    let result = AccessController::new(
        ControllerConfig::default().with_capacity(0),
        nfc,
        MemoryStorage::default(),
        VirtualLcd::default(),
        MockPins::default(),
        MockClock::new(),
    );
    assert!(matches!(result, Err(ControllerError::Config(_))));
}

#[test]
fn test_boot_fails_on_tiny_storage() {
    let (nfc, _radio) = MockNfc::new();
    let result = AccessController::new(
        ControllerConfig::default(),
        nfc,
        MemoryStorage::new(64),
        VirtualLcd::default(),
        MockPins::default(),
        MockClock::new(),
    );
    assert!(matches!(result, Err(ControllerError::Storage(_))));
}

#[test]
fn test_display_redrawn_only_on_change() {
    let mut rig = Rig::new();
    // Boot banner, then the idle screen.
    assert_eq!(rig.lcd.clear_count(), 2);
    rig.run(5000);
    assert_eq!(rig.lcd.clear_count(), 2);

    rig.long_select();
    assert_eq!(rig.lcd.clear_count(), 3);
}

// ============================================================================
// Access decisions
// ============================================================================

#[test]
fn test_unknown_card_denied_then_idle() {
    let mut rig = Rig::new();

    let state = rig.present(classic([0x04, 0x12, 0x34, 0x56]));
    assert_eq!(state, SystemState::AccessDenied);
    assert_eq!(rig.screen(), " Access Denied| Unknown Card");

    rig.radio.remove();
    assert_eq!(rig.run(1800), SystemState::AccessDenied);
    assert_eq!(rig.run(100), SystemState::Idle);
    assert_eq!(rig.screen(), "  System Ready|  Scan Card...");
    assert!(rig.buttons.writes(rig.pins.relay).iter().all(|l| *l == Level::Low));
}

#[test]
fn test_card_left_in_field_is_judged_once() {
    let mut rig = Rig::new();
    rig.present(classic([0x04, 0x12, 0x34, 0x56]));
    rig.run(5000);

    let denials = rig
        .controller
        .history()
        .iter()
        .filter(|t| t.to == SystemState::AccessDenied)
        .count();
    assert_eq!(denials, 1);
    assert_eq!(rig.state(), SystemState::Idle);
}

#[test]
fn test_enrolled_card_grants_and_relocks() {
    let mut rig = Rig::new();
    let card = classic([0xA1, 0xB2, 0xC3, 0xD4]);

    rig.choose(MenuItem::Register);
    rig.present(card);
    rig.take_away();

    assert_eq!(rig.present(card), SystemState::AccessGranted);
    assert_eq!(rig.screen(), " Access Granted|   Welcome!");
    assert!(rig.controller.door().is_unlocked());
    assert_eq!(rig.buttons.level(rig.pins.relay), Level::High);

    rig.radio.remove();
    assert_eq!(rig.run(2000), SystemState::Idle);
    assert!(rig.controller.door().is_unlocked());

    rig.run(1000);
    assert!(!rig.controller.door().is_unlocked());
    assert_eq!(
        rig.buttons.writes(rig.pins.relay),
        vec![Level::Low, Level::High, Level::Low]
    );
}

#[test]
fn test_blank_clone_of_stored_uid_denied() {
    let mut rig = Rig::new();
    let uid = classic([0x04, 0x12, 0x34, 0x56]);
    // Stored directly, so the physical card never got its reserved block
    // stamped: it looks exactly like a UID-only magic copy.
    rig.controller.store_mut().add(&uid).unwrap();

    assert_eq!(rig.present(uid), SystemState::AccessDenied);
    assert_eq!(rig.screen(), " Access Denied| Invalid Card");
    assert!(!rig.controller.door().is_unlocked());
}

#[test]
fn test_cloned_identity_authorizes() {
    let mut rig = Rig::new();
    let source = classic([0x04, 0x12, 0x34, 0x56]);
    let target = classic([0xDE, 0xAD, 0xBE, 0xEF]);
    rig.controller.store_mut().add(&source).unwrap();
    rig.radio
        .add_card(SimCard::classic(target).with_block(RESERVED_BLOCK, reserved::encode(&source)));

    assert_eq!(rig.present(target), SystemState::AccessGranted);
}

#[test]
fn test_unreadable_reserved_block_uses_physical_uid() {
    let mut rig = Rig::new();
    let uid = classic([0x11, 0x22, 0x33, 0x44]);
    rig.controller.store_mut().add(&uid).unwrap();
    rig.radio
        .add_card(SimCard::classic(uid).with_sector_key(1, [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]));

    assert_eq!(rig.present(uid), SystemState::AccessGranted);
}

#[test]
fn test_interrupt_mode_reads_only_after_irq() {
    let mut rig = Rig::with_config(ControllerConfig::default().with_detection(DetectionMode::Interrupt));
    let irq = rig.controller.irq_line().unwrap();
    rig.radio.attach_irq(irq, rig.clock.clone());

    rig.run(1000);
    assert_eq!(rig.radio.detect_calls(), 0);

    assert_eq!(rig.present(ultralight()), SystemState::AccessDenied);
    assert_eq!(rig.radio.detect_calls(), 1);
}

// ============================================================================
// Menu
// ============================================================================

#[test]
fn test_long_select_then_down_then_select_enters_deleting() {
    let mut rig = Rig::new();

    rig.long_select();
    assert_eq!(rig.state(), SystemState::Menu);
    assert_eq!(rig.controller.menu_item(), MenuItem::Register);
    assert_eq!(rig.screen(), ">Register Card| Delete Card");

    rig.down();
    assert_eq!(rig.controller.menu_item(), MenuItem::Delete);
    assert_eq!(rig.screen(), ">Delete Card| List Cards");

    rig.short_select();
    assert_eq!(rig.state(), SystemState::Deleting);
    assert_eq!(rig.screen(), "Delete Card|Scan to delete..");
}

#[test]
fn test_short_select_in_idle_does_nothing() {
    let mut rig = Rig::new();
    rig.short_select();
    assert_eq!(rig.state(), SystemState::Idle);
}

#[test]
fn test_menu_wraps_upwards() {
    let mut rig = Rig::new();
    rig.long_select();
    rig.up();
    assert_eq!(rig.controller.menu_item(), MenuItem::Exit);
    rig.short_select();
    assert_eq!(rig.state(), SystemState::Idle);
}

#[test]
fn test_menu_inactivity_timeout() {
    let mut rig = Rig::new();
    rig.long_select();

    assert_eq!(rig.run(29_000), SystemState::Menu);
    assert_eq!(rig.run(1000), SystemState::Idle);
}

#[test]
fn test_button_activity_extends_menu() {
    let mut rig = Rig::new();
    rig.long_select();
    rig.run(20_000);
    rig.down();
    assert_eq!(rig.run(25_000), SystemState::Menu);
}

#[test]
fn test_sub_state_times_out() {
    let mut rig = Rig::new();
    rig.choose(MenuItem::Register);
    assert_eq!(rig.state(), SystemState::Registering);
    assert_eq!(rig.run(30_100), SystemState::Idle);
}

#[test]
fn test_back_leaves_operator_states() {
    let mut rig = Rig::new();
    rig.choose(MenuItem::Clone);
    assert_eq!(rig.state(), SystemState::CloningSource);
    rig.back();
    assert_eq!(rig.state(), SystemState::Idle);

    rig.long_select();
    rig.back();
    assert_eq!(rig.state(), SystemState::Idle);
}

#[test]
fn test_settings_stays_in_menu() {
    let mut rig = Rig::new();
    rig.choose(MenuItem::Settings);
    assert_eq!(rig.state(), SystemState::Menu);
    assert_eq!(rig.screen(), "Settings|Not implemented");

    rig.run(2100);
    assert_eq!(rig.screen(), ">Settings| Clear All");
}

#[test]
fn test_clear_all() {
    let mut rig = Rig::new();
    rig.controller.store_mut().add(&classic([1, 2, 3, 4])).unwrap();
    rig.controller.store_mut().add(&ultralight()).unwrap();

    rig.choose(MenuItem::ClearAll);
    assert_eq!(rig.state(), SystemState::Menu);
    assert_eq!(rig.screen(), "All Cards|Cleared!");
    assert_eq!(rig.controller.store().count(), 0);
}

// ============================================================================
// Register / delete
// ============================================================================

#[test]
fn test_register_stamps_blank_classic_card() {
    let mut rig = Rig::new();
    let card = classic([0xA1, 0xB2, 0xC3, 0xD4]);

    rig.choose(MenuItem::Register);
    assert_eq!(rig.screen(), "Register Card|Scan new card...");

    assert_eq!(rig.present(card), SystemState::Idle);
    assert_eq!(rig.screen(), "Card Added!|Successfully");
    assert!(rig.stored(&card));
    assert_eq!(rig.reserved_block(&card), reserved::encode(&card));

    rig.run(2100);
    assert_eq!(rig.screen(), "  System Ready|  Scan Card...");
}

#[test]
fn test_register_lightweight_card() {
    let mut rig = Rig::new();
    rig.choose(MenuItem::Register);
    rig.present(ultralight());
    assert_eq!(rig.screen(), "Card Added!|Successfully");

    rig.take_away();
    assert_eq!(rig.present(ultralight()), SystemState::AccessGranted);
}

#[test]
fn test_register_rolls_back_when_stamp_fails() {
    let mut rig = Rig::new();
    let card = classic([0xA1, 0xB2, 0xC3, 0xD4]);
    rig.radio.set_fail_writes(true);

    rig.choose(MenuItem::Register);
    assert_eq!(rig.present(card), SystemState::Idle);
    assert_eq!(rig.screen(), "Add Failed!|Write error");
    assert!(!rig.stored(&card));
    assert_eq!(rig.controller.store().count(), 0);
}

#[test]
fn test_register_duplicate() {
    let mut rig = Rig::new();
    let card = classic([0xA1, 0xB2, 0xC3, 0xD4]);

    rig.choose(MenuItem::Register);
    rig.present(card);
    rig.take_away();

    rig.choose(MenuItem::Register);
    rig.present(card);
    assert_eq!(rig.screen(), "Error!|Card exists/full");
    assert_eq!(rig.controller.store().count(), 1);
}

#[test]
fn test_register_when_full() {
    let mut rig = Rig::with_config(ControllerConfig::default().with_capacity(1));
    rig.controller.store_mut().add(&ultralight()).unwrap();

    rig.choose(MenuItem::Register);
    rig.present(classic([9, 9, 9, 9]));
    assert_eq!(rig.screen(), "Error!|Card exists/full");
    assert_eq!(rig.controller.store().count(), 1);
}

#[test]
fn test_delete_card() {
    let mut rig = Rig::new();
    let keep = ultralight();
    let card = classic([0xA1, 0xB2, 0xC3, 0xD4]);
    rig.controller.store_mut().add(&keep).unwrap();

    rig.choose(MenuItem::Register);
    rig.present(card);
    rig.take_away();
    assert_eq!(rig.controller.store().count(), 2);

    rig.choose(MenuItem::Delete);
    assert_eq!(rig.present(card), SystemState::Idle);
    assert_eq!(rig.screen(), "Card Deleted!|Successfully");
    assert!(!rig.stored(&card));
    assert!(rig.stored(&keep));
    rig.take_away();

    rig.choose(MenuItem::Delete);
    rig.present(card);
    assert_eq!(rig.screen(), "Error!|Card not found");
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_list_cards() {
    let mut rig = Rig::new();
    rig.controller.store_mut().add(&classic([0x04, 0x12, 0x34, 0x56])).unwrap();
    rig.controller.store_mut().add(&ultralight()).unwrap();

    rig.choose(MenuItem::List);
    assert_eq!(rig.state(), SystemState::ListingCards);
    assert_eq!(rig.screen(), "#1/2|04123456");

    rig.down();
    assert_eq!(rig.screen(), "#2/2|04516A227C5D80");
    rig.down();
    assert_eq!(rig.controller.list_index(), 1);

    rig.up();
    rig.up();
    assert_eq!(rig.controller.list_index(), 0);

    rig.back();
    assert_eq!(rig.state(), SystemState::Idle);
}

#[test]
fn test_list_ignores_cards() {
    let mut rig = Rig::new();
    rig.controller.store_mut().add(&ultralight()).unwrap();
    rig.choose(MenuItem::List);

    rig.present(classic([1, 2, 3, 4]));
    assert_eq!(rig.state(), SystemState::ListingCards);
}

#[test]
fn test_list_empty_store() {
    let mut rig = Rig::new();
    rig.choose(MenuItem::List);
    assert_eq!(rig.state(), SystemState::Idle);
    assert_eq!(rig.screen(), "No Cards|Stored");

    rig.run(2100);
    assert_eq!(rig.screen(), "  System Ready|  Scan Card...");
}

// ============================================================================
// Cloning
// ============================================================================

#[test]
fn test_clone_then_target_authorizes_as_source() {
    let mut rig = Rig::new();
    let source = ultralight();
    let target = classic([0xDE, 0xAD, 0xBE, 0xEF]);
    rig.controller.store_mut().add(&source).unwrap();

    rig.choose(MenuItem::Clone);
    assert_eq!(rig.screen(), "Clone: Source|Scan source card");

    assert_eq!(rig.present(source), SystemState::CloningTarget);
    assert_eq!(rig.screen(), "Src: 04516A22|Remove & scan ne");
    assert_eq!(
        rig.controller.clone_source().map(|c| c.physical_uid()),
        Some(source)
    );
    rig.take_away();
    rig.run(1000);
    assert_eq!(rig.screen(), "Clone: Target|Scan magic card");

    assert_eq!(rig.present(target), SystemState::Idle);
    assert_eq!(rig.screen(), "Clone SUCCESS!|Sector 1 OK");
    assert_eq!(rig.reserved_block(&target), reserved::encode(&source));
    assert!(rig.controller.clone_source().is_none());

    // The target stays in the field; detection resumes after the notice.
    assert_eq!(rig.run(1500), SystemState::Idle);
    assert_eq!(rig.screen(), "Clone SUCCESS!|Sector 1 OK");
    assert_eq!(rig.run(700), SystemState::AccessGranted);
}

#[test]
fn test_clone_same_card_rejected() {
    let mut rig = Rig::new();
    let card = classic([0xDE, 0xAD, 0xBE, 0xEF]);

    rig.choose(MenuItem::Clone);
    rig.present(card);
    rig.take_away();

    assert_eq!(rig.present(card), SystemState::Idle);
    assert_eq!(rig.screen(), "Error!|Same card");
    assert!(rig.controller.clone_source().is_none());
}

#[test]
fn test_clone_same_physical_card_with_cloned_identity_rejected() {
    let mut rig = Rig::new();
    let other = classic([0x04, 0x12, 0x34, 0x56]);
    let card = classic([0xDE, 0xAD, 0xBE, 0xEF]);
    rig.radio
        .add_card(SimCard::classic(card).with_block(RESERVED_BLOCK, reserved::encode(&other)));

    rig.choose(MenuItem::Clone);
    rig.present(card);
    rig.take_away();

    rig.present(card);
    assert_eq!(rig.screen(), "Error!|Same card");
}

#[test]
fn test_clone_onto_lightweight_rejected() {
    let mut rig = Rig::new();

    rig.choose(MenuItem::Clone);
    rig.present(classic([0xDE, 0xAD, 0xBE, 0xEF]));
    rig.take_away();

    assert_eq!(rig.present(ultralight()), SystemState::Idle);
    assert_eq!(rig.screen(), "Error!|Need Classic 1K");
}

#[test]
fn test_clone_write_failure_reported() {
    let mut rig = Rig::new();
    let target = classic([0xDE, 0xAD, 0xBE, 0xEF]);

    rig.choose(MenuItem::Clone);
    rig.present(ultralight());
    rig.take_away();

    rig.radio.set_corrupt_writes(true);
    assert_eq!(rig.present(target), SystemState::Idle);
    assert_eq!(rig.screen(), "Clone Failed!|Write error");
}

#[test]
fn test_leaving_clone_flow_drops_source() {
    let mut rig = Rig::new();
    rig.choose(MenuItem::Clone);
    rig.present(ultralight());
    assert!(rig.controller.clone_source().is_some());

    rig.back();
    assert_eq!(rig.state(), SystemState::Idle);
    assert!(rig.controller.clone_source().is_none());
}

//! Detection, resolution and cloning against the simulated radio.

use std::time::{Duration, Instant};

use cardgate_core::CardIdentity;
use cardgate_core::constants::RESERVED_BLOCK;
use cardgate_hardware::mock::{MockNfc, SimCard};
use cardgate_rfid::{CardDetector, DetectorConfig, IdentityResolver, ReservedBlockStatus};

fn id(bytes: &[u8]) -> CardIdentity {
    CardIdentity::new(bytes).unwrap()
}

#[test]
fn test_cloned_target_authorizes_as_source_but_keeps_physical_uid() {
    let (mut radio, handle) = MockNfc::new();
    let resolver = IdentityResolver::default();
    let mut detector = CardDetector::new(DetectorConfig::default());
    let t0 = Instant::now();

    let source_uid = id(&[0x04, 0x12, 0x34, 0x56]);
    let target_uid = id(&[0xDE, 0xAD, 0xBE, 0xEF]);

    handle.present(source_uid);
    let raw = detector.poll(&mut radio, t0).unwrap();
    let source = resolver.resolve(&mut radio, raw);

    handle.remove();
    handle.present(target_uid);
    let raw = detector
        .poll(&mut radio, t0 + Duration::from_millis(100))
        .unwrap();
    let target = resolver.resolve(&mut radio, raw);
    assert_ne!(target.physical_uid(), source.physical_uid());

    resolver
        .write_cloned_uid(&mut radio, &target, &source.effective_identity())
        .unwrap();

    // Present the target again after a reset, as the controller does.
    detector.reset();
    let raw = detector
        .poll(&mut radio, t0 + Duration::from_millis(200))
        .unwrap();
    let rescanned = resolver.resolve(&mut radio, raw);

    assert_eq!(rescanned.physical_uid(), target_uid);
    assert_eq!(rescanned.effective_identity(), source_uid);
    assert!(!rescanned.suspected_blank_clone());
}

#[test]
fn test_magic_card_copying_uid_is_flagged() {
    let (mut radio, handle) = MockNfc::new();
    let resolver = IdentityResolver::default();

    // A blank magic card programmed with an enrolled card's UID.
    let copied = id(&[0x04, 0x12, 0x34, 0x56]);
    handle.add_card(SimCard::classic(copied).with_block(RESERVED_BLOCK, [0xFF; 16]));
    handle.present(copied);

    let raw = CardDetector::new(DetectorConfig::default())
        .poll(&mut radio, Instant::now())
        .unwrap();
    let card = resolver.resolve(&mut radio, raw);

    assert_eq!(card.effective_identity(), copied);
    assert_eq!(card.reserved(), ReservedBlockStatus::Blank);
    assert!(card.suspected_blank_clone());
}

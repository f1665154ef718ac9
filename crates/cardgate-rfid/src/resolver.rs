//! Card identity resolution and reserved-block writes.
//!
//! The resolver turns a raw detection into a [`ScannedCard`] by probing the
//! reserved block of classic cards, and implements the write side of the
//! protocol: planting an identity on a target card ("cloning"), formatting a
//! card, and generic verified block/page writes, single or multi-unit.
//!
//! Resolution never fails: a card whose block cannot be authenticated or read
//! simply resolves with [`ReservedBlockStatus::Unreadable`] and is identified
//! by its physical UID.

use cardgate_core::constants::{
    BLOCK_SIZE, DEFAULT_DATA_BLOCK, DEFAULT_DATA_PAGE, DEFAULT_KEY, PAGE_SIZE, RESERVED_BLOCK,
};
use cardgate_core::{CardClass, CardIdentity};
use cardgate_hardware::{KeyType, NfcDevice, RawCard};
use tracing::{debug, info, warn};

use crate::error::{Result, RfidError};
use crate::reserved::{self, ReservedBlockStatus};
use crate::scanned::ScannedCard;

/// Blocks 128 and up of a 4K card belong to the 16-block sectors.
const LARGE_SECTOR_START: u8 = 128;

/// Returns `true` for sector trailer blocks.
///
/// 1K cards and the first 32 sectors of a 4K card have four blocks per
/// sector; the last eight 4K sectors have sixteen. Page-based cards have no
/// trailers.
#[inline]
pub fn is_trailer_block(class: CardClass, block: u8) -> bool {
    let block = block as u16;
    match class {
        CardClass::ClassicLarge if block >= LARGE_SECTOR_START as u16 => (block + 1) % 16 == 0,
        CardClass::ClassicSmall | CardClass::ClassicLarge => (block + 1) % 4 == 0,
        CardClass::Lightweight | CardClass::Unknown => false,
    }
}

fn classic_block_count(class: CardClass) -> u16 {
    match class {
        CardClass::ClassicSmall => 64,
        CardClass::ClassicLarge => 256,
        CardClass::Lightweight | CardClass::Unknown => 0,
    }
}

/// Writable data blocks from `start` to the end of the card, in order.
/// Skips the manufacturer block and every trailer.
fn data_blocks_from(class: CardClass, start: u8) -> impl Iterator<Item = u8> {
    (start as u16..classic_block_count(class))
        .filter_map(|block| u8::try_from(block).ok())
        .filter(move |&block| block != 0 && !is_trailer_block(class, block))
}

/// Reads and writes the reserved identity block.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::MockNfc;
/// use cardgate_hardware::traits::NfcDevice;
/// use cardgate_rfid::IdentityResolver;
///
/// let (mut radio, handle) = MockNfc::new();
/// let resolver = IdentityResolver::default();
///
/// let target = CardIdentity::new(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
/// let source = CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap();
/// handle.present(target);
///
/// let raw = radio.detect(Duration::from_millis(50)).unwrap().unwrap();
/// let card = resolver.resolve(&mut radio, raw);
/// resolver.write_cloned_uid(&mut radio, &card, &source).unwrap();
///
/// let status = resolver.read_custom_sector(&mut radio, &card);
/// assert_eq!(status.cloned_identity(), Some(source));
/// ```
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    block: u8,
    key: [u8; 6],
    key_type: KeyType,
}

impl IdentityResolver {
    /// Resolver for a custom block and key.
    pub fn new(block: u8, key: [u8; 6], key_type: KeyType) -> Self {
        Self {
            block,
            key,
            key_type,
        }
    }

    /// Block holding the identity.
    pub fn block(&self) -> u8 {
        self.block
    }

    /// Probe a freshly detected card.
    pub fn resolve<N: NfcDevice>(&self, nfc: &mut N, raw: RawCard) -> ScannedCard {
        let status = self.read_reserved(nfc, &raw);
        let card = ScannedCard::builder(raw).reserved(status).build();

        debug!(
            uid = %card.physical_uid(),
            class = %card.card_class(),
            effective = %card.effective_identity(),
            reserved = ?card.reserved(),
            "Card resolved"
        );
        card
    }

    /// Re-read the reserved block of an already detected card.
    pub fn read_custom_sector<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
    ) -> ReservedBlockStatus {
        self.read_reserved(nfc, &card.raw())
    }

    fn read_reserved<N: NfcDevice>(&self, nfc: &mut N, raw: &RawCard) -> ReservedBlockStatus {
        if !raw.class.is_classic() {
            return ReservedBlockStatus::Unsupported;
        }

        if let Err(e) = nfc.authenticate_block(&raw.uid, self.block, self.key_type, &self.key) {
            debug!(uid = %raw.uid, block = self.block, error = %e, "Reserved block authentication failed");
            return ReservedBlockStatus::Unreadable;
        }

        match nfc.read_block(self.block) {
            Ok(data) => reserved::decode(&data),
            Err(e) => {
                debug!(uid = %raw.uid, block = self.block, error = %e, "Reserved block read failed");
                ReservedBlockStatus::Unreadable
            }
        }
    }

    /// Plant `identity` in the reserved block of `target`.
    ///
    /// Works on any classic card, enrolled or not. Success requires the
    /// write and a read-back comparison of the marker, length and identity
    /// bytes.
    ///
    /// # Errors
    ///
    /// - [`RfidError::UnsupportedCard`] if `target` is not a classic card
    /// - [`RfidError::Hardware`] on authentication or I/O failure
    /// - [`RfidError::VerificationFailed`] if the read-back differs
    pub fn write_cloned_uid<N: NfcDevice>(
        &self,
        nfc: &mut N,
        target: &ScannedCard,
        identity: &CardIdentity,
    ) -> Result<()> {
        let data = reserved::encode(identity);
        self.write_reserved(nfc, target, &data)?;

        info!(
            target = %target.physical_uid(),
            identity = %identity,
            "Identity written to reserved block"
        );
        Ok(())
    }

    /// Format the reserved block with the marker and no identity.
    pub fn initialize_card<N: NfcDevice>(&self, nfc: &mut N, card: &ScannedCard) -> Result<()> {
        self.write_reserved(nfc, card, &reserved::encode_unassigned())?;
        info!(uid = %card.physical_uid(), "Reserved block formatted");
        Ok(())
    }

    /// Returns `true` if the reserved block currently carries a valid identity.
    pub fn is_card_initialized<N: NfcDevice>(&self, nfc: &mut N, card: &ScannedCard) -> bool {
        self.read_custom_sector(nfc, card).cloned_identity().is_some()
    }

    fn write_reserved<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
        data: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        if !card.card_class().is_classic() {
            return Err(RfidError::UnsupportedCard {
                class: card.card_class(),
            });
        }

        let uid = card.physical_uid();
        self.authenticate(nfc, &uid, self.block)?;
        nfc.write_block(self.block, data)?;

        self.authenticate(nfc, &uid, self.block)?;
        let read_back = nfc.read_block(self.block)?;

        if !reserved::verify(data, &read_back) {
            warn!(uid = %uid, block = self.block, "Reserved block verification mismatch");
            return Err(RfidError::VerificationFailed { block: self.block });
        }
        Ok(())
    }

    /// Write and verify an arbitrary data block of a classic card.
    ///
    /// # Errors
    ///
    /// Refuses sector trailers ([`RfidError::TrailerBlock`]); block 0 is
    /// rejected by the card itself.
    pub fn write_classic_block<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
        block: u8,
        data: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        if !card.card_class().is_classic() {
            return Err(RfidError::UnsupportedCard {
                class: card.card_class(),
            });
        }
        if block != 0 && is_trailer_block(card.card_class(), block) {
            return Err(RfidError::TrailerBlock { block });
        }

        let uid = card.physical_uid();
        self.authenticate(nfc, &uid, block)?;
        nfc.write_block(block, data)?;

        self.authenticate(nfc, &uid, block)?;
        if nfc.read_block(block)? != *data {
            return Err(RfidError::VerificationFailed { block });
        }

        debug!(uid = %uid, block, "Block written");
        Ok(())
    }

    /// Write up to four bytes to a lightweight card page, zero padded, and
    /// verify by reading the page back.
    pub fn write_lightweight_page<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
        page: u8,
        data: &[u8],
    ) -> Result<()> {
        if card.card_class().is_classic() {
            return Err(RfidError::UnsupportedCard {
                class: card.card_class(),
            });
        }
        if data.len() > PAGE_SIZE {
            return Err(RfidError::PayloadTooLong {
                length: data.len(),
                max: PAGE_SIZE,
            });
        }

        let mut padded = [0u8; PAGE_SIZE];
        padded[..data.len()].copy_from_slice(data);

        nfc.write_page(page, &padded)?;
        if nfc.read_page(page)? != padded {
            return Err(RfidError::VerificationFailed { block: page });
        }

        debug!(uid = %card.physical_uid(), page, "Page written");
        Ok(())
    }

    /// Write `data` over consecutive data blocks of a classic card, starting
    /// at `start_block` and stepping over sector trailers. The last block is
    /// zero padded and every block is verified before the next is written.
    ///
    /// # Errors
    ///
    /// [`RfidError::PayloadTooLong`] if the data blocks left on the card
    /// cannot hold `data`; nothing is written in that case. A failure part
    /// way leaves the earlier blocks written.
    pub fn write_classic_bytes<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
        start_block: u8,
        data: &[u8],
    ) -> Result<()> {
        let class = card.card_class();
        if !class.is_classic() {
            return Err(RfidError::UnsupportedCard { class });
        }

        let needed = data.len().div_ceil(BLOCK_SIZE);
        let blocks: Vec<u8> = data_blocks_from(class, start_block).collect();
        if blocks.len() < needed {
            return Err(RfidError::PayloadTooLong {
                length: data.len(),
                max: blocks.len() * BLOCK_SIZE,
            });
        }

        for (&block, chunk) in blocks.iter().zip(data.chunks(BLOCK_SIZE)) {
            let mut padded = [0u8; BLOCK_SIZE];
            padded[..chunk.len()].copy_from_slice(chunk);
            self.write_classic_block(nfc, card, block, &padded)?;
        }

        debug!(uid = %card.physical_uid(), start_block, blocks = needed, "Data written");
        Ok(())
    }

    /// Write `data` over consecutive pages of a lightweight card starting at
    /// `start_page`, four bytes per page, each page verified.
    ///
    /// # Errors
    ///
    /// [`RfidError::PayloadTooLong`] if the pages would run past page 255.
    /// The card's own size limit surfaces as a hardware error.
    pub fn write_lightweight_bytes<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
        start_page: u8,
        data: &[u8],
    ) -> Result<()> {
        let class = card.card_class();
        if class.is_classic() {
            return Err(RfidError::UnsupportedCard { class });
        }

        let addressable = (u8::MAX as usize + 1 - start_page as usize) * PAGE_SIZE;
        if data.len() > addressable {
            return Err(RfidError::PayloadTooLong {
                length: data.len(),
                max: addressable,
            });
        }

        for (page, chunk) in (start_page..=u8::MAX).zip(data.chunks(PAGE_SIZE)) {
            self.write_lightweight_page(nfc, card, page, chunk)?;
        }

        debug!(
            uid = %card.physical_uid(),
            start_page,
            pages = data.len().div_ceil(PAGE_SIZE),
            "Data written"
        );
        Ok(())
    }

    /// Write `data` to whichever card is in the field, choosing block or page
    /// writes from its class.
    ///
    /// `start` is a block number on classic cards and a page number on
    /// lightweight ones. `None` selects [`DEFAULT_DATA_BLOCK`] (after the
    /// reserved block) or [`DEFAULT_DATA_PAGE`].
    pub fn write_data<N: NfcDevice>(
        &self,
        nfc: &mut N,
        card: &ScannedCard,
        start: Option<u8>,
        data: &[u8],
    ) -> Result<()> {
        match card.card_class() {
            CardClass::ClassicSmall | CardClass::ClassicLarge => {
                self.write_classic_bytes(nfc, card, start.unwrap_or(DEFAULT_DATA_BLOCK), data)
            }
            CardClass::Lightweight => {
                self.write_lightweight_bytes(nfc, card, start.unwrap_or(DEFAULT_DATA_PAGE), data)
            }
            class @ CardClass::Unknown => Err(RfidError::UnsupportedCard { class }),
        }
    }

    fn authenticate<N: NfcDevice>(&self, nfc: &mut N, uid: &CardIdentity, block: u8) -> Result<()> {
        nfc.authenticate_block(uid, block, self.key_type, &self.key)
            .map_err(RfidError::from)
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(RESERVED_BLOCK, DEFAULT_KEY, KeyType::A)
    }
}

//! Persistent allow-list of card identities.

use cardgate_core::CardIdentity;
use cardgate_core::constants::{
    MAX_STORED_CARDS, RECORD_STRIDE, STORAGE_COUNT_ADDR, STORAGE_MAGIC_ADDR, STORAGE_MAGIC_NUMBER,
};
use cardgate_hardware::ByteStorage;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::layout::{StoredCardRecord, decode_record, encode_record, record_addr, required_bytes};

/// Result of [`CardStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended at `index`.
    Added { index: usize },
    /// Already stored at `index`; nothing written.
    Duplicate { index: usize },
    /// Store at capacity; nothing written.
    Full,
}

impl AddOutcome {
    /// Returns `true` if the identity was appended.
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

/// Allow-list of up to [`MAX_STORED_CARDS`] identities in byte storage.
///
/// The live records always occupy `[0, count)`. The count is cached in
/// memory at open and kept authoritative by every mutation; record bytes are
/// always written before the count that makes them reachable.
///
/// # Examples
///
/// ```
/// use cardgate_core::CardIdentity;
/// use cardgate_hardware::mock::MemoryStorage;
/// use cardgate_storage::{AddOutcome, CardStore};
///
/// let mut store = CardStore::open(MemoryStorage::default()).unwrap();
/// let id = CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap();
///
/// assert_eq!(store.add(&id).unwrap(), AddOutcome::Added { index: 0 });
/// assert_eq!(store.add(&id).unwrap(), AddOutcome::Duplicate { index: 0 });
/// assert_eq!(store.find(&id).unwrap(), Some(0));
///
/// assert!(store.remove(&id).unwrap());
/// assert_eq!(store.count(), 0);
/// ```
#[derive(Debug)]
pub struct CardStore<S> {
    storage: S,
    count: usize,
    capacity: usize,
}

impl<S: ByteStorage> CardStore<S> {
    /// Open a store of the default capacity, formatting the device on first
    /// boot.
    ///
    /// # Errors
    ///
    /// Fails if the device is too small or cannot be read/written.
    pub fn open(storage: S) -> StorageResult<Self> {
        Self::with_capacity(storage, MAX_STORED_CARDS)
    }

    /// Open a store holding at most `capacity` records.
    pub fn with_capacity(storage: S, capacity: usize) -> StorageResult<Self> {
        if capacity > u8::MAX as usize {
            return Err(StorageError::Configuration(format!(
                "capacity {capacity} does not fit the count byte"
            )));
        }

        let required = required_bytes(capacity);
        if storage.len() < required {
            return Err(StorageError::DeviceTooSmall {
                size: storage.len(),
                required,
            });
        }

        let mut store = Self {
            storage,
            count: 0,
            capacity,
        };
        store.initialize()?;
        store.reload()?;
        Ok(store)
    }

    /// Format the device if no magic marker is present.
    ///
    /// Returns `true` when the device was formatted by this call. Idempotent
    /// on every later boot.
    pub fn initialize(&mut self) -> StorageResult<bool> {
        if self.storage.read_u16_be(STORAGE_MAGIC_ADDR)? == STORAGE_MAGIC_NUMBER {
            return Ok(false);
        }

        // Count first: a marker is only ever visible next to a valid count.
        self.storage.write_byte(STORAGE_COUNT_ADDR, 0)?;
        self.storage
            .write_u16_be(STORAGE_MAGIC_ADDR, STORAGE_MAGIC_NUMBER)?;
        self.count = 0;

        info!(capacity = self.capacity, "Card store formatted");
        Ok(true)
    }

    /// Re-read the persisted count into the cache.
    ///
    /// Only needed after the device was rewritten behind the store's back.
    pub fn reload(&mut self) -> StorageResult<usize> {
        let stored = self.storage.read_byte(STORAGE_COUNT_ADDR)? as usize;
        self.count = if stored > self.capacity {
            warn!(
                stored,
                capacity = self.capacity,
                "Stored card count exceeds capacity, clamping"
            );
            self.capacity
        } else {
            stored
        };

        debug!(count = self.count, "Card store loaded");
        Ok(self.count)
    }

    /// Number of stored cards.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Maximum number of cards.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Index of the first active record matching `identity` exactly.
    pub fn find(&self, identity: &CardIdentity) -> StorageResult<Option<usize>> {
        for index in 0..self.count {
            if let Some(record) = self.read_record(index)?
                && record.active
                && record.identity == *identity
            {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Returns `true` if `identity` is stored.
    pub fn contains(&self, identity: &CardIdentity) -> StorageResult<bool> {
        Ok(self.find(identity)?.is_some())
    }

    /// Append `identity`, rejecting duplicates and a full store.
    pub fn add(&mut self, identity: &CardIdentity) -> StorageResult<AddOutcome> {
        if let Some(index) = self.find(identity)? {
            debug!(identity = %identity, index, "Card already stored");
            return Ok(AddOutcome::Duplicate { index });
        }
        if self.is_full() {
            warn!(capacity = self.capacity, "Card store full");
            return Ok(AddOutcome::Full);
        }

        let index = self.count;
        let slot = encode_record(&StoredCardRecord::active(*identity));
        self.storage.write_all(record_addr(index), &slot)?;
        self.write_count(index + 1)?;

        info!(identity = %identity, index, count = self.count, "Card added");
        Ok(AddOutcome::Added { index })
    }

    /// Remove `identity`, shifting every later record down over the gap.
    ///
    /// Every live slot holding `identity` is dropped in the same pass, so a
    /// copy left behind by an interrupted earlier removal goes too.
    ///
    /// Returns `false` if the identity was not stored.
    pub fn remove(&mut self, identity: &CardIdentity) -> StorageResult<bool> {
        let mut slot = [0u8; RECORD_STRIDE];
        let mut kept = 0;
        let mut first_match = None;

        for index in 0..self.count {
            self.storage.read_into(record_addr(index), &mut slot)?;
            let matches = decode_record(&slot)
                .is_some_and(|record| record.active && record.identity == *identity);

            if matches {
                first_match.get_or_insert(index);
                continue;
            }
            if kept != index {
                self.storage.write_all(record_addr(kept), &slot)?;
            }
            kept += 1;
        }

        let Some(found) = first_match else {
            debug!(identity = %identity, "Card not stored, nothing to remove");
            return Ok(false);
        };

        let dropped = self.count - kept;
        if dropped > 1 {
            warn!(identity = %identity, copies = dropped, "Removed duplicate records");
        }
        self.write_count(kept)?;

        info!(identity = %identity, index = found, count = self.count, "Card removed");
        Ok(true)
    }

    /// Forget every card. Record bytes are left in place but unreachable.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.write_count(0)?;
        info!("Card store cleared");
        Ok(())
    }

    /// Record at `index` for display paging.
    ///
    /// `None` past the live range or for an invalid/inactive record.
    pub fn list(&self, index: usize) -> StorageResult<Option<StoredCardRecord>> {
        if index >= self.count {
            return Ok(None);
        }
        Ok(self.read_record(index)?.filter(|record| record.active))
    }

    /// Every valid active record with its index.
    pub fn records(&self) -> StorageResult<Vec<(usize, StoredCardRecord)>> {
        let mut records = Vec::with_capacity(self.count);
        for index in 0..self.count {
            if let Some(record) = self.list(index)? {
                records.push((index, record));
            }
        }
        Ok(records)
    }

    /// Underlying device.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Release the underlying device.
    pub fn into_inner(self) -> S {
        self.storage
    }

    fn read_record(&self, index: usize) -> StorageResult<Option<StoredCardRecord>> {
        let mut slot = [0u8; RECORD_STRIDE];
        self.storage.read_into(record_addr(index), &mut slot)?;

        let record = decode_record(&slot);
        if record.is_none() {
            debug!(index, length = slot[0], "Skipping invalid record");
        }
        Ok(record)
    }

    fn write_count(&mut self, count: usize) -> StorageResult<()> {
        self.storage.write_byte(STORAGE_COUNT_ADDR, count as u8)?;
        self.count = count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_hardware::mock::MemoryStorage;
    use cardgate_hardware::traits::ByteStorage;
    use rstest::rstest;

    fn id(bytes: &[u8]) -> CardIdentity {
        CardIdentity::new(bytes).unwrap()
    }

    fn numbered(n: usize) -> CardIdentity {
        id(&[0x04, (n >> 8) as u8, n as u8, 0xAA])
    }

    #[test]
    fn test_first_boot_formats_device() {
        let eeprom = MemoryStorage::default();
        let store = CardStore::open(eeprom.clone()).unwrap();

        assert_eq!(store.count(), 0);
        assert_eq!(store.capacity(), MAX_STORED_CARDS);
        assert_eq!(eeprom.read_u16_be(0).unwrap(), 0xABCD);
        assert_eq!(eeprom.read_byte(2).unwrap(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let eeprom = MemoryStorage::default();
        let mut store = CardStore::open(eeprom.clone()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();

        let writes = eeprom.write_count();
        assert!(!store.initialize().unwrap());
        assert_eq!(eeprom.write_count(), writes);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_add_and_find() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        let a = id(&[1, 2, 3, 4]);
        let b = id(&[4, 1, 2, 3, 4, 5, 6]);

        assert_eq!(store.add(&a).unwrap(), AddOutcome::Added { index: 0 });
        assert_eq!(store.add(&b).unwrap(), AddOutcome::Added { index: 1 });
        assert_eq!(store.find(&a).unwrap(), Some(0));
        assert_eq!(store.find(&b).unwrap(), Some(1));
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_find_requires_exact_length() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();
        assert_eq!(store.find(&id(&[1, 2, 3])).unwrap(), None);
        assert_eq!(store.find(&id(&[1, 2, 3, 4, 0])).unwrap(), None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        let a = id(&[1, 2, 3, 4]);
        store.add(&a).unwrap();

        let outcome = store.add(&a).unwrap();
        assert_eq!(outcome, AddOutcome::Duplicate { index: 0 });
        assert!(!outcome.is_added());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        for n in 0..MAX_STORED_CARDS {
            assert!(store.add(&numbered(n)).unwrap().is_added());
        }
        assert!(store.is_full());
        assert_eq!(store.add(&numbered(999)).unwrap(), AddOutcome::Full);
        assert_eq!(store.count(), MAX_STORED_CARDS);
    }

    #[test]
    fn test_remove_compacts() {
        let eeprom = MemoryStorage::default();
        let mut store = CardStore::open(eeprom.clone()).unwrap();
        for n in 0..4 {
            store.add(&numbered(n)).unwrap();
        }

        assert!(store.remove(&numbered(1)).unwrap());
        assert_eq!(store.count(), 3);
        assert_eq!(store.find(&numbered(1)).unwrap(), None);

        let remaining: Vec<_> = store
            .records()
            .unwrap()
            .into_iter()
            .map(|(_, r)| r.identity)
            .collect();
        assert_eq!(remaining, vec![numbered(0), numbered(2), numbered(3)]);
        assert_eq!(eeprom.read_byte(2).unwrap(), 3);
    }

    #[test]
    fn test_remove_after_interrupted_compaction() {
        let eeprom = MemoryStorage::default();
        let mut store = CardStore::open(eeprom.clone()).unwrap();
        let (a, b, c) = (id(&[1, 1, 1, 1]), id(&[2, 2, 2, 2]), id(&[3, 3, 3, 3]));
        for card in [a, b, c] {
            store.add(&card).unwrap();
        }

        // C is copied over B, then the count update fails.
        eeprom.fail_writes_after(Some(RECORD_STRIDE));
        assert!(store.remove(&b).is_err());
        assert_eq!(store.count(), 3);
        assert_eq!(store.list(1).unwrap().map(|r| r.identity), Some(c));
        assert_eq!(store.list(2).unwrap().map(|r| r.identity), Some(c));

        eeprom.fail_writes_after(None);
        assert!(store.remove(&c).unwrap());
        assert_eq!(store.find(&c).unwrap(), None);
        assert_eq!(store.find(&b).unwrap(), None);
        assert_eq!(store.count(), 1);
        assert_eq!(eeprom.read_byte(2).unwrap(), 1);

        let remaining: Vec<_> = store.records().unwrap().into_iter().map(|(_, r)| r.identity).collect();
        assert_eq!(remaining, vec![a]);
    }

    #[test]
    fn test_remove_missing() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();
        assert!(!store.remove(&id(&[9, 9, 9, 9])).unwrap());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_remove_last_record() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();
        assert!(store.remove(&id(&[1, 2, 3, 4])).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_makes_records_unreachable() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        let a = id(&[1, 2, 3, 4]);
        store.add(&a).unwrap();
        store.clear().unwrap();

        assert_eq!(store.count(), 0);
        assert_eq!(store.find(&a).unwrap(), None);
        assert_eq!(store.list(0).unwrap(), None);

        // Re-adding lands at index 0 again.
        assert_eq!(store.add(&a).unwrap(), AddOutcome::Added { index: 0 });
    }

    #[test]
    fn test_persists_across_reopen() {
        let eeprom = MemoryStorage::default();
        {
            let mut store = CardStore::open(eeprom.clone()).unwrap();
            store.add(&id(&[1, 2, 3, 4])).unwrap();
            store.add(&id(&[5, 6, 7, 8])).unwrap();
        }

        let store = CardStore::open(eeprom).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.find(&id(&[5, 6, 7, 8])).unwrap(), Some(1));
    }

    #[test]
    fn test_count_above_capacity_is_clamped() {
        let eeprom = MemoryStorage::default();
        CardStore::open(eeprom.clone()).unwrap();
        eeprom.poke(2, 200);

        let store = CardStore::open(eeprom).unwrap();
        assert_eq!(store.count(), MAX_STORED_CARDS);
    }

    #[rstest]
    #[case::zero_length(0)]
    #[case::too_long(8)]
    #[case::erased(0xFF)]
    fn test_corrupt_record_skipped(#[case] length: u8) {
        let eeprom = MemoryStorage::default();
        let mut store = CardStore::open(eeprom.clone()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();
        store.add(&id(&[5, 6, 7, 8])).unwrap();

        eeprom.poke(record_addr(0) as usize, length);

        assert_eq!(store.list(0).unwrap(), None);
        assert_eq!(store.find(&id(&[1, 2, 3, 4])).unwrap(), None);
        assert_eq!(store.find(&id(&[5, 6, 7, 8])).unwrap(), Some(1));
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[test]
    fn test_inactive_record_skipped() {
        let eeprom = MemoryStorage::default();
        let mut store = CardStore::open(eeprom.clone()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();
        eeprom.poke(record_addr(0) as usize + 1, 0);

        assert_eq!(store.find(&id(&[1, 2, 3, 4])).unwrap(), None);
        assert_eq!(store.list(0).unwrap(), None);
    }

    #[test]
    fn test_list_bounds() {
        let mut store = CardStore::open(MemoryStorage::default()).unwrap();
        store.add(&id(&[1, 2, 3, 4])).unwrap();
        assert!(store.list(0).unwrap().is_some());
        assert!(store.list(1).unwrap().is_none());
    }

    #[test]
    fn test_failed_record_write_leaves_count() {
        let eeprom = MemoryStorage::default();
        let mut store = CardStore::open(eeprom.clone()).unwrap();

        // Record write fails midway: count must not advance.
        eeprom.fail_writes_after(Some(3));
        assert!(store.add(&id(&[1, 2, 3, 4])).is_err());
        assert_eq!(store.count(), 0);

        eeprom.fail_writes_after(None);
        let reopened = CardStore::open(eeprom).unwrap();
        assert_eq!(reopened.count(), 0);
    }

    #[test]
    fn test_device_too_small() {
        let result = CardStore::open(MemoryStorage::new(100));
        assert!(matches!(
            result,
            Err(StorageError::DeviceTooSmall { size: 100, required: 364 })
        ));
    }

    #[test]
    fn test_small_capacity() {
        let mut store = CardStore::with_capacity(MemoryStorage::new(64), 2).unwrap();
        store.add(&id(&[1])).unwrap();
        store.add(&id(&[2])).unwrap();
        assert_eq!(store.add(&id(&[3])).unwrap(), AddOutcome::Full);
    }

    #[test]
    fn test_capacity_must_fit_count_byte() {
        let result = CardStore::with_capacity(MemoryStorage::new(4096), 300);
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }
}

//! Persistent storage over RocksDB.
//!
//! Two column families back the store. The data family holds serialized
//! payloads under a composite key that orders rows newest first. The index
//! family maps each id to its current composite key, or to an empty row
//! once the id has been deleted. Deleted ids stay in the index as
//! tombstones so the id allocator never hands them out again.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use rocksdb::{ColumnFamily, IteratorMode, WriteBatch, DB};

use crate::error::StoreError;

/// Column family holding payload bytes under composite keys.
pub const DATA_CF: &str = "data";

/// Column family mapping ids to composite keys.
pub const INDEX_CF: &str = "index";

/// Index row marking an id as deleted.
const TOMBSTONE: [u8; 0] = [];

/// Occupancy of an id in the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdState {
    /// The id has never been stored.
    Vacant,
    /// The id names a retrievable row.
    Live,
    /// The id was stored and later deleted. It will not be allocated again,
    /// but an explicit write may re-occupy it.
    Tombstone,
}

/// A handle to one on-disk store.
///
/// All methods take `&self`. Reads go straight to RocksDB; writes serialize
/// on an internal lock so the index and data families never disagree.
#[derive(Debug)]
pub struct Store {
    db: DB,
    highest_id: AtomicU64,
    /// Serializes index read-modify-write cycles. Two unserialized writers
    /// racing on one id could both read the same prior composite key and
    /// strand the loser's data row.
    write_lock: Mutex<()>,
}

impl Store {
    /// Opens the store at `path`, creating it and its column families as
    /// needed, and recovers the id watermark from the index.
    ///
    /// # Errors
    ///
    /// Fails when RocksDB cannot open the database or an existing index row
    /// does not parse.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let db = DB::open_cf(&opts, path, [DATA_CF, INDEX_CF])?;

        let store = Self {
            db,
            highest_id: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        };
        store.recover_highest_id()?;
        Ok(store)
    }

    /// Hands out the next unused id. Allocation only moves forward, so ids
    /// lost to failed writes leave gaps rather than collisions.
    pub fn allocate_id(&self) -> u64 {
        self.highest_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reports how the index currently classifies `id`.
    ///
    /// # Errors
    ///
    /// Fails when the index cannot be read.
    pub fn id_state(&self, id: u64) -> Result<IdState, StoreError> {
        let index = self.index_cf()?;
        Ok(match self.db.get_pinned_cf(index, encode_id_key(id))? {
            None => IdState::Vacant,
            Some(row) if row.is_empty() => IdState::Tombstone,
            Some(_) => IdState::Live,
        })
    }

    /// Stores `payload` under `id`, replacing any previous row for the same
    /// id in one atomic batch.
    ///
    /// # Errors
    ///
    /// Fails when the index cannot be read or the batch cannot be written.
    pub fn put(&self, id: u64, timestamp_micros: u64, payload: &[u8]) -> Result<(), StoreError> {
        let data = self.data_cf()?;
        let index = self.index_cf()?;
        let id_key = encode_id_key(id);
        let composite = encode_composite_key(timestamp_micros, id);

        // The prior-key lookup and the batch must happen under one lock;
        // a racing writer that read the same prior key would leave the
        // losing data row behind.
        let guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut batch = WriteBatch::default();
        if let Some(previous) = self.db.get_pinned_cf(index, id_key)? {
            if !previous.is_empty() {
                batch.delete_cf(data, &previous);
            }
        }
        batch.put_cf(data, composite, payload);
        batch.put_cf(index, id_key, composite);
        self.db.write(batch)?;
        drop(guard);

        let _previous = self.highest_id.fetch_max(id, Ordering::SeqCst);
        Ok(())
    }

    /// Fetches the payload stored under `id`. `None` when the id is vacant
    /// or tombstoned.
    ///
    /// # Errors
    ///
    /// Fails when either column family cannot be read, or when the index
    /// points at a data row that is gone.
    pub fn get(&self, id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        let index = self.index_cf()?;
        let data = self.data_cf()?;

        // Both lookups read one point-in-time view. Writers replace the
        // data row and the index row in a single batch, so reading them at
        // different sequence numbers could catch an overwrite halfway.
        let snapshot = self.db.snapshot();
        let Some(composite) = snapshot.get_pinned_cf(index, encode_id_key(id))? else {
            return Ok(None);
        };
        if composite.is_empty() {
            return Ok(None);
        }

        match snapshot.get_cf(data, &composite)? {
            Some(payload) => Ok(Some(payload)),
            None => Err(StoreError::Dangling(id)),
        }
    }

    /// Deletes the row under `id`, leaving a tombstone in the index.
    /// Returns whether a live row was actually removed.
    ///
    /// # Errors
    ///
    /// Fails when the index cannot be read or the batch cannot be written.
    pub fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let index = self.index_cf()?;
        let id_key = encode_id_key(id);

        let guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(composite) = self.db.get_pinned_cf(index, id_key)? else {
            return Ok(false);
        };
        if composite.is_empty() {
            return Ok(false);
        }

        let data = self.data_cf()?;
        let mut batch = WriteBatch::default();
        batch.delete_cf(data, &composite);
        batch.put_cf(index, id_key, TOMBSTONE);
        self.db.write(batch)?;
        drop(guard);
        Ok(true)
    }

    /// Returns up to `limit` live rows, newest first, as `(id, payload)`
    /// pairs. Rows written with a later timestamp come first; ties on the
    /// timestamp fall back to id order.
    ///
    /// # Errors
    ///
    /// Fails when the data family cannot be iterated or a stored key does
    /// not parse.
    pub fn scan_newest(&self, limit: usize) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let data = self.data_cf()?;
        let mut rows = Vec::new();
        for row in self.db.iterator_cf(data, IteratorMode::Start) {
            if rows.len() == limit {
                break;
            }
            let (key, payload) = row?;
            let (_timestamp, id) = decode_composite_key(&key)?;
            rows.push((id, payload.into_vec()));
        }
        Ok(rows)
    }

    /// Seeds the watermark with the highest id the index has ever seen,
    /// tombstones included. Index keys are big-endian, so the last key is
    /// the numeric maximum.
    fn recover_highest_id(&self) -> Result<(), StoreError> {
        let index = self.index_cf()?;
        if let Some(row) = self.db.iterator_cf(index, IteratorMode::End).next() {
            let (key, _composite) = row?;
            self.highest_id
                .store(decode_id_key(&key)?, Ordering::SeqCst);
        }
        Ok(())
    }

    fn data_cf(&self) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(DATA_CF)
            .ok_or(StoreError::ColumnFamily(DATA_CF))
    }

    fn index_cf(&self) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(INDEX_CF)
            .ok_or(StoreError::ColumnFamily(INDEX_CF))
    }
}

/// Builds the data-family key for a row. The timestamp is stored inverted
/// so that RocksDB's ascending key order visits newer rows first.
fn encode_composite_key(timestamp_micros: u64, id: u64) -> [u8; 16] {
    let mut key = [0; 16];
    key[..8].copy_from_slice(&(u64::MAX - timestamp_micros).to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn decode_composite_key(key: &[u8]) -> Result<(u64, u64), StoreError> {
    if key.len() != 16 {
        return Err(StoreError::MalformedKey {
            kind: "composite",
            len: key.len(),
        });
    }
    let mut inverted = [0; 8];
    let mut id = [0; 8];
    inverted.copy_from_slice(&key[..8]);
    id.copy_from_slice(&key[8..]);
    Ok((
        u64::MAX - u64::from_be_bytes(inverted),
        u64::from_be_bytes(id),
    ))
}

const fn encode_id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn decode_id_key(key: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| StoreError::MalformedKey {
        kind: "index",
        len: key.len(),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

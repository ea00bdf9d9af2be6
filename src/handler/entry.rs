//! Handler for the current entry schema.

use std::sync::Arc;

use prost::Message as _;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::handler::{now_micros, CreatePolicy};
use crate::proto::entry::{
    request::Target, Entry, OperationStatus, OperationType, Request, Response,
};
use crate::store::{IdState, Store};

/// Serves both lanes of the current wire generation.
///
/// Ingest frames are applied without any reply; frames that do not decode
/// or cannot be applied are dropped. Query frames always produce exactly
/// one [`Response`], whatever the outcome.
#[must_use]
#[derive(Debug)]
pub struct EntryHandler {
    store: Arc<Store>,
    policy: CreatePolicy,
}

/// Why an entry could not be persisted.
enum StoreFailure {
    AlreadyExists(u64),
    Store(StoreError),
}

impl From<StoreError> for StoreFailure {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl EntryHandler {
    /// Creates a handler over `store` with the given CREATE policy.
    #[inline]
    pub fn new(store: Arc<Store>, policy: CreatePolicy) -> Self {
        Self { store, policy }
    }

    /// Applies one ingest-lane frame. Never replies and never fails; an
    /// unusable frame is logged at debug level and forgotten.
    pub fn ingest(&self, frame: &[u8]) {
        match Entry::decode(frame) {
            Ok(entry) => match self.store_entry(entry) {
                Ok((entry, _allocated)) => debug!(id = entry.id, "ingested entry"),
                Err(StoreFailure::AlreadyExists(id)) => {
                    debug!(id, "dropped ingest frame for an id that is already live");
                }
                Err(StoreFailure::Store(err)) => {
                    error!(error = %err, "dropped ingest frame after a storage failure");
                }
            },
            Err(err) => debug!(error = %err, "dropped undecodable ingest frame"),
        }
    }

    /// Serves one query-lane frame, producing exactly one reply frame.
    /// A frame that does not decode as a [`Request`] is answered with
    /// `UnknownOperation` rather than silence.
    pub fn execute_frame(&self, frame: &[u8]) -> Vec<u8> {
        let response = match Request::decode(frame) {
            Ok(request) => self.execute(request),
            Err(err) => {
                debug!(error = %err, "query frame did not decode");
                unknown_operation("request did not decode")
            }
        };
        response.encode_to_vec()
    }

    /// Executes one decoded request.
    pub fn execute(&self, request: Request) -> Response {
        match (request.op(), request.target) {
            (OperationType::Create, Some(Target::Entry(entry))) => self.create(entry),
            (OperationType::Read, Some(Target::Id(id))) => self.read(id),
            (OperationType::Delete, Some(Target::Id(id))) => self.delete(id),
            (op, _) => unknown_operation(format!(
                "operation {} does not match its target",
                op.as_str_name()
            )),
        }
    }

    fn create(&self, entry: Entry) -> Response {
        match self.store_entry(entry) {
            // The stored entry is echoed back only when the caller left
            // the id unassigned and needs to learn it.
            Ok((entry, allocated)) => Response {
                status: OperationStatus::Ok as i32,
                message: String::new(),
                entry: allocated.then_some(entry),
            },
            Err(StoreFailure::AlreadyExists(id)) => Response {
                status: OperationStatus::AlreadyExists as i32,
                message: format!("entry {id} already exists"),
                entry: None,
            },
            Err(StoreFailure::Store(err)) => internal(&err),
        }
    }

    fn read(&self, id: u64) -> Response {
        match self.store.get(id) {
            Ok(Some(payload)) => match Entry::decode(payload.as_slice()) {
                Ok(entry) => Response {
                    status: OperationStatus::Ok as i32,
                    message: String::new(),
                    entry: Some(entry),
                },
                Err(source) => internal(&StoreError::Corrupt { id, source }),
            },
            Ok(None) => not_found(id),
            Err(err) => internal(&err),
        }
    }

    fn delete(&self, id: u64) -> Response {
        match self.store.delete(id) {
            Ok(true) => Response {
                status: OperationStatus::Ok as i32,
                message: String::new(),
                entry: None,
            },
            Ok(false) => not_found(id),
            Err(err) => internal(&err),
        }
    }

    /// Stamps and persists one entry, allocating an id when the caller left
    /// it at zero. Returns the stored entry and whether the id was
    /// allocated here.
    fn store_entry(&self, mut entry: Entry) -> Result<(Entry, bool), StoreFailure> {
        let allocated = entry.id == 0;
        if allocated {
            entry.id = self.store.allocate_id();
        } else if self.policy == CreatePolicy::Reject
            && self.store.id_state(entry.id)? == IdState::Live
        {
            return Err(StoreFailure::AlreadyExists(entry.id));
        }

        // The server's clock is authoritative; whatever the client sent in
        // created_at is discarded.
        let now = now_micros();
        entry.created_at = Some(timestamp_from_micros(now));

        let payload = entry.encode_to_vec();
        self.store.put(entry.id, now, &payload)?;
        Ok((entry, allocated))
    }
}

fn timestamp_from_micros(micros: u64) -> prost_types::Timestamp {
    let seconds = i64::try_from(micros / 1_000_000).unwrap_or(i64::MAX);
    let nanos = i32::try_from((micros % 1_000_000) * 1_000).unwrap_or(0);
    prost_types::Timestamp { seconds, nanos }
}

fn not_found(id: u64) -> Response {
    Response {
        status: OperationStatus::NotFound as i32,
        message: format!("no entry with id {id}"),
        entry: None,
    }
}

fn internal(err: &StoreError) -> Response {
    error!(error = %err, "operation failed internally");
    Response {
        status: OperationStatus::InternalError as i32,
        message: err.to_string(),
        entry: None,
    }
}

fn unknown_operation(message: impl Into<String>) -> Response {
    Response {
        status: OperationStatus::UnknownOperation as i32,
        message: message.into(),
        entry: None,
    }
}

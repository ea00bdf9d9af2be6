//! Handler for the legacy typed-object schema.

use std::sync::Arc;

use prost::Message as _;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::handler::now_micros;
use crate::proto::object::{
    regista_object::Data, regista_request::Payload, ObjectType, RegistaObject, RegistaRequest,
    StatusToken,
};
use crate::store::Store;

/// Serves both lanes of the legacy wire generation.
///
/// Query replies are ASCII status tokens, except for a successful fetch,
/// which replies with the serialized object itself. Writes always
/// overwrite; the legacy token vocabulary has no way to report a rejected
/// duplicate, so no create policy applies here.
#[must_use]
#[derive(Debug)]
pub struct ObjectHandler {
    store: Arc<Store>,
}

/// Why an object could not be persisted.
enum ObjectFailure {
    TypeMismatch,
    Store(StoreError),
}

impl From<StoreError> for ObjectFailure {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl ObjectHandler {
    /// Creates a handler over `store`.
    #[inline]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Applies one ingest-lane frame. Never replies and never fails; an
    /// unusable frame is logged at debug level and forgotten.
    pub fn ingest(&self, frame: &[u8]) {
        match RegistaObject::decode(frame) {
            Ok(object) => match self.store_object(object) {
                Ok(id) => debug!(id, "ingested object"),
                Err(ObjectFailure::TypeMismatch) => {
                    debug!("dropped ingest frame with an incoherent type");
                }
                Err(ObjectFailure::Store(err)) => {
                    error!(error = %err, "dropped ingest frame after a storage failure");
                }
            },
            Err(err) => debug!(error = %err, "dropped undecodable ingest frame"),
        }
    }

    /// Serves one query-lane frame, producing exactly one reply frame.
    pub fn execute_frame(&self, frame: &[u8]) -> Vec<u8> {
        let request = match RegistaRequest::decode(frame) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "query frame did not decode");
                return token(StatusToken::UnknownCmd);
            }
        };
        match request.payload {
            Some(Payload::Store(object)) => match self.store_object(object) {
                Ok(_id) => token(StatusToken::Ok),
                Err(ObjectFailure::TypeMismatch) => token(StatusToken::TypeMismatch),
                Err(ObjectFailure::Store(err)) => internal(&err),
            },
            Some(Payload::FetchId(id)) => match self.store.get(id) {
                // The stored bytes are already a serialized object.
                Ok(Some(payload)) => payload,
                Ok(None) => token(StatusToken::NotFound),
                Err(err) => internal(&err),
            },
            Some(Payload::DeleteId(id)) => match self.store.delete(id) {
                Ok(true) => token(StatusToken::Ok),
                Ok(false) => token(StatusToken::NotFound),
                Err(err) => internal(&err),
            },
            None => token(StatusToken::UnknownCmd),
        }
    }

    /// Validates, stamps, and persists one object, allocating an id when
    /// the caller left it at zero.
    fn store_object(&self, mut object: RegistaObject) -> Result<u64, ObjectFailure> {
        validate_coherence(&object)?;
        if object.id == 0 {
            object.id = self.store.allocate_id();
        }

        let now = now_micros();
        object.timestamp = i64::try_from(now).unwrap_or(i64::MAX);

        let payload = object.encode_to_vec();
        self.store.put(object.id, now, &payload)?;
        Ok(object.id)
    }
}

/// Checks that the declared type and the payload member agree. An
/// out-of-range type tag and an absent payload both fail; neither has a
/// coherent interpretation.
fn validate_coherence(object: &RegistaObject) -> Result<(), ObjectFailure> {
    let Ok(declared) = ObjectType::try_from(object.object_type) else {
        return Err(ObjectFailure::TypeMismatch);
    };
    let coherent = matches!(
        (declared, &object.data),
        (ObjectType::String | ObjectType::Json, Some(Data::Blob(_)))
            | (ObjectType::List, Some(Data::List(_)))
            | (ObjectType::Hash, Some(Data::Hash(_)))
            | (ObjectType::Vector, Some(Data::Vector(_)))
    );
    if coherent {
        Ok(())
    } else {
        Err(ObjectFailure::TypeMismatch)
    }
}

fn token(token: StatusToken) -> Vec<u8> {
    token.as_str().as_bytes().to_vec()
}

fn internal(err: &StoreError) -> Vec<u8> {
    error!(error = %err, "operation failed internally");
    token(StatusToken::InternalError)
}

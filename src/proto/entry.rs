//! Current-generation wire messages.
//!
//! The envelope is [`Entry`]; its payload is [`EntryValue`], a oneof with
//! exactly one kind populated at a time. The query lane exchanges one
//! [`Request`] for exactly one [`Response`].

use std::collections::HashMap;

/// A single value with at most one kind populated.
///
/// An `EntryValue` whose `kind` is `None` is a deliberate "absent" value,
/// not an error; decoders must surface it as such rather than substituting
/// a default scalar.
#[derive(Clone, PartialEq, prost::Message)]
pub struct EntryValue {
    /// The active member of the union, if any.
    #[prost(
        oneof = "entry_value::Kind",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11"
    )]
    pub kind: Option<entry_value::Kind>,
}

/// Nested types for [`EntryValue`].
pub mod entry_value {
    /// The closed set of value kinds an entry can carry.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        /// UTF-8 string.
        #[prost(string, tag = "1")]
        StringValue(String),
        /// Double-precision float.
        #[prost(double, tag = "2")]
        DoubleValue(f64),
        /// 64-bit signed integer.
        #[prost(int64, tag = "3")]
        IntValue(i64),
        /// Boolean.
        #[prost(bool, tag = "4")]
        BoolValue(bool),
        /// Ordered list of strings.
        #[prost(message, tag = "5")]
        StringList(super::StringList),
        /// Ordered list of doubles.
        #[prost(message, tag = "6")]
        DoubleList(super::DoubleList),
        /// Ordered list of 64-bit signed integers.
        #[prost(message, tag = "7")]
        IntList(super::IntList),
        /// Ordered list of booleans.
        #[prost(message, tag = "8")]
        BoolList(super::BoolList),
        /// String-to-string mapping.
        #[prost(message, tag = "9")]
        StringMap(super::StringMap),
        /// Arbitrary JSON-like document. Numbers are carried at double
        /// precision; there is no integer kind inside a document.
        #[prost(message, tag = "10")]
        JsonValue(prost_types::Struct),
        /// Opaque byte blob.
        #[prost(bytes = "vec", tag = "11")]
        BytesValue(Vec<u8>),
    }
}

/// Wrapper for a repeated string field, so an empty list is still tagged.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StringList {
    /// The list elements in order.
    #[prost(string, repeated, tag = "1")]
    pub values: Vec<String>,
}

/// Wrapper for a repeated double field.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DoubleList {
    /// The list elements in order.
    #[prost(double, repeated, tag = "1")]
    pub values: Vec<f64>,
}

/// Wrapper for a repeated int64 field.
#[derive(Clone, PartialEq, prost::Message)]
pub struct IntList {
    /// The list elements in order.
    #[prost(int64, repeated, tag = "1")]
    pub values: Vec<i64>,
}

/// Wrapper for a repeated bool field.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BoolList {
    /// The list elements in order.
    #[prost(bool, repeated, tag = "1")]
    pub values: Vec<bool>,
}

/// Wrapper for a string-to-string map field, so an empty map is still tagged.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StringMap {
    /// The map entries. Insertion order is not preserved on the wire.
    #[prost(map = "string, string", tag = "1")]
    pub values: HashMap<String, String>,
}

/// The envelope submitted on either lane and returned by successful reads.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Entry {
    /// Identifier of the entry. Zero means "unassigned"; the server must
    /// allocate a fresh id at ingestion.
    #[prost(uint64, tag = "1")]
    pub id: u64,
    /// Optional annotations. An empty map is omitted from the wire entirely
    /// (proto3 emits nothing for empty maps), which keeps "no metadata
    /// supplied" distinguishable from explicitly-cleared metadata.
    #[prost(map = "string, string", tag = "2")]
    pub metadata: HashMap<String, String>,
    /// The payload. Absent data and data with no kind set both decode as an
    /// absent value.
    #[prost(message, optional, tag = "3")]
    pub data: Option<EntryValue>,
    /// Stamped by the server at ingestion; anything a client sets here is
    /// overwritten.
    #[prost(message, optional, tag = "4")]
    pub created_at: Option<prost_types::Timestamp>,
}

/// The operation a [`Request`] asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationType {
    /// No operation given; always answered with `UnknownOperation`.
    Unspecified = 0,
    /// Persist the request's entry.
    Create = 1,
    /// Look up an entry by id.
    Read = 2,
    /// Tombstone an entry by id.
    Delete = 3,
}

impl OperationType {
    /// String form of the enum value, matching the schema's naming.
    pub const fn as_str_name(self) -> &'static str {
        match self {
            Self::Unspecified => "OP_UNSPECIFIED",
            Self::Create => "OP_CREATE",
            Self::Read => "OP_READ",
            Self::Delete => "OP_DELETE",
        }
    }
}

/// Outcome of an operation, closed and exhaustively matchable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    /// Never sent; the zero value decodes here if a peer is misbehaving.
    Unspecified = 0,
    /// The operation succeeded.
    Ok = 1,
    /// The id does not name a live entry.
    NotFound = 2,
    /// A typed payload did not match its declared type.
    TypeMismatch = 3,
    /// The server failed internally; the entry state is unchanged unless the
    /// diagnostic message says otherwise.
    InternalError = 4,
    /// The request did not name a known operation, or its target did not fit
    /// the operation.
    UnknownOperation = 5,
    /// CREATE named an id that is already live and the server is configured
    /// to reject rather than overwrite.
    AlreadyExists = 6,
}

impl OperationStatus {
    /// String form of the enum value, matching the schema's naming.
    pub const fn as_str_name(self) -> &'static str {
        match self {
            Self::Unspecified => "STATUS_UNSPECIFIED",
            Self::Ok => "STATUS_OK",
            Self::NotFound => "STATUS_NOT_FOUND",
            Self::TypeMismatch => "STATUS_TYPE_MISMATCH",
            Self::InternalError => "STATUS_INTERNAL_ERROR",
            Self::UnknownOperation => "STATUS_UNKNOWN_OPERATION",
            Self::AlreadyExists => "STATUS_ALREADY_EXISTS",
        }
    }
}

/// One query-lane request. Exactly one is outstanding per connection.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Request {
    /// Which operation to perform.
    #[prost(enumeration = "OperationType", tag = "1")]
    pub op: i32,
    /// The operation's target: a full entry for CREATE, a bare id for
    /// READ and DELETE.
    #[prost(oneof = "request::Target", tags = "2, 3")]
    pub target: Option<request::Target>,
}

/// Nested types for [`Request`].
pub mod request {
    /// What a request operates on.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Target {
        /// The entry to persist (CREATE only).
        #[prost(message, tag = "2")]
        Entry(super::Entry),
        /// The id to look up or tombstone (READ and DELETE).
        #[prost(uint64, tag = "3")]
        Id(u64),
    }
}

impl Request {
    /// The request's operation, or `Unspecified` for an out-of-range value.
    pub fn op(&self) -> OperationType {
        OperationType::try_from(self.op).unwrap_or(OperationType::Unspecified)
    }
}

/// The single reply to a [`Request`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct Response {
    /// Outcome of the operation.
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub status: i32,
    /// Optional human-readable diagnostic.
    #[prost(string, tag = "2")]
    pub message: String,
    /// The stored entry: present on a successful READ, and on CREATE when
    /// the server allocated the id.
    #[prost(message, optional, tag = "3")]
    pub entry: Option<Entry>,
}

impl Response {
    /// The response's status, or `Unspecified` for an out-of-range value.
    pub fn status(&self) -> OperationStatus {
        OperationStatus::try_from(self.status).unwrap_or(OperationStatus::Unspecified)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use prost::Message as _;

    #[test]
    fn unknown_enum_values_fall_back_to_unspecified() {
        let request = Request {
            op: 42,
            target: None,
        };
        assert_eq!(request.op(), OperationType::Unspecified);

        let response = Response {
            status: -3,
            message: String::new(),
            entry: None,
        };
        assert_eq!(response.status(), OperationStatus::Unspecified);
    }

    #[test]
    fn default_entry_encodes_to_nothing() {
        // Every field is at its proto3 default, so the wire form is empty.
        let entry = Entry {
            id: 0,
            metadata: HashMap::new(),
            data: None,
            created_at: None,
        };
        assert!(entry.encode_to_vec().is_empty());
    }

    #[test]
    fn request_round_trips_through_bytes() {
        let request = Request {
            op: OperationType::Read as i32,
            target: Some(request::Target::Id(77)),
        };
        let bytes = request.encode_to_vec();
        let decoded = Request::decode(bytes.as_slice()).expect("valid bytes");
        assert_eq!(decoded, request);
        assert_eq!(decoded.op(), OperationType::Read);
    }
}

//! Legacy-generation wire messages.
//!
//! Deployments that predate [`super::entry`] speak typed objects on the
//! ingest lane and a store/fetch/delete oneof on the query lane. Error
//! replies on that lane are bare ASCII tokens rather than structured
//! messages; a successful fetch replies with the serialized object itself.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Declared type of a [`RegistaObject`]. The declaration must cohere with
/// the payload member actually set, or the object is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ObjectType {
    /// UTF-8 or opaque bytes in `blob`.
    String = 0,
    /// Byte-string elements in `list`.
    List = 1,
    /// String-keyed byte-string fields in `hash`.
    Hash = 2,
    /// A serialized JSON document in `blob`.
    Json = 3,
    /// Packed floats in `vector`.
    Vector = 4,
}

/// Ordered byte-string elements.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListValue {
    /// The list elements in order.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub elements: Vec<Vec<u8>>,
}

/// String-keyed byte-string fields.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MapValue {
    /// The map entries.
    #[prost(map = "string, bytes", tag = "1")]
    pub fields: HashMap<String, Vec<u8>>,
}

/// Packed single-precision floats, used for embedding vectors.
#[derive(Clone, PartialEq, prost::Message)]
pub struct VectorValue {
    /// The vector components in order.
    #[prost(float, repeated, tag = "1")]
    pub elements: Vec<f32>,
}

/// The legacy envelope: a typed object with a declared type and a payload
/// member that must match it.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RegistaObject {
    /// Identifier. Zero asks the server to allocate one.
    #[prost(uint64, tag = "1")]
    pub id: u64,
    /// Declared type; validated against the `data` member on arrival.
    #[prost(enumeration = "ObjectType", tag = "2")]
    pub object_type: i32,
    /// Microseconds since the Unix epoch, stamped by the server.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    /// The payload member. Which member is set must agree with
    /// `object_type`.
    #[prost(oneof = "regista_object::Data", tags = "4, 5, 6, 7")]
    pub data: Option<regista_object::Data>,
}

/// Nested types for [`RegistaObject`].
pub mod regista_object {
    /// The payload members an object can carry.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        /// Raw bytes, used by the STRING and JSON types.
        #[prost(bytes = "vec", tag = "4")]
        Blob(Vec<u8>),
        /// List payload, used by the LIST type.
        #[prost(message, tag = "5")]
        List(super::ListValue),
        /// Map payload, used by the HASH type.
        #[prost(message, tag = "6")]
        Hash(super::MapValue),
        /// Vector payload, used by the VECTOR type.
        #[prost(message, tag = "7")]
        Vector(super::VectorValue),
    }
}

/// One legacy query-lane request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RegistaRequest {
    /// The command and its argument in one member.
    #[prost(oneof = "regista_request::Payload", tags = "1, 2, 3")]
    pub payload: Option<regista_request::Payload>,
}

/// Nested types for [`RegistaRequest`].
pub mod regista_request {
    /// The legacy command set.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        /// Persist the object.
        #[prost(message, tag = "1")]
        Store(super::RegistaObject),
        /// Fetch the object with this id.
        #[prost(uint64, tag = "2")]
        FetchId(u64),
        /// Delete the object with this id.
        #[prost(uint64, tag = "3")]
        DeleteId(u64),
    }
}

/// The ASCII reply tokens of the legacy query lane.
///
/// The server writes these bytes verbatim; readers trim surrounding
/// whitespace before matching. A fetch that succeeds replies with the
/// serialized object in place of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusToken {
    /// The command succeeded.
    Ok,
    /// The id does not name a live object.
    NotFound,
    /// The object's declared type and payload member disagree.
    TypeMismatch,
    /// The server failed internally.
    InternalError,
    /// The request carried no recognizable command.
    UnknownCmd,
}

impl StatusToken {
    /// The token's exact wire bytes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::InternalError => "INTERNAL_ERROR",
            Self::UnknownCmd => "UNKNOWN_CMD",
        }
    }
}

impl fmt::Display for StatusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusToken {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "NOT_FOUND" => Ok(Self::NotFound),
            "TYPE_MISMATCH" => Ok(Self::TypeMismatch),
            "INTERNAL_ERROR" => Ok(Self::InternalError),
            "UNKNOWN_CMD" => Ok(Self::UnknownCmd),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use prost::Message as _;

    #[test]
    fn tokens_round_trip_through_their_wire_bytes() {
        for token in [
            StatusToken::Ok,
            StatusToken::NotFound,
            StatusToken::TypeMismatch,
            StatusToken::InternalError,
            StatusToken::UnknownCmd,
        ] {
            assert_eq!(token.as_str().parse(), Ok(token));
        }
        assert_eq!("SUCCESS".parse::<StatusToken>(), Err(()));
        assert_eq!("ok".parse::<StatusToken>(), Err(()));
    }

    #[test]
    fn object_round_trips_through_bytes() {
        let object = RegistaObject {
            id: 3,
            object_type: ObjectType::Vector as i32,
            timestamp: 1_700_000_000_000_000,
            data: Some(regista_object::Data::Vector(VectorValue {
                elements: vec![0.25, -1.5, 3.0],
            })),
        };
        let bytes = object.encode_to_vec();
        let decoded = RegistaObject::decode(bytes.as_slice()).expect("valid bytes");
        assert_eq!(decoded, object);
    }

    #[test]
    fn request_payload_distinguishes_commands() {
        let fetch = RegistaRequest {
            payload: Some(regista_request::Payload::FetchId(9)),
        };
        let bytes = fetch.encode_to_vec();
        let decoded = RegistaRequest::decode(bytes.as_slice()).expect("valid bytes");
        assert!(matches!(
            decoded.payload,
            Some(regista_request::Payload::FetchId(9))
        ));
    }
}

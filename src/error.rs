//! Error taxonomies for the client and the storage layer.

use crate::proto::object::StatusToken;

/// Failures a client surfaces as `Err`.
///
/// A `Response` carrying a non-OK status is a successful exchange and never
/// lands here; only undeliverable or unintelligible exchanges do.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection failed before a complete reply arrived.
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),

    /// The reply bytes did not decode as the expected message.
    #[error("decode: {0}")]
    Decode(#[from] prost::DecodeError),

    /// No reply arrived within the configured window.
    #[error("no reply received within the configured timeout")]
    NoReply,

    /// The legacy lane answered a fetch with an error token other than
    /// NOT_FOUND.
    #[error("server answered with {0}")]
    ErrorToken(StatusToken),
}

/// Failures inside the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage engine itself failed.
    #[error("storage engine: {0}")]
    Rocks(#[from] rocksdb::Error),

    /// A required column family is missing from the opened database.
    #[error("column family {0:?} is missing")]
    ColumnFamily(&'static str),

    /// A stored row no longer decodes. The database was written by
    /// something that does not speak this schema.
    #[error("stored entry {id} is corrupt")]
    Corrupt {
        /// Id of the unreadable entry.
        id: u64,
        /// The decode failure.
        #[source]
        source: prost::DecodeError,
    },

    /// The index points at a data row that does not exist.
    #[error("index for entry {0} points at a missing row")]
    Dangling(u64),

    /// A stored key has the wrong length for its column family.
    #[error("malformed {kind} key of {len} bytes")]
    MalformedKey {
        /// Which key space the key came from.
        kind: &'static str,
        /// The key's actual length.
        len: usize,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages_name_the_failing_piece() {
        let err = StoreError::ColumnFamily("data");
        assert_eq!(err.to_string(), "column family \"data\" is missing");

        let err = StoreError::Dangling(12);
        assert_eq!(err.to_string(), "index for entry 12 points at a missing row");

        let err = ClientError::ErrorToken(StatusToken::TypeMismatch);
        assert_eq!(err.to_string(), "server answered with TYPE_MISMATCH");
    }

    #[test]
    fn io_errors_convert_into_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err = ClientError::from(io);
        assert!(matches!(err, ClientError::Transport(_)));
    }
}

//! RegistaDB is a key-indexed object store reachable over two independent TCP
//! lanes backed by the same data.
//!
//! - The **ingest lane** is one-directional and unacknowledged. A serialized
//!   envelope is fired at the server and the caller moves on; nothing ever
//!   comes back, not even on failure. It exists for bulk ingestion where
//!   throughput matters more than confirmation.
//! - The **query lane** is strictly synchronous request/reply. Every request
//!   is answered by exactly one response carrying a status from a closed
//!   taxonomy, so callers can branch exhaustively.
//!
//! An entry pushed on the ingest lane becomes visible to the query lane once
//! the server has processed it. Callers that need confirmation of an ingest
//! therefore poll with a verified read; there is no push-with-ack primitive.
//!
//! Values travel as a closed tagged union ([`Value`]): scalars, homogeneous
//! lists, a string map, a JSON document, or raw bytes, with exact round-trip
//! decoding and an explicit "absent" state when no kind is set.
//!
//! Two wire generations exist. The current one speaks
//! [`proto::entry`] (`Entry`/`Request`/`Response`); the legacy one speaks
//! [`proto::object`] (typed `RegistaObject` with ASCII reply tokens). A
//! deployment is configured for one generation; see
//! [`handler::WireFormat`].
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> Result<(), registadb::ClientError> {
//! use registadb::{EntryBuilder, RegistaClient};
//!
//! let mut client = RegistaClient::connect("localhost").await?;
//!
//! // Fire-and-forget: returns immediately, no error signal ever.
//! client.push(EntryBuilder::new().data("bulk record").build()).await;
//!
//! // Verified: exactly one reply, with the allocated id inside.
//! let response = client
//!     .create(EntryBuilder::new().metadata("source", "example").data(42_i64).build())
//!     .await?;
//! println!("created entry {:?}", response.entry);
//! # Ok(())
//! # }
//! ```

pub mod client;
mod entry;
mod error;
pub mod frame;
pub mod handler;
pub mod proto;
pub mod server;
pub mod store;
mod value;

pub use self::client::{LegacyClient, RegistaClient};
pub use self::entry::EntryBuilder;
pub use self::error::{ClientError, StoreError};
pub use self::server::Server;
pub use self::value::{json_from_struct, struct_from_json, Value};

/// Default port of the unacknowledged ingest lane.
pub const DEFAULT_INGEST_PORT: u16 = 5555;

/// Default port of the request/reply query lane.
pub const DEFAULT_QUERY_PORT: u16 = 5556;

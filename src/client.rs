//! Clients for both wire generations.
//!
//! A client holds one connection per lane. Pushes go out on the ingest
//! connection and are never acknowledged. Verified operations go out on
//! the query connection one at a time; each waits for its single reply
//! before the connection is usable again. Dropping a client closes both
//! connections, abandoning any reply still in flight.

use std::io;
use std::time::Duration;

use prost::Message as _;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::ClientError;
use crate::frame::{read_frame, write_frame};
use crate::proto::entry::{request::Target, Entry, OperationType, Request, Response};
use crate::proto::object::{regista_request::Payload, RegistaObject, RegistaRequest, StatusToken};
use crate::{DEFAULT_INGEST_PORT, DEFAULT_QUERY_PORT};

/// How long a verified operation waits for its reply before giving up.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the current entry schema.
///
/// ```no_run
/// use registadb::{EntryBuilder, RegistaClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = RegistaClient::connect("127.0.0.1").await?;
/// let response = client
///     .create(EntryBuilder::new().data("mezzala").build())
///     .await?;
/// let id = response.entry.map_or(0, |entry| entry.id);
/// let _response = client.read(id).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RegistaClient {
    ingest: TcpStream,
    query: TcpStream,
    reply_timeout: Duration,
}

impl RegistaClient {
    /// Connects both lanes to `host` on the default ports.
    ///
    /// # Errors
    ///
    /// Fails when either connection cannot be established.
    pub async fn connect(host: &str) -> io::Result<Self> {
        Self::connect_to((host, DEFAULT_INGEST_PORT), (host, DEFAULT_QUERY_PORT)).await
    }

    /// Connects the lanes to explicit addresses, ingest first.
    ///
    /// # Errors
    ///
    /// Fails when either connection cannot be established.
    pub async fn connect_to<A, B>(ingest: A, query: B) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        B: ToSocketAddrs,
    {
        Ok(Self {
            ingest: TcpStream::connect(ingest).await?,
            query: TcpStream::connect(query).await?,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    /// Replaces the reply timeout for every later verified operation.
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Submits an entry on the ingest lane. There is no acknowledgement
    /// and no error; a frame the transport will not take is logged at
    /// debug level and forgotten.
    pub async fn push(&mut self, entry: Entry) {
        if let Err(err) = write_frame(&mut self.ingest, &entry.encode_to_vec()).await {
            debug!(error = %err, "push frame was not delivered");
        }
    }

    /// Stores an entry and waits for the verdict. Statuses other than OK
    /// arrive inside the `Ok` response, not as errors.
    ///
    /// # Errors
    ///
    /// Fails only when the exchange itself breaks down: the transport
    /// drops, the reply does not decode, or no reply arrives in time.
    pub async fn create(&mut self, entry: Entry) -> Result<Response, ClientError> {
        self.round_trip(Request {
            op: OperationType::Create as i32,
            target: Some(Target::Entry(entry)),
        })
        .await
    }

    /// Fetches the entry stored under `id`. A missing id is a NOT_FOUND
    /// response, not an error.
    ///
    /// # Errors
    ///
    /// Fails only when the exchange itself breaks down.
    pub async fn read(&mut self, id: u64) -> Result<Response, ClientError> {
        self.round_trip(Request {
            op: OperationType::Read as i32,
            target: Some(Target::Id(id)),
        })
        .await
    }

    /// Deletes the entry stored under `id`.
    ///
    /// # Errors
    ///
    /// Fails only when the exchange itself breaks down.
    pub async fn delete(&mut self, id: u64) -> Result<Response, ClientError> {
        self.round_trip(Request {
            op: OperationType::Delete as i32,
            target: Some(Target::Id(id)),
        })
        .await
    }

    async fn round_trip(&mut self, request: Request) -> Result<Response, ClientError> {
        write_frame(&mut self.query, &request.encode_to_vec()).await?;
        let reply = tokio::time::timeout(self.reply_timeout, read_frame(&mut self.query))
            .await
            .map_err(|_elapsed| ClientError::NoReply)??;
        let Some(frame) = reply else {
            return Err(ClientError::Transport(closed_before_reply()));
        };
        Ok(Response::decode(frame.as_slice())?)
    }
}

/// Client for the legacy typed-object schema.
#[derive(Debug)]
pub struct LegacyClient {
    ingest: TcpStream,
    query: TcpStream,
    reply_timeout: Duration,
}

impl LegacyClient {
    /// Connects both lanes to `host` on the default ports.
    ///
    /// # Errors
    ///
    /// Fails when either connection cannot be established.
    pub async fn connect(host: &str) -> io::Result<Self> {
        Self::connect_to((host, DEFAULT_INGEST_PORT), (host, DEFAULT_QUERY_PORT)).await
    }

    /// Connects the lanes to explicit addresses, ingest first.
    ///
    /// # Errors
    ///
    /// Fails when either connection cannot be established.
    pub async fn connect_to<A, B>(ingest: A, query: B) -> io::Result<Self>
    where
        A: ToSocketAddrs,
        B: ToSocketAddrs,
    {
        Ok(Self {
            ingest: TcpStream::connect(ingest).await?,
            query: TcpStream::connect(query).await?,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    /// Replaces the reply timeout for every later verified operation.
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Submits an object on the ingest lane without acknowledgement.
    pub async fn push_object(&mut self, object: RegistaObject) {
        if let Err(err) = write_frame(&mut self.ingest, &object.encode_to_vec()).await {
            debug!(error = %err, "push frame was not delivered");
        }
    }

    /// Stores an object and returns the server's token verdict.
    ///
    /// # Errors
    ///
    /// Fails when the exchange breaks down or the reply is not a
    /// recognizable token.
    pub async fn store(&mut self, object: RegistaObject) -> Result<StatusToken, ClientError> {
        let reply = self.round_trip(Payload::Store(object)).await?;
        parse_token(&reply)
    }

    /// Fetches the object stored under `id`. `None` when the server
    /// answered NOT_FOUND.
    ///
    /// # Errors
    ///
    /// Fails when the exchange breaks down, when the server answers with
    /// an error token other than NOT_FOUND, or when an object reply does
    /// not decode.
    pub async fn fetch(&mut self, id: u64) -> Result<Option<RegistaObject>, ClientError> {
        let reply = self.round_trip(Payload::FetchId(id)).await?;
        // Tokens are checked first. A serialized object can never spell
        // out one of the token strings, so this cannot misread a payload.
        if let Ok(token) = token_from_bytes(&reply) {
            return match token {
                StatusToken::NotFound => Ok(None),
                other => Err(ClientError::ErrorToken(other)),
            };
        }
        Ok(Some(RegistaObject::decode(reply.as_slice())?))
    }

    /// Deletes the object stored under `id` and returns the token verdict.
    ///
    /// # Errors
    ///
    /// Fails when the exchange breaks down or the reply is not a
    /// recognizable token.
    pub async fn delete(&mut self, id: u64) -> Result<StatusToken, ClientError> {
        let reply = self.round_trip(Payload::DeleteId(id)).await?;
        parse_token(&reply)
    }

    async fn round_trip(&mut self, payload: Payload) -> Result<Vec<u8>, ClientError> {
        let request = RegistaRequest {
            payload: Some(payload),
        };
        write_frame(&mut self.query, &request.encode_to_vec()).await?;
        let reply = tokio::time::timeout(self.reply_timeout, read_frame(&mut self.query))
            .await
            .map_err(|_elapsed| ClientError::NoReply)??;
        reply.ok_or_else(|| ClientError::Transport(closed_before_reply()))
    }
}

fn closed_before_reply() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed before the reply arrived",
    )
}

fn parse_token(reply: &[u8]) -> Result<StatusToken, ClientError> {
    token_from_bytes(reply)
        .map_err(|()| ClientError::Decode(prost::DecodeError::new("unrecognized status token")))
}

fn token_from_bytes(reply: &[u8]) -> Result<StatusToken, ()> {
    // Tokens may arrive padded with surrounding whitespace.
    std::str::from_utf8(reply).map_err(|_| ())?.trim().parse()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_parsing_trims_whitespace() {
        assert_eq!(token_from_bytes(b"OK"), Ok(StatusToken::Ok));
        assert_eq!(token_from_bytes(b"OK \n"), Ok(StatusToken::Ok));
        assert_eq!(token_from_bytes(b" NOT_FOUND"), Ok(StatusToken::NotFound));
        assert_eq!(token_from_bytes(b"ok"), Err(()));
        assert_eq!(token_from_bytes(b"O K"), Err(()));
        assert_eq!(token_from_bytes(&[0xff, 0xfe]), Err(()));
    }

    #[test]
    fn serialized_objects_never_parse_as_tokens() {
        let object = RegistaObject {
            id: 1,
            object_type: 0,
            timestamp: 1,
            data: Some(crate::proto::object::regista_object::Data::Blob(
                b"OK".to_vec(),
            )),
        };
        assert_eq!(token_from_bytes(&object.encode_to_vec()), Err(()));
    }
}

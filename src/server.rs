//! The two-lane TCP server.
//!
//! One listener accepts ingest connections and applies their frames
//! without ever writing back. The other accepts query connections and
//! answers every frame with exactly one reply before reading the next,
//! so a connection never has more than one request in flight.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::frame::{read_frame, write_frame};
use crate::handler::{CreatePolicy, EntryHandler, ObjectHandler, WireFormat};
use crate::store::Store;
use crate::{DEFAULT_INGEST_PORT, DEFAULT_QUERY_PORT};

/// Configuration for [`Server::bind`].
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Address of the no-reply ingest lane.
    pub ingest_addr: SocketAddr,
    /// Address of the request/reply query lane.
    pub query_addr: SocketAddr,
    /// Which wire generation both lanes speak.
    pub wire_format: WireFormat,
    /// How writes treat an id that is already live.
    pub create_policy: CreatePolicy,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            ingest_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_INGEST_PORT)),
            query_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_QUERY_PORT)),
            wire_format: WireFormat::default(),
            create_policy: CreatePolicy::default(),
        }
    }
}

/// Dispatch over whichever generation the server was configured with.
/// The choice is made once at bind time; frames are never sniffed.
#[derive(Clone, Debug)]
enum Handler {
    Entry(Arc<EntryHandler>),
    Object(Arc<ObjectHandler>),
}

impl Handler {
    fn ingest(&self, frame: &[u8]) {
        match self {
            Self::Entry(handler) => handler.ingest(frame),
            Self::Object(handler) => handler.ingest(frame),
        }
    }

    fn execute(&self, frame: &[u8]) -> Vec<u8> {
        match self {
            Self::Entry(handler) => handler.execute_frame(frame),
            Self::Object(handler) => handler.execute_frame(frame),
        }
    }
}

/// A bound pair of lane listeners over one store.
#[must_use]
#[derive(Debug)]
pub struct Server {
    ingest: TcpListener,
    query: TcpListener,
    handler: Handler,
}

impl Server {
    /// Binds both lanes and prepares the configured handler.
    ///
    /// # Errors
    ///
    /// Fails when either address cannot be bound.
    pub async fn bind(store: Arc<Store>, options: &ServerOptions) -> io::Result<Self> {
        let ingest = TcpListener::bind(options.ingest_addr).await?;
        let query = TcpListener::bind(options.query_addr).await?;
        let handler = match options.wire_format {
            WireFormat::Entry => Handler::Entry(Arc::new(EntryHandler::new(
                store,
                options.create_policy,
            ))),
            WireFormat::Object => Handler::Object(Arc::new(ObjectHandler::new(store))),
        };
        let ingest_local = ingest.local_addr()?;
        let query_local = query.local_addr()?;
        info!(ingest = %ingest_local, query = %query_local, "listening");
        Ok(Self {
            ingest,
            query,
            handler,
        })
    }

    /// The bound ingest address, useful when binding to port zero.
    ///
    /// # Errors
    ///
    /// Fails when the local address cannot be read from the socket.
    pub fn ingest_addr(&self) -> io::Result<SocketAddr> {
        self.ingest.local_addr()
    }

    /// The bound query address, useful when binding to port zero.
    ///
    /// # Errors
    ///
    /// Fails when the local address cannot be read from the socket.
    pub fn query_addr(&self) -> io::Result<SocketAddr> {
        self.query.local_addr()
    }

    /// Serves both lanes until the process dies.
    ///
    /// # Errors
    ///
    /// Fails when accepting a connection fails.
    pub async fn serve(self) -> io::Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves both lanes until `shutdown` completes, then tears down every
    /// connection task before returning so the store can be dropped and
    /// reopened.
    ///
    /// # Errors
    ///
    /// Fails when accepting a connection fails.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();

        let result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),
                accepted = self.ingest.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted ingest connection");
                        let handler = self.handler.clone();
                        let _abort = tasks.spawn(ingest_loop(stream, handler, peer));
                    }
                    Err(err) => break Err(err),
                },
                accepted = self.query.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted query connection");
                        let handler = self.handler.clone();
                        let _abort = tasks.spawn(query_loop(stream, handler, peer));
                    }
                    Err(err) => break Err(err),
                },
            }
        };

        info!("shutting down");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        result
    }
}

/// Drains one ingest connection. Frames are applied in arrival order and
/// nothing is ever written back, so a client cannot tell drops from
/// successes here.
async fn ingest_loop(mut stream: TcpStream, handler: Handler, peer: SocketAddr) {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(frame)) => handler.ingest(&frame),
            Ok(None) => break,
            Err(err) => {
                warn!(%peer, error = %err, "ingest connection failed");
                break;
            }
        }
    }
    debug!(%peer, "ingest connection closed");
}

/// Serves one query connection, one frame at a time. The reply goes out
/// before the next frame is read; a client that disconnects mid-request
/// simply never sees its reply.
async fn query_loop(mut stream: TcpStream, handler: Handler, peer: SocketAddr) {
    loop {
        let frame = match read_frame(&mut stream).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                warn!(%peer, error = %err, "query connection failed");
                break;
            }
        };
        let reply = handler.execute(&frame);
        if let Err(err) = write_frame(&mut stream, &reply).await {
            warn!(%peer, error = %err, "failed to send reply");
            break;
        }
    }
    debug!(%peer, "query connection closed");
}

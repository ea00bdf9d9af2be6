use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use registadb::handler::{CreatePolicy, WireFormat};
use registadb::server::ServerOptions;
use registadb::store::Store;
use registadb::Server;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A store location reserved for one test, wiped before use.
pub(crate) fn test_store_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("registadb_test_{name}"));
    let _ignored = std::fs::remove_dir_all(&path);
    path
}

/// Installs a subscriber honoring `RUST_LOG`, first caller wins. Server
/// logs stay silent unless asked for, but `RUST_LOG=registadb=debug`
/// surfaces dropped ingest frames and connection lifecycles mid-test.
fn init_tracing() {
    let _ignored = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A server on ephemeral localhost ports, running until shut down.
pub(crate) struct TestServer {
    pub(crate) ingest_addr: SocketAddr,
    pub(crate) query_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    done: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    /// Stops the server and waits for every connection task to finish, so
    /// the store lock is released before any reopen.
    pub(crate) async fn shutdown(self) -> Result<()> {
        let _ignored = self.shutdown.send(());
        self.done.await??;
        Ok(())
    }
}

/// Binds a server over the store at `path` and serves it in the background.
pub(crate) async fn spawn_server(
    path: PathBuf,
    wire_format: WireFormat,
    create_policy: CreatePolicy,
) -> Result<TestServer> {
    init_tracing();
    let store = Arc::new(Store::open(path)?);
    let options = ServerOptions {
        ingest_addr: "127.0.0.1:0".parse()?,
        query_addr: "127.0.0.1:0".parse()?,
        wire_format,
        create_policy,
    };
    let server = Server::bind(store, &options).await?;
    let ingest_addr = server.ingest_addr()?;
    let query_addr = server.query_addr()?;

    let (shutdown, signal) = oneshot::channel();
    let done = tokio::spawn(server.serve_with_shutdown(async {
        let _ignored = signal.await;
    }));

    Ok(TestServer {
        ingest_addr,
        query_addr,
        shutdown,
        done,
    })
}

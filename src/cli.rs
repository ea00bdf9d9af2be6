//! Command-line interface for RegistaDB.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use registadb::{DEFAULT_INGEST_PORT, DEFAULT_QUERY_PORT};

/// Command-line arguments for RegistaDB.
#[derive(Debug, Parser)]
pub(crate) struct Args {
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// What operation to perform.
#[derive(Debug, Subcommand)]
#[command(version, propagate_version = true)]
pub(crate) enum Command {
    /// Run RegistaDB as a server.
    ///
    /// This starts both lanes of the server: the ingest lane, which accepts
    /// entries without ever replying, and the query lane, which answers each
    /// request with exactly one response. The server runs until stopped with
    /// ctrl-c.
    #[clap(alias = "serve")]
    Run(RunArgs),
    /// Store an entry over the query lane and wait for the verdict.
    ///
    /// With `--id 0` (the default) the server allocates an id and it is
    /// written to stdout.
    #[clap(aliases = ["store", "set"])]
    Create(SubmitArgs),
    /// Fetch an entry by id and write its value to stdout.
    #[clap(aliases = ["fetch", "get"])]
    Read {
        /// Where to find the server.
        #[clap(flatten)]
        server: ServerAddr,
        /// The id to fetch.
        id: u64,
    },
    /// Delete an entry by id.
    #[clap(aliases = ["remove", "rm"])]
    Delete {
        /// Where to find the server.
        #[clap(flatten)]
        server: ServerAddr,
        /// The id to delete.
        id: u64,
    },
    /// Submit an entry on the ingest lane without waiting for any verdict.
    Push(SubmitArgs),
}

/// Run RegistaDB as a server.
#[derive(Debug, Parser)]
#[command(propagate_version = true)]
pub(crate) struct RunArgs {
    /// The location of the store.
    #[clap(long, default_value = "regista_store.db")]
    pub(crate) store: PathBuf,
    /// The address of the ingest lane.
    #[clap(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_INGEST_PORT)))]
    pub(crate) ingest_addr: SocketAddr,
    /// The address of the query lane.
    #[clap(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_QUERY_PORT)))]
    pub(crate) query_addr: SocketAddr,
    /// Speak the legacy typed-object schema instead of the entry schema.
    #[clap(long)]
    pub(crate) legacy: bool,
    /// Answer ALREADY_EXISTS instead of overwriting when a write names an id
    /// that is already live.
    #[clap(long)]
    pub(crate) reject_existing: bool,
}

/// Where to find the server.
#[derive(Debug, ClapArgs)]
pub(crate) struct ServerAddr {
    /// The host the server runs on.
    #[clap(long, default_value = "127.0.0.1")]
    pub(crate) host: String,
    /// The port of the ingest lane.
    #[clap(long, default_value_t = DEFAULT_INGEST_PORT)]
    pub(crate) ingest_port: u16,
    /// The port of the query lane.
    #[clap(long, default_value_t = DEFAULT_QUERY_PORT)]
    pub(crate) query_port: u16,
}

/// Arguments describing an entry to submit.
#[derive(Debug, Parser)]
#[command(propagate_version = true)]
pub(crate) struct SubmitArgs {
    /// Where to find the server.
    #[clap(flatten)]
    pub(crate) server: ServerAddr,
    /// The id to store under. Zero lets the server allocate one.
    #[clap(long, default_value_t = 0)]
    pub(crate) id: u64,
    /// A metadata annotation as key=value. May be given more than once.
    #[clap(long = "meta", value_parser = parse_meta)]
    pub(crate) metadata: Vec<(String, String)>,
    /// The value to store.
    #[clap(flatten)]
    pub(crate) value: ValueArgs,
}

/// The value to submit. At most one kind may be given; giving none submits
/// an entry with no value at all.
#[derive(Debug, ClapArgs)]
#[group(multiple = false)]
pub(crate) struct ValueArgs {
    /// Store a UTF-8 string value.
    #[clap(long)]
    pub(crate) string: Option<String>,
    /// Store a double-precision float value.
    #[clap(long)]
    pub(crate) double: Option<f64>,
    /// Store a 64-bit signed integer value.
    #[clap(long)]
    pub(crate) int: Option<i64>,
    /// Store a boolean value.
    #[clap(long = "bool")]
    pub(crate) boolean: Option<bool>,
    /// Store a JSON document, given inline. The document must be an object.
    #[clap(long)]
    pub(crate) json: Option<String>,
    /// Store the contents of a file as a byte value.
    ///
    /// If `-`, the bytes are read from stdin.
    #[clap(long)]
    pub(crate) bytes: Option<PathBuf>,
}

/// Parses one `key=value` metadata annotation.
fn parse_meta(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn meta_annotations_split_on_the_first_equals() {
        assert_eq!(
            parse_meta("source=scout=feed"),
            Ok(("source".to_owned(), "scout=feed".to_owned()))
        );
        assert!(parse_meta("no-separator").is_err());
    }

    #[test]
    fn run_defaults_match_the_fixed_ports() {
        let Command::Run(args) = Args::parse_from(["registadb", "run"]).command else {
            panic!("run should parse as Run");
        };
        assert_eq!(args.ingest_addr.port(), DEFAULT_INGEST_PORT);
        assert_eq!(args.query_addr.port(), DEFAULT_QUERY_PORT);
        assert!(!args.legacy);
        assert!(!args.reject_existing);
    }

    #[test]
    fn value_kinds_are_mutually_exclusive() {
        let err = Args::try_parse_from(["registadb", "create", "--string", "a", "--int", "1"])
            .expect_err("two kinds must not parse");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}

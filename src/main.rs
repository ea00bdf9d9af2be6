//! A command-line interface for running and talking to RegistaDB servers.
//!
//! For usage, run `cargo run -- --help`.

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser as _;
use registadb::handler::{CreatePolicy, WireFormat};
use registadb::proto::entry::{Entry, OperationStatus, Response};
use registadb::server::ServerOptions;
use registadb::store::Store;
use registadb::{EntryBuilder, RegistaClient, Server, Value};
use tokio::fs;
use tokio::io::{self, AsyncReadExt as _, AsyncWriteExt as _};

use crate::cli::{Args, Command, RunArgs, ServerAddr, SubmitArgs, ValueArgs};

/// A custom error message.
#[derive(Debug)]
struct ErrStr(&'static str);

impl std::error::Error for ErrStr {}

impl std::fmt::Display for ErrStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Args { command } = Args::parse();

    let future = async {
        match command {
            Command::Run(args) => run(args).await,
            Command::Create(args) => create(args).await,
            Command::Read { server, id } => read(server, id).await,
            Command::Delete { server, id } => delete(server, id).await,
            Command::Push(args) => push(args).await,
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}

/// Run RegistaDB as a server. This function will block until the server is
/// stopped with ctrl-c.
async fn run(
    RunArgs {
        store,
        ingest_addr,
        query_addr,
        legacy,
        reject_existing,
    }: RunArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = Arc::new(Store::open(store)?);
    let options = ServerOptions {
        ingest_addr,
        query_addr,
        wire_format: if legacy {
            WireFormat::Object
        } else {
            WireFormat::Entry
        },
        create_policy: if reject_existing {
            CreatePolicy::Reject
        } else {
            CreatePolicy::Overwrite
        },
    };

    let server = Server::bind(store, &options).await?;
    server
        .serve_with_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
        })
        .await?;

    Ok(ExitCode::SUCCESS)
}

/// Store an entry over the query lane.
///
/// # stdout
///
/// When the server allocates the id, the allocated id is written to stdout.
/// Nothing is written for an explicit id.
async fn create(args: SubmitArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (mut client, entry) = prepare(args).await?;
    let response = client.create(entry).await?;
    match response.status() {
        OperationStatus::Ok => {
            if let Some(entry) = response.entry {
                #[allow(clippy::print_stdout)]
                println!("{}", entry.id);
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => fail(&response),
    }
}

/// Fetch an entry by id.
///
/// # stdout
///
/// String and byte values are written raw. Every other kind is rendered as
/// JSON, followed by a newline. An entry without a value writes nothing.
async fn read(server: ServerAddr, id: u64) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut client = connect(&server).await?;
    let response = client.read(id).await?;
    match response.status() {
        OperationStatus::Ok => {
            let Some(entry) = response.entry else {
                return Err(Box::new(ErrStr("the server answered OK without an entry")));
            };
            write_value(Value::from_wire(entry.data)).await?;
            Ok(ExitCode::SUCCESS)
        }
        _ => fail(&response),
    }
}

/// Delete an entry by id.
async fn delete(server: ServerAddr, id: u64) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut client = connect(&server).await?;
    let response = client.delete(id).await?;
    match response.status() {
        OperationStatus::Ok => Ok(ExitCode::SUCCESS),
        _ => fail(&response),
    }
}

/// Submit an entry on the ingest lane. There is no verdict to report, so
/// the exit code only reflects whether the submission could be sent at all.
async fn push(args: SubmitArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (mut client, entry) = prepare(args).await?;
    client.push(entry).await;
    Ok(ExitCode::SUCCESS)
}

/// Connect to the server and build the entry described by the arguments.
async fn prepare(
    SubmitArgs {
        server,
        id,
        metadata,
        value,
    }: SubmitArgs,
) -> Result<(RegistaClient, Entry), Box<dyn std::error::Error>> {
    let client = connect(&server).await?;
    let mut builder = EntryBuilder::new().id(id);
    for (key, annotation) in metadata {
        builder = builder.metadata(key, annotation);
    }
    if let Some(value) = parse_value(value).await? {
        builder = builder.data(value);
    }
    Ok((client, builder.build()))
}

/// Open both lanes to the server named by the arguments.
async fn connect(server: &ServerAddr) -> io::Result<RegistaClient> {
    RegistaClient::connect_to(
        (server.host.as_str(), server.ingest_port),
        (server.host.as_str(), server.query_port),
    )
    .await
}

/// Turn the value arguments into a typed value, if one was given.
async fn parse_value(
    ValueArgs {
        string,
        double,
        int,
        boolean,
        json,
        bytes,
    }: ValueArgs,
) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    Ok(if let Some(string) = string {
        Some(Value::String(string))
    } else if let Some(double) = double {
        Some(Value::Double(double))
    } else if let Some(int) = int {
        Some(Value::Int(int))
    } else if let Some(boolean) = boolean {
        Some(Value::Bool(boolean))
    } else if let Some(json) = json {
        let serde_json::Value::Object(object) = serde_json::from_str(&json)? else {
            return Err(Box::new(ErrStr("the JSON value must be an object")));
        };
        Some(Value::Json(registadb::struct_from_json(&object)))
    } else if let Some(path) = bytes {
        Some(Value::Bytes(read_file_or_stdin(path).await?))
    } else {
        None
    })
}

/// Write a value to stdout, raw for strings and bytes, as JSON otherwise.
async fn write_value(value: Option<Value>) -> io::Result<()> {
    let mut stdout = io::stdout();
    match value {
        None => {}
        Some(Value::String(text)) => stdout.write_all(text.as_bytes()).await?,
        Some(Value::Bytes(bytes)) => stdout.write_all(&bytes).await?,
        Some(other) => {
            stdout
                .write_all(render_json(&other).to_string().as_bytes())
                .await?;
            stdout.write_all(b"\n").await?;
        }
    }
    stdout.flush().await
}

/// Render a value as JSON for display.
fn render_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(v) => serde_json::Value::String(v.clone()),
        Value::Double(v) => serde_json::json!(v),
        Value::Int(v) => serde_json::json!(v),
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::StringList(v) => serde_json::json!(v),
        Value::DoubleList(v) => serde_json::json!(v),
        Value::IntList(v) => serde_json::json!(v),
        Value::BoolList(v) => serde_json::json!(v),
        Value::Map(v) => serde_json::json!(v),
        Value::Json(document) => serde_json::Value::Object(registadb::json_from_struct(document)),
        Value::Bytes(v) => serde_json::json!(v),
    }
}

/// Report a non-OK response on stderr and exit with a failure code.
#[allow(clippy::unnecessary_wraps)] // uniform with its callers
fn fail(response: &Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if response.message.is_empty() {
        eprintln!("{}", response.status().as_str_name());
    } else {
        eprintln!("{}: {}", response.status().as_str_name(), response.message);
    }
    Ok(ExitCode::FAILURE)
}

/// Given a path, read from stdin if the path is "-". Otherwise, read the
/// file at that path.
async fn read_file_or_stdin(file_path: PathBuf) -> io::Result<Vec<u8>> {
    if file_path == PathBuf::from("-") {
        let mut bytes = Vec::new();
        let _num_bytes = io::stdin().read_to_end(&mut bytes).await?;
        Ok(bytes)
    } else {
        Ok(fs::read(file_path).await?)
    }
}

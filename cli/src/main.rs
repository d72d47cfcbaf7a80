//! logstream CLI — pipe process output into a database-backed stream and
//! tail it back.
//!
//! # Commands
//! ```text
//! logstream write --stream <name>            stdin → stream, then close
//! logstream read  --stream <name>            stream → stdout until closed
//! logstream pipe  --stream <name>            both at once, through the database
//! logstream lines --stream <name> [--after]  dump stored records as JSON lines
//! logstream info
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use logstream_core::{pipe, LogStore, RecordId, StreamConfig, StreamError};

mod backend;
mod settings;
mod tracing_setup;

use backend::Backend;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "logstream",
    about = "Line-oriented streams stored in SQLite or Postgres",
    long_about = "
logstream: write a process's output into a named stream in a database table,
and tail it back live or after the fact.

ENVIRONMENT VARIABLES:
  LOGSTREAM_DATABASE_URL   sqlite:<path>[?mode=rwc], postgres://..., or memory
  LOGSTREAM_TABLE          Table holding the records (default: logs)
  LOGSTREAM_LOG            Log level (logs are written to stderr)
",
    version
)]
struct Cli {
    /// Database URL: sqlite:<path>, postgres://... or memory
    #[arg(
        long,
        env = "LOGSTREAM_DATABASE_URL",
        default_value = "sqlite:./logstream.db?mode=rwc",
        global = true
    )]
    database_url: String,

    /// Table holding the records
    #[arg(long, env = "LOGSTREAM_TABLE", default_value = "logs", global = true)]
    table: String,

    /// JSON settings file (log + stream sections)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Delay after the first empty poll, in milliseconds
    #[arg(long, global = true)]
    poll_initial_ms: Option<u64>,

    /// Maximum delay between polls, in milliseconds
    #[arg(long, global = true)]
    poll_max_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOGSTREAM_LOG", global = true)]
    log_level: Option<String>,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy stdin into a stream, then close it
    Write {
        /// Stream name
        #[arg(short, long)]
        stream: String,
        /// Leave the stream open (do not append the close sentinel)
        #[arg(long)]
        no_close: bool,
    },

    /// Tail a stream to stdout until it is closed
    Read {
        /// Stream name
        #[arg(short, long)]
        stream: String,
        /// Only read records with an id greater than this
        #[arg(long, default_value_t = 0)]
        after: RecordId,
    },

    /// Write stdin into a stream while tailing it to stdout
    Pipe {
        /// Stream name
        #[arg(short, long)]
        stream: String,
    },

    /// Print the stored records of a stream as JSON lines
    Lines {
        /// Stream name
        #[arg(short, long)]
        stream: String,
        /// Only print records with an id greater than this
        #[arg(long, default_value_t = 0)]
        after: RecordId,
    },

    /// Show configuration info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_overrides(cli.log_level, cli.log_json, cli.poll_initial_ms, cli.poll_max_ms);
    tracing_setup::init_tracing(&settings.log);

    let backend = Backend::parse(&cli.database_url)?;

    if let Commands::Info = cli.command {
        cmd_info(&backend, &cli.table, &settings);
        return Ok(());
    }

    let store = open_store(&backend, &cli.table, settings.stream).await?;
    match cli.command {
        Commands::Write { stream, no_close } => cmd_write(&store, &stream, !no_close).await,
        Commands::Read { stream, after } => cmd_read(&store, &stream, after).await,
        Commands::Pipe { stream } => cmd_pipe(&store, &stream).await,
        Commands::Lines { stream, after } => cmd_lines(&store, &stream, after).await,
        Commands::Info => Ok(()),
    }
}

async fn open_store(backend: &Backend, table: &str, config: StreamConfig) -> Result<LogStore> {
    let log = backend.open(table).await?;
    Ok(LogStore::with_config(log, config))
}

async fn cmd_write(store: &LogStore, name: &str, close: bool) -> Result<()> {
    let stream = store.stream(name)?;
    let mut stdin = BufReader::new(tokio::io::stdin());
    let n = pipe::copy_in(&mut stdin, &stream)
        .await
        .context("copying stdin into stream")?;
    if close {
        stream.close().await.context("closing stream")?;
    }
    debug!(stream = name, bytes = n, closed = close, "write finished");
    Ok(())
}

async fn cmd_read(store: &LogStore, name: &str, after: RecordId) -> Result<()> {
    let token = cancel_on_ctrl_c();
    let mut stream = store.stream_from(name, after)?.with_cancellation(token);
    let mut stdout = tokio::io::stdout();
    match pipe::copy_out(&mut stream, &mut stdout).await {
        Ok(_) => Ok(()),
        Err(StreamError::Cancelled) => {
            debug!(stream = name, last_id = stream.cursor().last_id(), "read interrupted");
            Ok(())
        }
        Err(e) => Err(e).context("tailing stream"),
    }
}

async fn cmd_pipe(store: &LogStore, name: &str) -> Result<()> {
    let writer = store.stream(name)?;
    let mut reader = store.stream(name)?;

    let producer = tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin());
        pipe::copy_in(&mut stdin, &writer).await?;
        writer.close().await
    });

    let mut stdout = tokio::io::stdout();
    pipe::copy_out(&mut reader, &mut stdout)
        .await
        .context("tailing stream")?;
    producer
        .await
        .context("producer task panicked")?
        .context("copying stdin into stream")?;
    Ok(())
}

#[derive(Serialize)]
struct LineView {
    id: RecordId,
    /// Lossy UTF-8 text; `null` for the close sentinel.
    text: Option<String>,
}

async fn cmd_lines(store: &LogStore, name: &str, after: RecordId) -> Result<()> {
    let stream = store.stream(name)?;
    let records = stream.lines(after).await.context("querying records")?;
    let mut stdout = tokio::io::stdout();
    for record in records {
        let view = LineView {
            id: record.id,
            text: record.text.map(|t| String::from_utf8_lossy(&t).into_owned()),
        };
        let mut line = serde_json::to_vec(&view)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
    }
    stdout.flush().await?;
    Ok(())
}

fn cmd_info(backend: &Backend, table: &str, settings: &Settings) {
    println!("logstream v{}", env!("CARGO_PKG_VERSION"));
    println!("  Backend: {backend:?}");
    println!("  Table: {table}");
    println!(
        "  Poll backoff: 0ms, then {}ms x{} up to {}ms",
        settings.stream.backoff.initial_delay_ms,
        settings.stream.backoff.multiplier,
        settings.stream.backoff.max_delay_ms
    );
    println!("  Storage backends: memory, SQLite, Postgres");
}

/// A token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

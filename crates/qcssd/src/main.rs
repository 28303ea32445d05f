//! qcssd — the QCSS daemon and admin tool.
//!
//! # Usage
//!
//! ```text
//! qcssd --config /etc/qcss/qcss.toml watch
//! qcssd watch --once
//! qcssd assign --db LSST --table Object --chunks 1,2,3 --workers w1,w2 --save
//! qcssd dump --path /DBS/LSST
//! qcssd set-status --db LSST --table Object PENDING_CREATE:12345
//! ```

mod backend;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use qcss_core::QcssConfig;

#[derive(Parser)]
#[command(name = "qcssd", about = "QCSS control-plane daemon")]
struct Cli {
    /// Path to qcss.toml. Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile pending database and table statuses.
    Watch {
        /// Run a single pass and exit.
        #[arg(long)]
        once: bool,
    },

    /// Print the worker assigned to each chunk.
    Assign {
        #[arg(long)]
        db: String,

        #[arg(long)]
        table: String,

        /// Comma-separated chunk ids.
        #[arg(long, value_delimiter = ',', required = true)]
        chunks: Vec<u32>,

        /// Comma-separated candidate workers; `placement.workers` when omitted.
        #[arg(long, value_delimiter = ',')]
        workers: Option<Vec<String>>,

        /// Record new assignments in the CSS.
        #[arg(long)]
        save: bool,
    },

    /// Print a CSS subtree.
    Dump {
        #[arg(long, default_value = "/")]
        path: String,
    },

    /// Write a raw status, registering the database or table if needed.
    SetStatus {
        #[arg(long)]
        db: String,

        #[arg(long)]
        table: Option<String>,

        /// e.g. `READY`, `PENDING_CREATE:12345`.
        status: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,qcssd=debug,qcss=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => QcssConfig::from_file(path)?,
        None => QcssConfig::default(),
    };
    debug!(?config, "configuration loaded");

    let css = backend::open_css(&config.css)?;

    match cli.command {
        Command::Watch { once } => commands::watch(css, &config, once).await,
        Command::Assign {
            db,
            table,
            chunks,
            workers,
            save,
        } => {
            let workers = workers.unwrap_or_else(|| config.placement.workers.clone());
            let assigned = commands::assign(css, &db, &table, &chunks, workers, save)?;
            for (chunk, worker) in assigned {
                println!("{chunk} {worker}");
            }
            Ok(())
        }
        Command::Dump { path } => {
            print!("{}", commands::dump(&css, &path)?);
            Ok(())
        }
        Command::SetStatus { db, table, status } => {
            commands::set_status(&css, &db, table.as_deref(), &status)
        }
    }
}

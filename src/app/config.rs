// Command line and environment configuration
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::app::error::StoreResult;
use crate::app::identity::{IdPolicy, SystemClock};
use crate::app::storage::{JsonFileBackend, MemoryBackend, SqliteBackend, Storage};

/// A small to-do list server and terminal client.
/// Without a subcommand the HTTP server is started.
#[derive(Debug, Parser)]
#[command(name = "checklist")]
pub struct Cli {
    #[command(subcommand)]
    client: Option<ClientCommand>,

    #[command(flatten)]
    serve: ServeConfig,
}

#[derive(Debug, Subcommand)]
enum ClientCommand {
    /// Open the terminal client against a running server
    Tui(TuiConfig),
}

pub enum Command {
    Serve(ServeConfig),
    Tui(TuiConfig),
}

impl Cli {
    pub fn command(self) -> Command {
        match self.client {
            Some(ClientCommand::Tui(config)) => Command::Tui(config),
            None => Command::Serve(self.serve),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "CHECKLIST_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// JSON file, or SQLite database file with --backend sqlite
    #[arg(long, env = "TASKS_FILE", default_value = "tasks.json")]
    pub tasks_file: PathBuf,

    #[arg(long, env = "CHECKLIST_BACKEND", value_enum, default_value_t = BackendKind::Json)]
    pub backend: BackendKind,

    #[arg(long, env = "CHECKLIST_ID_POLICY", value_enum, default_value_t = IdPolicy::Monotonic)]
    pub id_policy: IdPolicy,

    /// Let requests interleave their read and write phases
    /// (reproduces the lost-update race of an unguarded file)
    #[arg(long, env = "CHECKLIST_UNSERIALIZED")]
    pub unserialized: bool,

    #[arg(long, env = "CHECKLIST_PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,
}

impl ServeConfig {
    pub fn open_storage(&self) -> StoreResult<Storage> {
        let storage = match self.backend {
            BackendKind::Json => Storage::new(JsonFileBackend::new(&self.tasks_file)),
            BackendKind::Sqlite => Storage::new(SqliteBackend::open(&self.tasks_file)?),
            BackendKind::Memory => Storage::new(MemoryBackend::default()),
        };
        storage
            .with_clock(SystemClock)
            .with_id_policy(self.id_policy)
            .serialized(!self.unserialized)
            .open()
    }
}

#[derive(Debug, Clone, Args)]
pub struct TuiConfig {
    #[arg(long, env = "CHECKLIST_SERVER", default_value = "http://localhost:3000")]
    pub server: String,
}

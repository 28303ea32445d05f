//! DDL executor interface.
//!
//! Each call returns `Ok(true)` when the DDL was applied, `Ok(false)` to
//! ask for a retry on a later pass, and `Err` on hard failure.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tracing::info;

/// Performs create/drop DDL against the storage engine.
///
/// `options` is the payload of the `PENDING_*` status, passed through
/// untouched. The same call may reach more than one executor when several
/// watchers race, so implementations must be idempotent.
pub trait Executor: Send + Sync {
    fn create_db(&self, db: &str, options: &str) -> anyhow::Result<bool>;

    fn drop_db(&self, db: &str, options: &str) -> anyhow::Result<bool>;

    fn create_table(&self, db: &str, table: &str, options: &str) -> anyhow::Result<bool>;

    fn drop_table(&self, db: &str, table: &str, options: &str) -> anyhow::Result<bool>;
}

/// One DDL action. `Display` is the call description written into
/// `FAILED:` statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ddl {
    CreateDb { db: String },
    DropDb { db: String },
    CreateTable { db: String, table: String },
    DropTable { db: String, table: String },
}

impl Ddl {
    pub fn is_create(&self) -> bool {
        matches!(self, Self::CreateDb { .. } | Self::CreateTable { .. })
    }

    /// Invoke the matching executor method.
    pub fn run_on(&self, executor: &dyn Executor, options: &str) -> anyhow::Result<bool> {
        match self {
            Self::CreateDb { db } => executor.create_db(db, options),
            Self::DropDb { db } => executor.drop_db(db, options),
            Self::CreateTable { db, table } => executor.create_table(db, table, options),
            Self::DropTable { db, table } => executor.drop_table(db, table, options),
        }
    }
}

impl fmt::Display for Ddl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDb { db } => write!(f, "CREATE DATABASE {db}"),
            Self::DropDb { db } => write!(f, "DROP DATABASE {db}"),
            Self::CreateTable { db, table } => write!(f, "CREATE TABLE {db}.{table}"),
            Self::DropTable { db, table } => write!(f, "DROP TABLE {db}.{table}"),
        }
    }
}

/// Logs the DDL it would run and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    fn apply(&self, ddl: Ddl, options: &str) -> anyhow::Result<bool> {
        info!(%ddl, %options, "dry run, ddl not executed");
        Ok(true)
    }
}

impl Executor for DryRunExecutor {
    fn create_db(&self, db: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(Ddl::CreateDb { db: db.into() }, options)
    }

    fn drop_db(&self, db: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(Ddl::DropDb { db: db.into() }, options)
    }

    fn create_table(&self, db: &str, table: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(
            Ddl::CreateTable {
                db: db.into(),
                table: table.into(),
            },
            options,
        )
    }

    fn drop_table(&self, db: &str, table: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(
            Ddl::DropTable {
                db: db.into(),
                table: table.into(),
            },
            options,
        )
    }
}

/// Scripted result of a [`RecordingExecutor`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeed,
    Skip,
    Fail(String),
}

/// Records every call as `(description, options)` and answers with a
/// scripted [`Outcome`], per description or by default.
#[derive(Debug)]
pub struct RecordingExecutor {
    default: Outcome,
    scripted: HashMap<String, Outcome>,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingExecutor {
    pub fn new(default: Outcome) -> Self {
        Self {
            default,
            scripted: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer calls described as `description` (e.g. `DROP TABLE DB1.T1`)
    /// with `outcome`.
    pub fn with_outcome(mut self, description: impl Into<String>, outcome: Outcome) -> Self {
        self.scripted.insert(description.into(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn apply(&self, ddl: Ddl, options: &str) -> anyhow::Result<bool> {
        let description = ddl.to_string();
        let outcome = self
            .scripted
            .get(&description)
            .unwrap_or(&self.default)
            .clone();
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((description, options.to_string()));
        match outcome {
            Outcome::Succeed => Ok(true),
            Outcome::Skip => Ok(false),
            Outcome::Fail(reason) => Err(anyhow::anyhow!(reason)),
        }
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new(Outcome::Succeed)
    }
}

impl Executor for RecordingExecutor {
    fn create_db(&self, db: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(Ddl::CreateDb { db: db.into() }, options)
    }

    fn drop_db(&self, db: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(Ddl::DropDb { db: db.into() }, options)
    }

    fn create_table(&self, db: &str, table: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(
            Ddl::CreateTable {
                db: db.into(),
                table: table.into(),
            },
            options,
        )
    }

    fn drop_table(&self, db: &str, table: &str, options: &str) -> anyhow::Result<bool> {
        self.apply(
            Ddl::DropTable {
                db: db.into(),
                table: table.into(),
            },
            options,
        )
    }
}

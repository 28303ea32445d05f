//! qcss-watcher — turns `PENDING_*` markers in the CSS into DDL.
//!
//! - [`css`]: enumeration of database and table statuses
//! - [`executor`]: the DDL executor interface plus dry-run and recording executors
//! - [`watcher`]: the reconciliation pass and its polling loop

pub mod css;
pub mod error;
pub mod executor;
pub mod watcher;

pub use css::WatcherCss;
pub use error::{WatcherError, WatcherResult};
pub use executor::{Ddl, DryRunExecutor, Executor, Outcome, RecordingExecutor};
pub use watcher::{PassReport, Watcher};

//! Watcher — reconciliation of pending database and table statuses.
//!
//! One pass walks every database, then every table:
//!
//! | status            | executor result | new status                  |
//! |-------------------|-----------------|-----------------------------|
//! | `PENDING_CREATE`  | `true`          | `READY`                     |
//! | `PENDING_DROP`    | `true`          | node removed (recursively)  |
//! | `PENDING_*`       | `false`         | unchanged, retried next pass|
//! | `PENDING_*`       | error           | `FAILED:<ddl description>`  |
//! | anything else     | not called      | unchanged                   |
//!
//! Every write is conditional on the status seen at enumeration time, so
//! a watcher that lost a race with another one never overwrites the
//! winner's outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use qcss_core::{ResourceStatus, StatusKind};

use crate::css::WatcherCss;
use crate::error::{WatcherError, WatcherResult};
use crate::executor::{Ddl, Executor};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub dropped: usize,
    pub failed: usize,
    /// Executor asked for a retry.
    pub skipped: usize,
    /// Status changed under us before our write.
    pub lost_races: usize,
    pub unknown: usize,
}

impl PassReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone)]
pub struct Watcher {
    css: WatcherCss,
    executor: Arc<dyn Executor>,
    interval: Duration,
}

impl Watcher {
    pub fn new(css: WatcherCss, executor: Arc<dyn Executor>) -> Self {
        Self {
            css,
            executor,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Sleep between passes in continuous mode, at least 1ms.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One reconciliation pass over every database and table.
    ///
    /// Executor failures are recorded in the CSS and do not stop the pass;
    /// KV errors do.
    pub fn run_once(&self) -> WatcherResult<PassReport> {
        let mut report = PassReport::default();

        for (db, raw) in self.css.get_dbs()? {
            self.reconcile(Target::Db { db: &db }, &raw, &mut report)?;
        }
        // Listed after the databases so tables of a dropped database are gone.
        for ((db, table), raw) in self.css.get_tables()? {
            self.reconcile(
                Target::Table {
                    db: &db,
                    table: &table,
                },
                &raw,
                &mut report,
            )?;
        }

        if !report.is_idle() {
            info!(
                created = report.created,
                dropped = report.dropped,
                failed = report.failed,
                skipped = report.skipped,
                lost_races = report.lost_races,
                unknown = report.unknown,
                "reconciliation pass complete"
            );
        }
        Ok(report)
    }

    /// Run one pass, or loop until `shutdown` fires.
    ///
    /// In single-pass mode errors are returned. In continuous mode they are
    /// logged and the next tick tries again.
    pub async fn run(
        &self,
        single_pass: bool,
        mut shutdown: watch::Receiver<bool>,
    ) -> WatcherResult<()> {
        if single_pass {
            self.pass_blocking().await?;
            return Ok(());
        }

        info!(interval_ms = self.interval.as_millis() as u64, "watcher started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.pass_blocking().await {
                        error!(error = %e, "reconciliation pass failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("watcher shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// `run_once` off the async workers; KV and executor calls block.
    async fn pass_blocking(&self) -> WatcherResult<PassReport> {
        let watcher = self.clone();
        tokio::task::spawn_blocking(move || watcher.run_once())
            .await
            .map_err(|e| WatcherError::Task(e.to_string()))?
    }

    fn reconcile(&self, target: Target<'_>, raw: &str, report: &mut PassReport) -> WatcherResult<()> {
        let status = ResourceStatus::parse(raw);
        let ddl = match status.kind {
            StatusKind::PendingCreate => target.create_ddl(),
            StatusKind::PendingDrop => target.drop_ddl(),
            StatusKind::Unknown => {
                warn!(%target, status = %raw, "unknown status, skipped");
                report.unknown += 1;
                return Ok(());
            }
            StatusKind::Ready | StatusKind::Failed | StatusKind::DoNotUse => return Ok(()),
        };

        debug!(%ddl, options = %status.payload, "executing");
        match ddl.run_on(self.executor.as_ref(), &status.payload) {
            Err(e) => {
                warn!(%ddl, error = %e, "ddl failed");
                let failed = ResourceStatus::failed(ddl.to_string());
                if self.replace_status(target, raw, &failed)? {
                    report.failed += 1;
                } else {
                    self.lost_race(&ddl, report);
                }
            }
            Ok(false) => {
                debug!(%ddl, "executor deferred, retrying next pass");
                report.skipped += 1;
            }
            Ok(true) if ddl.is_create() => {
                if self.replace_status(target, raw, &ResourceStatus::ready())? {
                    info!(%ddl, "ready");
                    report.created += 1;
                } else {
                    self.lost_race(&ddl, report);
                }
            }
            Ok(true) => {
                if self.remove(target, raw)? {
                    info!(%ddl, "removed from css");
                    report.dropped += 1;
                } else {
                    self.lost_race(&ddl, report);
                }
            }
        }
        Ok(())
    }

    fn lost_race(&self, ddl: &Ddl, report: &mut PassReport) {
        debug!(%ddl, "status changed concurrently, result not recorded");
        report.lost_races += 1;
    }

    fn replace_status(
        &self,
        target: Target<'_>,
        expected: &str,
        status: &ResourceStatus,
    ) -> WatcherResult<bool> {
        let css = self.css.css();
        let replaced = match target {
            Target::Db { db } => css.replace_db_status(db, expected, status)?,
            Target::Table { db, table } => css.replace_table_status(db, table, expected, status)?,
        };
        Ok(replaced)
    }

    fn remove(&self, target: Target<'_>, expected: &str) -> WatcherResult<bool> {
        let css = self.css.css();
        let removed = match target {
            Target::Db { db } => css.remove_db_if(db, expected)?,
            Target::Table { db, table } => css.remove_table_if(db, table, expected)?,
        };
        Ok(removed)
    }
}

#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Db { db: &'a str },
    Table { db: &'a str, table: &'a str },
}

impl Target<'_> {
    fn create_ddl(self) -> Ddl {
        match self {
            Self::Db { db } => Ddl::CreateDb { db: db.into() },
            Self::Table { db, table } => Ddl::CreateTable {
                db: db.into(),
                table: table.into(),
            },
        }
    }

    fn drop_ddl(self) -> Ddl {
        match self {
            Self::Db { db } => Ddl::DropDb { db: db.into() },
            Self::Table { db, table } => Ddl::DropTable {
                db: db.into(),
                table: table.into(),
            },
        }
    }
}

impl std::fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db { db } => write!(f, "{db}"),
            Self::Table { db, table } => write!(f, "{db}.{table}"),
        }
    }
}

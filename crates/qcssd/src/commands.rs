//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use qcss_core::{ChunkId, QcssConfig, ResourceStatus, StatusKind};
use qcss_css::CssAccess;
use qcss_placement::ChunkMapping;
use qcss_watcher::{DryRunExecutor, Watcher, WatcherCss};

/// Run the watcher until Ctrl-C, or for one pass.
///
/// DDL goes through [`DryRunExecutor`]; programs embedding the watcher
/// supply their own executor.
pub async fn watch(css: CssAccess, config: &QcssConfig, once: bool) -> anyhow::Result<()> {
    let watcher = Watcher::new(WatcherCss::new(css), Arc::new(DryRunExecutor))
        .with_interval(Duration::from_secs(config.watcher.interval_secs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if once {
        watcher.run(true, shutdown_rx).await?;
        return Ok(());
    }

    let handle = tokio::spawn(async move { watcher.run(false, shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    handle.await??;
    info!("qcssd stopped");
    Ok(())
}

/// Resolve `chunks` to workers, in the order given.
pub fn assign(
    css: CssAccess,
    db: &str,
    table: &str,
    chunks: &[ChunkId],
    workers: Vec<String>,
    save: bool,
) -> anyhow::Result<Vec<(ChunkId, String)>> {
    let mut mapping = ChunkMapping::new(workers, db, table, Some(css))?;
    let assigned = chunks
        .iter()
        .map(|&chunk| Ok((chunk, mapping.worker(chunk)?)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if save {
        let saved = mapping.save()?;
        info!(%db, %table, saved, "assignments recorded");
    }
    Ok(assigned)
}

pub fn dump(css: &CssAccess, path: &str) -> anyhow::Result<String> {
    Ok(css.kv().dump(path)?)
}

/// Write `raw` as the status of a database or table, registering it if
/// absent. Used to re-issue `PENDING_*` after a failure.
pub fn set_status(
    css: &CssAccess,
    db: &str,
    table: Option<&str>,
    raw: &str,
) -> anyhow::Result<()> {
    let status = ResourceStatus::parse(raw);
    if status.kind == StatusKind::Unknown {
        anyhow::bail!("not a valid status: {raw:?}");
    }

    match table {
        None if css.db_status(db)?.is_some() => css.set_db_status(db, &status)?,
        None => css.create_db(db, &status)?,
        Some(table) if css.table_status(db, table)?.is_some() => {
            css.set_table_status(db, table, &status)?
        }
        Some(table) => css.create_table(db, table, &status)?,
    }
    info!(%db, table = table.unwrap_or("-"), %status, "status written");
    Ok(())
}

//! CssAccess — database, table and chunk records over a KV tree.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use qcss_core::layout::{self, DBS, REPLICAS};
use qcss_core::{ChunkId, ChunkMap, ResourceStatus};
use qcss_kv::{CreateMode, KvError, KvTree, path};

use crate::error::{CssError, CssResult};
use crate::replica::ReplicaRecord;

/// Cheaply cloneable handle to the CSS.
#[derive(Clone)]
pub struct CssAccess {
    kv: Arc<dyn KvTree>,
}

impl CssAccess {
    pub fn new(kv: Arc<dyn KvTree>) -> Self {
        Self { kv }
    }

    /// The underlying tree.
    pub fn kv(&self) -> &dyn KvTree {
        self.kv.as_ref()
    }

    /// Create an empty container node unless it already exists.
    fn ensure(&self, node: &str) -> CssResult<()> {
        match self.kv.create(node, "", CreateMode::PERSISTENT) {
            Ok(_) | Err(KvError::KeyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // ── Registration ───────────────────────────────────────────────

    /// Register a database with an initial status.
    pub fn create_db(&self, db: &str, status: &ResourceStatus) -> CssResult<()> {
        self.ensure(DBS)?;
        self.kv
            .create(&layout::db_path(db), &status.format(), CreateMode::PERSISTENT)?;
        info!(%db, %status, "database registered");
        Ok(())
    }

    /// Register a table with an initial status. The database must exist.
    pub fn create_table(&self, db: &str, table: &str, status: &ResourceStatus) -> CssResult<()> {
        if !self.kv.exists(&layout::db_path(db))? {
            return Err(CssError::NoSuchDb(db.to_string()));
        }
        self.ensure(&layout::tables_path(db))?;
        self.kv.create(
            &layout::table_path(db, table),
            &status.format(),
            CreateMode::PERSISTENT,
        )?;
        info!(%db, %table, %status, "table registered");
        Ok(())
    }

    // ── Enumeration ────────────────────────────────────────────────

    /// All registered database names; empty when `/DBS` does not exist.
    pub fn db_names(&self) -> CssResult<Vec<String>> {
        Ok(self.kv.children_or_none(DBS)?.unwrap_or_default())
    }

    /// Table names of a database; `None` if the database does not exist.
    pub fn table_names(&self, db: &str) -> CssResult<Option<Vec<String>>> {
        if let Some(tables) = self.kv.children_or_none(&layout::tables_path(db))? {
            return Ok(Some(tables));
        }
        // No TABLES container: either no tables yet, or no database.
        if self.kv.exists(&layout::db_path(db))? {
            Ok(Some(Vec::new()))
        } else {
            Ok(None)
        }
    }

    // ── Status ─────────────────────────────────────────────────────

    /// Raw status string of a database; `None` if it does not exist.
    pub fn db_status(&self, db: &str) -> CssResult<Option<String>> {
        Ok(self.kv.get_or_none(&layout::db_path(db))?)
    }

    /// Raw status string of a table; `None` if it does not exist.
    pub fn table_status(&self, db: &str, table: &str) -> CssResult<Option<String>> {
        Ok(self.kv.get_or_none(&layout::table_path(db, table))?)
    }

    pub fn set_db_status(&self, db: &str, status: &ResourceStatus) -> CssResult<()> {
        match self.kv.set(&layout::db_path(db), &status.format()) {
            Err(KvError::KeyDoesNotExist(_)) => Err(CssError::NoSuchDb(db.to_string())),
            other => Ok(other?),
        }
    }

    pub fn set_table_status(
        &self,
        db: &str,
        table: &str,
        status: &ResourceStatus,
    ) -> CssResult<()> {
        match self.kv.set(&layout::table_path(db, table), &status.format()) {
            Err(KvError::KeyDoesNotExist(_)) => Err(CssError::NoSuchTable {
                db: db.to_string(),
                table: table.to_string(),
            }),
            other => Ok(other?),
        }
    }

    /// Write `status` only if the database still holds `expected`.
    pub fn replace_db_status(
        &self,
        db: &str,
        expected: &str,
        status: &ResourceStatus,
    ) -> CssResult<bool> {
        Ok(self
            .kv
            .set_if(&layout::db_path(db), expected, &status.format())?)
    }

    /// Write `status` only if the table still holds `expected`.
    pub fn replace_table_status(
        &self,
        db: &str,
        table: &str,
        expected: &str,
        status: &ResourceStatus,
    ) -> CssResult<bool> {
        Ok(self
            .kv
            .set_if(&layout::table_path(db, table), expected, &status.format())?)
    }

    /// Remove the database subtree only if it still holds `expected`.
    pub fn remove_db_if(&self, db: &str, expected: &str) -> CssResult<bool> {
        Ok(self.kv.delete_if(&layout::db_path(db), expected, true)?)
    }

    /// Remove the table subtree only if it still holds `expected`.
    pub fn remove_table_if(&self, db: &str, table: &str, expected: &str) -> CssResult<bool> {
        Ok(self
            .kv
            .delete_if(&layout::table_path(db, table), expected, true)?)
    }

    // ── Chunks ─────────────────────────────────────────────────────

    /// Chunk → workers recorded for a table.
    ///
    /// `None` if the table (or its database) does not exist. Chunks whose
    /// replicas are all gone are left out.
    pub fn lookup_chunks(&self, db: &str, table: &str) -> CssResult<Option<ChunkMap>> {
        if !self.kv.exists(&layout::table_path(db, table))? {
            debug!(%db, %table, "no such table, no chunks");
            return Ok(None);
        }

        let chunks_path = layout::chunks_path(db, table);
        let mut chunks = ChunkMap::new();
        let Some(names) = self.kv.children_or_none(&chunks_path)? else {
            return Ok(Some(chunks));
        };

        for name in names {
            let Ok(chunk) = name.parse::<ChunkId>() else {
                warn!(%db, %table, node = %name, "ignoring non-numeric chunk node");
                continue;
            };
            let replicas_path = path::join(&path::join(&chunks_path, &name), REPLICAS);
            let Some(replicas) = self.kv.children_or_none(&replicas_path)? else {
                continue;
            };

            let mut workers = BTreeSet::new();
            for replica in replicas {
                let replica_path = path::join(&replicas_path, &replica);
                if let Some(record) = ReplicaRecord::read(self.kv(), &replica_path)? {
                    workers.insert(record.node_name);
                }
            }
            if !workers.is_empty() {
                chunks.entry(chunk).or_default().extend(workers);
            }
        }

        debug!(%db, %table, chunks = chunks.len(), "chunk map loaded");
        Ok(Some(chunks))
    }

    /// Record one replica per worker for a chunk of a table.
    pub fn add_chunk(
        &self,
        db: &str,
        table: &str,
        chunk: ChunkId,
        workers: &[String],
    ) -> CssResult<()> {
        if !self.kv.exists(&layout::table_path(db, table))? {
            return Err(CssError::NoSuchTable {
                db: db.to_string(),
                table: table.to_string(),
            });
        }
        self.ensure(&layout::chunks_path(db, table))?;
        self.ensure(&layout::chunk_path(db, table, chunk))?;
        let replicas_path = layout::replicas_path(db, table, chunk);
        self.ensure(&replicas_path)?;

        for worker in workers {
            let packed = ReplicaRecord::new(worker.as_str()).to_packed()?;
            let real = self.kv.create(
                &format!("{replicas_path}/"),
                &packed,
                CreateMode::SEQUENTIAL,
            )?;
            debug!(path = %real, %worker, "replica recorded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcss_core::StatusKind;
    use qcss_kv::{MemoryKvTree, RedbKvTree};

    fn css() -> CssAccess {
        CssAccess::new(Arc::new(MemoryKvTree::new()))
    }

    fn workers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ── Registration / enumeration ─────────────────────────────────

    #[test]
    fn empty_css_has_no_dbs() {
        let css = css();
        assert!(css.db_names().unwrap().is_empty());
        assert_eq!(css.table_names("DB1").unwrap(), None);
        assert_eq!(css.db_status("DB1").unwrap(), None);
    }

    #[test]
    fn register_db_and_tables() {
        let css = css();
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        assert_eq!(css.table_names("DB1").unwrap(), Some(vec![]));

        css.create_table("DB1", "T2", &ResourceStatus::pending_create("k"))
            .unwrap();
        css.create_table("DB1", "T1", &ResourceStatus::ready()).unwrap();

        assert_eq!(css.db_names().unwrap(), vec!["DB1"]);
        assert_eq!(
            css.table_names("DB1").unwrap(),
            Some(vec!["T1".to_string(), "T2".to_string()])
        );
        assert_eq!(
            css.table_status("DB1", "T2").unwrap().as_deref(),
            Some("PENDING_CREATE:k")
        );
    }

    #[test]
    fn create_table_requires_db() {
        let css = css();
        assert!(matches!(
            css.create_table("DB1", "T1", &ResourceStatus::ready()),
            Err(CssError::NoSuchDb(_))
        ));
    }

    #[test]
    fn duplicate_db_is_kv_error() {
        let css = css();
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        assert!(matches!(
            css.create_db("DB1", &ResourceStatus::ready()),
            Err(CssError::Kv(KvError::KeyExists(_)))
        ));
    }

    // ── Status ─────────────────────────────────────────────────────

    #[test]
    fn set_status_on_missing_resource() {
        let css = css();
        assert!(matches!(
            css.set_db_status("DB1", &ResourceStatus::ready()),
            Err(CssError::NoSuchDb(_))
        ));
        assert!(matches!(
            css.set_table_status("DB1", "T1", &ResourceStatus::ready()),
            Err(CssError::NoSuchTable { .. })
        ));
    }

    #[test]
    fn conditional_status_writes() {
        let css = css();
        css.create_db("DB1", &ResourceStatus::pending_create("1")).unwrap();

        assert!(
            !css.replace_db_status("DB1", "READY", &ResourceStatus::failed("x"))
                .unwrap()
        );
        assert!(
            css.replace_db_status("DB1", "PENDING_CREATE:1", &ResourceStatus::ready())
                .unwrap()
        );
        let status = ResourceStatus::parse(&css.db_status("DB1").unwrap().unwrap());
        assert_eq!(status.kind, StatusKind::Ready);

        assert!(!css.remove_db_if("DB1", "PENDING_CREATE:1").unwrap());
        assert!(css.remove_db_if("DB1", "READY").unwrap());
        assert!(css.db_names().unwrap().is_empty());
    }

    // ── Chunks ─────────────────────────────────────────────────────

    #[test]
    fn lookup_chunks_for_missing_table() {
        let css = css();
        assert_eq!(css.lookup_chunks("DB1", "T1").unwrap(), None);
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        assert_eq!(css.lookup_chunks("DB1", "T1").unwrap(), None);
        css.create_table("DB1", "T1", &ResourceStatus::ready()).unwrap();
        assert_eq!(css.lookup_chunks("DB1", "T1").unwrap(), Some(ChunkMap::new()));
    }

    #[test]
    fn add_and_lookup_chunks() {
        let css = css();
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        css.create_table("DB1", "T1", &ResourceStatus::ready()).unwrap();

        css.add_chunk("DB1", "T1", 333, &workers(&["worker333"])).unwrap();
        css.add_chunk("DB1", "T1", 7, &workers(&["w2", "w1"])).unwrap();
        css.add_chunk("DB1", "T1", 7, &workers(&["w3"])).unwrap();

        let chunks = css.lookup_chunks("DB1", "T1").unwrap().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[&7].iter().cloned().collect::<Vec<_>>(),
            vec!["w1", "w2", "w3"]
        );
        assert!(chunks[&333].contains("worker333"));

        let replicas = css
            .kv()
            .get_children("/DBS/DB1/TABLES/T1/CHUNKS/7/REPLICAS")
            .unwrap();
        assert_eq!(replicas.len(), 3);
    }

    #[test]
    fn add_chunk_requires_table() {
        let css = css();
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        assert!(matches!(
            css.add_chunk("DB1", "T1", 1, &workers(&["w1"])),
            Err(CssError::NoSuchTable { .. })
        ));
    }

    #[test]
    fn lookup_reads_unpacked_replicas_and_skips_junk() {
        let css = css();
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        css.create_table("DB1", "T1", &ResourceStatus::ready()).unwrap();
        let kv = css.kv();
        let base = "/DBS/DB1/TABLES/T1/CHUNKS";
        kv.create(base, "", CreateMode::PERSISTENT).unwrap();
        kv.create(&format!("{base}/12"), "", CreateMode::PERSISTENT).unwrap();
        kv.create(&format!("{base}/12/REPLICAS"), "", CreateMode::PERSISTENT).unwrap();
        kv.create(&format!("{base}/12/REPLICAS/0"), "", CreateMode::PERSISTENT).unwrap();
        kv.create(&format!("{base}/12/REPLICAS/0/nodeName"), "w12", CreateMode::PERSISTENT)
            .unwrap();
        // Chunk without replicas and a non-numeric node.
        kv.create(&format!("{base}/13"), "", CreateMode::PERSISTENT).unwrap();
        kv.create(&format!("{base}/junk"), "", CreateMode::PERSISTENT).unwrap();

        let chunks = css.lookup_chunks("DB1", "T1").unwrap().unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[&12].contains("w12"));
    }

    #[test]
    fn works_over_redb_backend() {
        let css = CssAccess::new(Arc::new(RedbKvTree::open_in_memory().unwrap()));
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        css.create_table("DB1", "T1", &ResourceStatus::ready()).unwrap();
        css.add_chunk("DB1", "T1", 1, &workers(&["w1"])).unwrap();

        let chunks = css.lookup_chunks("DB1", "T1").unwrap().unwrap();
        assert!(chunks[&1].contains("w1"));
    }
}

//! ChunkMapping — session-scoped chunk → worker assignment.
//!
//! Resolution order for `worker(chunk)`:
//! 1. a chunk already resolved in this session keeps its worker
//! 2. a chunk recorded for this table stays where it is
//! 3. a chunk recorded for another table of the database follows that
//!    placement, and is remembered so `save()` records it for this table
//! 4. anything else goes to the next worker of the round-robin ring
//!
//! When a recorded chunk lists several workers, the first candidate worker
//! in name order wins; if none of them is a candidate, the first recorded
//! worker in name order wins.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use qcss_core::{ChunkId, ChunkMap};
use qcss_css::CssAccess;

use crate::error::{MappingError, MappingResult};
use crate::ring::WorkerRing;

pub struct ChunkMapping {
    db: String,
    table: String,
    ring: WorkerRing,
    css: Option<CssAccess>,
    /// Chunks of every table in the database, workers merged.
    all_chunks: ChunkMap,
    /// Chunks recorded for this table.
    table_chunks: ChunkMap,
    /// Chunks resolved this session that this table has not recorded.
    new_chunks: BTreeMap<ChunkId, String>,
}

impl ChunkMapping {
    /// Build a mapping for `db`.`table`.
    ///
    /// With a CSS handle, the chunk placements of every table of the
    /// database are loaded up front. A database or table missing from the
    /// CSS simply contributes nothing.
    pub fn new(
        workers: Vec<String>,
        db: &str,
        table: &str,
        css: Option<CssAccess>,
    ) -> MappingResult<Self> {
        let (all_chunks, table_chunks) = match &css {
            Some(css) => load_chunks(css, db, table)?,
            None => (ChunkMap::new(), ChunkMap::new()),
        };

        debug!(
            %db,
            %table,
            workers = workers.len(),
            known_chunks = all_chunks.len(),
            table_chunks = table_chunks.len(),
            "chunk mapping created"
        );

        Ok(Self {
            db: db.to_string(),
            table: table.to_string(),
            ring: WorkerRing::new(workers),
            css,
            all_chunks,
            table_chunks,
            new_chunks: BTreeMap::new(),
        })
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Chunks `save()` would record, with their workers.
    pub fn new_chunks(&self) -> &BTreeMap<ChunkId, String> {
        &self.new_chunks
    }

    /// Candidate workers in round-robin order, next selection first.
    pub fn workers(&self) -> impl Iterator<Item = &str> {
        self.ring.iter()
    }

    /// Worker hosting `chunk`.
    ///
    /// Only mutates in-memory state; nothing is written until `save()`.
    pub fn worker(&mut self, chunk: ChunkId) -> MappingResult<String> {
        if let Some(worker) = self.new_chunks.get(&chunk) {
            return Ok(worker.clone());
        }

        if let Some(worker) = self
            .table_chunks
            .get(&chunk)
            .and_then(|recorded| pick(&self.ring, recorded))
        {
            debug!(chunk, %worker, "chunk recorded for this table");
            return Ok(worker);
        }

        if let Some(worker) = self
            .all_chunks
            .get(&chunk)
            .and_then(|recorded| pick(&self.ring, recorded))
        {
            debug!(chunk, %worker, "chunk recorded for another table");
            self.new_chunks.insert(chunk, worker.clone());
            return Ok(worker);
        }

        let worker = self.ring.next().ok_or_else(|| MappingError::EmptyWorkerList {
            db: self.db.clone(),
            table: self.table.clone(),
            chunk,
        })?;
        debug!(chunk, %worker, "new chunk placed round-robin");
        self.new_chunks.insert(chunk, worker.clone());
        Ok(worker)
    }

    /// Record this session's new chunks for the table in the CSS.
    ///
    /// Returns the number of chunks written. Chunks already recorded with
    /// the same worker (e.g. by an earlier `save()`) are skipped. Without a
    /// CSS handle this is a no-op.
    pub fn save(&mut self) -> MappingResult<usize> {
        let Some(css) = &self.css else {
            debug!(db = %self.db, table = %self.table, "no css handle, nothing saved");
            return Ok(0);
        };

        let mut saved = 0;
        for (chunk, worker) in &self.new_chunks {
            let recorded = self
                .table_chunks
                .get(chunk)
                .is_some_and(|workers| workers.contains(worker));
            if recorded {
                continue;
            }
            css.add_chunk(&self.db, &self.table, *chunk, std::slice::from_ref(worker))?;
            self.table_chunks
                .entry(*chunk)
                .or_default()
                .insert(worker.clone());
            saved += 1;
        }

        info!(db = %self.db, table = %self.table, saved, "chunk mapping saved");
        Ok(saved)
    }
}

/// Merge the chunk maps of every table of `db`; also return `table`'s own.
fn load_chunks(css: &CssAccess, db: &str, table: &str) -> MappingResult<(ChunkMap, ChunkMap)> {
    let mut all_chunks = ChunkMap::new();
    let mut table_chunks = ChunkMap::new();

    let Some(tables) = css.table_names(db)? else {
        debug!(%db, "database not in css, no recorded chunks");
        return Ok((all_chunks, table_chunks));
    };

    for name in tables {
        // A table dropped since listing contributes nothing.
        let Some(chunks) = css.lookup_chunks(db, &name)? else {
            continue;
        };
        for (chunk, workers) in &chunks {
            all_chunks
                .entry(*chunk)
                .or_default()
                .extend(workers.iter().cloned());
        }
        if name == table {
            table_chunks = chunks;
        }
    }
    Ok((all_chunks, table_chunks))
}

/// First recorded worker that is a candidate, else first recorded worker.
fn pick(ring: &WorkerRing, recorded: &BTreeSet<String>) -> Option<String> {
    recorded
        .iter()
        .find(|worker| ring.contains(worker))
        .or_else(|| recorded.iter().next())
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use qcss_core::ResourceStatus;
    use qcss_kv::{CreateMode, KvResult, KvTree, MemoryKvTree};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// DB1 with an empty TBL and a TBL123 placing chunk 765 on worker765.
    fn primed_css() -> CssAccess {
        let css = CssAccess::new(Arc::new(MemoryKvTree::new()));
        css.create_db("DB1", &ResourceStatus::ready()).unwrap();
        css.create_table("DB1", "TBL", &ResourceStatus::ready()).unwrap();
        css.create_table("DB1", "TBL123", &ResourceStatus::ready()).unwrap();
        css.add_chunk("DB1", "TBL123", 765, &names(&["worker765"])).unwrap();
        css
    }

    /// Deletes `victim` right after `listed` has been listed, the way a
    /// concurrent admin drop lands between a listing and the reads.
    struct VanishingTree {
        inner: MemoryKvTree,
        listed: &'static str,
        victim: &'static str,
    }

    impl KvTree for VanishingTree {
        fn create(&self, path: &str, value: &str, mode: CreateMode) -> KvResult<String> {
            self.inner.create(path, value, mode)
        }

        fn exists(&self, path: &str) -> KvResult<bool> {
            self.inner.exists(path)
        }

        fn get(&self, path: &str) -> KvResult<String> {
            self.inner.get(path)
        }

        fn get_children(&self, path: &str) -> KvResult<Vec<String>> {
            let children = self.inner.get_children(path)?;
            if path == self.listed {
                let _ = self.inner.delete(self.victim, true);
            }
            Ok(children)
        }

        fn set(&self, path: &str, value: &str) -> KvResult<()> {
            self.inner.set(path, value)
        }

        fn delete(&self, path: &str, recursive: bool) -> KvResult<()> {
            self.inner.delete(path, recursive)
        }

        fn set_if(&self, path: &str, expected: &str, value: &str) -> KvResult<bool> {
            self.inner.set_if(path, expected, value)
        }

        fn delete_if(&self, path: &str, expected: &str, recursive: bool) -> KvResult<bool> {
            self.inner.delete_if(path, expected, recursive)
        }
    }

    // ── Without CSS ────────────────────────────────────────────────

    #[test]
    fn round_robin_over_new_chunks() {
        let mut mapper =
            ChunkMapping::new(names(&["worker1", "worker2"]), "DB1", "TBL", None).unwrap();

        for chunk in 0..10 {
            let expected = if chunk % 2 == 0 { "worker1" } else { "worker2" };
            assert_eq!(mapper.worker(chunk).unwrap(), expected, "chunk {chunk}");
        }
    }

    #[test]
    fn round_robin_cycles_through_all_workers() {
        let workers = names(&["a", "b", "c"]);
        let mut mapper = ChunkMapping::new(workers.clone(), "DB1", "TBL", None).unwrap();

        let got: Vec<String> = (100..107).map(|c| mapper.worker(c).unwrap()).collect();
        assert_eq!(got, names(&["a", "b", "c", "a", "b", "c", "a"]));
    }

    #[test]
    fn repeated_calls_return_same_worker() {
        let mut mapper =
            ChunkMapping::new(names(&["worker1", "worker2"]), "DB1", "TBL", None).unwrap();

        let first = mapper.worker(42).unwrap();
        let _ = mapper.worker(43).unwrap();
        assert_eq!(mapper.worker(42).unwrap(), first);
        assert_eq!(mapper.new_chunks().len(), 2);
    }

    #[test]
    fn empty_worker_list_fails_for_new_chunk() {
        let mut mapper = ChunkMapping::new(vec![], "DB1", "TBL", None).unwrap();
        let err = mapper.worker(1).unwrap_err();
        assert!(matches!(err, MappingError::EmptyWorkerList { chunk: 1, .. }));
    }

    #[test]
    fn save_without_css_is_noop() {
        let mut mapper = ChunkMapping::new(names(&["w1"]), "DB1", "TBL", None).unwrap();
        mapper.worker(1).unwrap();
        assert_eq!(mapper.save().unwrap(), 0);
    }

    // ── With CSS ───────────────────────────────────────────────────

    #[test]
    fn missing_db_or_table_starts_empty() {
        let css = CssAccess::new(Arc::new(MemoryKvTree::new()));
        let mut mapper =
            ChunkMapping::new(names(&["w1"]), "NODB", "TBL", Some(css.clone())).unwrap();
        assert_eq!(mapper.worker(5).unwrap(), "w1");

        let css = primed_css();
        let mut mapper = ChunkMapping::new(names(&["w1"]), "DB1", "NOTABLE", Some(css)).unwrap();
        // Other tables of the database still count.
        assert_eq!(mapper.worker(765).unwrap(), "worker765");
    }

    #[test]
    fn recorded_placement_wins_outside_candidates() {
        let css = primed_css();
        css.add_chunk("DB1", "TBL", 333, &names(&["worker333"])).unwrap();

        let mut mapper =
            ChunkMapping::new(names(&["worker1", "worker2"]), "DB1", "TBL", Some(css)).unwrap();

        assert_eq!(mapper.worker(333).unwrap(), "worker333");
        // Already recorded for this table: nothing new to save.
        assert!(mapper.new_chunks().is_empty());
        // The ring did not move.
        assert_eq!(mapper.worker(1).unwrap(), "worker1");
    }

    #[test]
    fn cross_table_placement_is_followed_and_saved() {
        let css = primed_css();
        let mut mapper = ChunkMapping::new(
            names(&["worker1", "worker2"]),
            "DB1",
            "TBL",
            Some(css.clone()),
        )
        .unwrap();

        assert_eq!(mapper.worker(765).unwrap(), "worker765");
        assert_eq!(mapper.new_chunks().get(&765).map(String::as_str), Some("worker765"));

        assert_eq!(mapper.save().unwrap(), 1);
        let recorded = css.lookup_chunks("DB1", "TBL").unwrap().unwrap();
        assert!(recorded[&765].contains("worker765"));
    }

    #[test]
    fn candidate_worker_preferred_among_replicas() {
        let css = primed_css();
        css.add_chunk("DB1", "TBL", 10, &names(&["wa", "wb"])).unwrap();
        css.add_chunk("DB1", "TBL", 11, &names(&["wz", "wy"])).unwrap();

        let mut mapper =
            ChunkMapping::new(names(&["wb", "wc"]), "DB1", "TBL", Some(css)).unwrap();

        assert_eq!(mapper.worker(10).unwrap(), "wb");
        // No candidate among the replicas: smallest recorded name.
        assert_eq!(mapper.worker(11).unwrap(), "wy");
    }

    #[test]
    fn save_and_reload_keeps_assignments() {
        let css = primed_css();
        {
            let mut mapper = ChunkMapping::new(
                names(&["worker1", "worker2"]),
                "DB1",
                "TBL",
                Some(css.clone()),
            )
            .unwrap();
            assert_eq!(mapper.worker(1).unwrap(), "worker1");
            assert_eq!(mapper.worker(2).unwrap(), "worker2");
            assert_eq!(mapper.save().unwrap(), 2);
        }

        let mut mapper = ChunkMapping::new(
            names(&["worker1000", "worker2000"]),
            "DB1",
            "TBL",
            Some(css),
        )
        .unwrap();
        assert_eq!(mapper.worker(1).unwrap(), "worker1");
        assert_eq!(mapper.worker(2).unwrap(), "worker2");
        assert_eq!(mapper.worker(3).unwrap(), "worker1000");
        assert_eq!(mapper.worker(4).unwrap(), "worker2000");
    }

    #[test]
    fn second_save_writes_nothing() {
        let css = primed_css();
        let mut mapper =
            ChunkMapping::new(names(&["w1"]), "DB1", "TBL", Some(css.clone())).unwrap();
        mapper.worker(1).unwrap();

        assert_eq!(mapper.save().unwrap(), 1);
        assert_eq!(mapper.save().unwrap(), 0);
        let replicas = css
            .kv()
            .get_children("/DBS/DB1/TABLES/TBL/CHUNKS/1/REPLICAS")
            .unwrap();
        assert_eq!(replicas.len(), 1);
    }

    #[test]
    fn save_fails_when_table_is_gone() {
        let css = primed_css();
        let mut mapper =
            ChunkMapping::new(names(&["w1"]), "DB1", "TBL", Some(css.clone())).unwrap();
        mapper.worker(1).unwrap();
        css.kv().delete("/DBS/DB1/TABLES/TBL", true).unwrap();

        assert!(matches!(mapper.save(), Err(MappingError::Css(_))));
    }

    #[test]
    fn empty_worker_list_is_fine_for_recorded_chunks() {
        let css = primed_css();
        let mut mapper = ChunkMapping::new(vec![], "DB1", "TBL", Some(css)).unwrap();
        assert_eq!(mapper.worker(765).unwrap(), "worker765");
        assert!(matches!(
            mapper.worker(766),
            Err(MappingError::EmptyWorkerList { .. })
        ));
    }

    #[test]
    fn table_dropped_during_preload_contributes_nothing() {
        let inner = MemoryKvTree::new();
        let primed = CssAccess::new(Arc::new(inner.clone()));
        primed.create_db("DB1", &ResourceStatus::ready()).unwrap();
        primed.create_table("DB1", "TBL", &ResourceStatus::ready()).unwrap();
        primed.create_table("DB1", "TBL123", &ResourceStatus::ready()).unwrap();
        primed.add_chunk("DB1", "TBL123", 765, &names(&["worker765"])).unwrap();

        let css = CssAccess::new(Arc::new(VanishingTree {
            inner,
            listed: "/DBS/DB1/TABLES",
            victim: "/DBS/DB1/TABLES/TBL123",
        }));
        let mut mapper = ChunkMapping::new(names(&["w1"]), "DB1", "TBL", Some(css)).unwrap();

        // TBL123 and its placement of 765 vanished before they were read.
        assert_eq!(mapper.worker(765).unwrap(), "w1");
        assert_eq!(primed.table_names("DB1").unwrap(), Some(names(&["TBL"])));
    }
}

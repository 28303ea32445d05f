//! RedbKvTree — redb-backed persistent KV tree.
//!
//! Every node is one row of the `nodes` table, keyed by absolute path,
//! with a JSON-serialized record as value. Path order is key order, so a
//! subtree is a contiguous range scan. Each tree operation runs in a single
//! redb transaction; a failed write operation aborts and leaves no trace.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, WriteTransaction};
use tracing::{debug, info};

use crate::error::{KvError, KvResult};
use crate::node::{self, NodeRead, NodeRecord, NodeWrite};
use crate::tables::NODES;
use crate::tree::{CreateMode, KvTree};

/// Convert any `Display` error into a `KvError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| KvError::$variant(e.to_string())
    };
}

fn load_from<T>(table: &T, path: &str) -> KvResult<Option<NodeRecord>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(path).map_err(map_err!(Storage))? {
        Some(guard) => Ok(Some(NodeRecord::from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

fn paths_from<T>(table: &T, prefix: &str) -> KvResult<Vec<String>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut paths = Vec::new();
    for entry in table.range(prefix..).map_err(map_err!(Storage))? {
        let (key, _) = entry.map_err(map_err!(Storage))?;
        let key = key.value();
        if !key.starts_with(prefix) {
            break;
        }
        paths.push(key.to_string());
    }
    Ok(paths)
}

struct ReadNodes {
    txn: ReadTransaction,
}

impl NodeRead for ReadNodes {
    fn load(&self, path: &str) -> KvResult<Option<NodeRecord>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Storage))?;
        load_from(&table, path)
    }

    fn paths_with_prefix(&self, prefix: &str) -> KvResult<Vec<String>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Storage))?;
        paths_from(&table, prefix)
    }
}

struct WriteNodes<'a> {
    txn: &'a WriteTransaction,
}

impl NodeRead for WriteNodes<'_> {
    fn load(&self, path: &str) -> KvResult<Option<NodeRecord>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Storage))?;
        load_from(&table, path)
    }

    fn paths_with_prefix(&self, prefix: &str) -> KvResult<Vec<String>> {
        let table = self.txn.open_table(NODES).map_err(map_err!(Storage))?;
        paths_from(&table, prefix)
    }
}

impl NodeWrite for WriteNodes<'_> {
    fn store(&mut self, path: &str, record: &NodeRecord) -> KvResult<()> {
        let value = record.to_bytes()?;
        let mut table = self.txn.open_table(NODES).map_err(map_err!(Storage))?;
        table
            .insert(path, value.as_slice())
            .map_err(map_err!(Storage))?;
        Ok(())
    }

    fn remove(&mut self, path: &str) -> KvResult<()> {
        let mut table = self.txn.open_table(NODES).map_err(map_err!(Storage))?;
        table.remove(path).map_err(map_err!(Storage))?;
        Ok(())
    }
}

/// Thread-safe KV tree backed by redb.
#[derive(Clone)]
pub struct RedbKvTree {
    db: Arc<Database>,
}

impl RedbKvTree {
    /// Open (or create) a persistent tree at the given path.
    ///
    /// Ephemeral nodes left behind by a previous process are removed.
    pub fn open(path: &Path) -> KvResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let tree = Self { db: Arc::new(db) };
        tree.prepare()?;
        debug!(?path, "kv tree opened");
        Ok(tree)
    }

    /// Create an ephemeral in-memory tree (for testing).
    pub fn open_in_memory() -> KvResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let tree = Self { db: Arc::new(db) };
        tree.prepare()?;
        debug!("in-memory kv tree opened");
        Ok(tree)
    }

    /// Create the table and root node if absent; drop stale ephemerals.
    fn prepare(&self) -> KvResult<()> {
        let purged = self.write(|nodes| {
            node::ensure_root(nodes)?;
            node::purge_ephemeral(nodes)
        })?;
        if !purged.is_empty() {
            info!(count = purged.len(), "removed ephemeral nodes from previous session");
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&ReadNodes) -> KvResult<T>) -> KvResult<T> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        f(&ReadNodes { txn })
    }

    fn write<T>(&self, f: impl FnOnce(&mut WriteNodes<'_>) -> KvResult<T>) -> KvResult<T> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(NODES).map_err(map_err!(Storage))?;
        let result = f(&mut WriteNodes { txn: &txn })?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(result)
    }
}

impl KvTree for RedbKvTree {
    fn create(&self, path: &str, value: &str, mode: CreateMode) -> KvResult<String> {
        let real = self.write(|nodes| node::create(nodes, path, value, mode))?;
        debug!(path = %real, "node created");
        Ok(real)
    }

    fn exists(&self, path: &str) -> KvResult<bool> {
        self.read(|nodes| node::exists(nodes, path))
    }

    fn get(&self, path: &str) -> KvResult<String> {
        self.read(|nodes| node::get(nodes, path))
    }

    fn get_children(&self, path: &str) -> KvResult<Vec<String>> {
        self.read(|nodes| node::children(nodes, path))
    }

    fn set(&self, path: &str, value: &str) -> KvResult<()> {
        self.write(|nodes| node::set(nodes, path, value))
    }

    fn delete(&self, path: &str, recursive: bool) -> KvResult<()> {
        self.write(|nodes| node::delete(nodes, path, recursive))?;
        debug!(%path, recursive, "node deleted");
        Ok(())
    }

    fn set_if(&self, path: &str, expected: &str, value: &str) -> KvResult<bool> {
        self.write(|nodes| node::set_if(nodes, path, expected, value))
    }

    fn delete_if(&self, path: &str, expected: &str, recursive: bool) -> KvResult<bool> {
        self.write(|nodes| node::delete_if(nodes, path, expected, recursive))
    }
}

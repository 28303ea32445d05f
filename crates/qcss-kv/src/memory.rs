//! In-memory KV tree.
//!
//! The whole tree lives in a `BTreeMap` behind a mutex. Clones share the
//! same tree and the same session, so ephemeral nodes survive until
//! [`MemoryKvTree::close_session`] is called on any clone.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{KvError, KvResult};
use crate::node::{self, NodeRead, NodeRecord, NodeWrite};
use crate::tree::{CreateMode, KvTree};

impl NodeRead for BTreeMap<String, NodeRecord> {
    fn load(&self, path: &str) -> KvResult<Option<NodeRecord>> {
        Ok(self.get(path).cloned())
    }

    fn paths_with_prefix(&self, prefix: &str) -> KvResult<Vec<String>> {
        Ok(self
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl NodeWrite for BTreeMap<String, NodeRecord> {
    fn store(&mut self, path: &str, record: &NodeRecord) -> KvResult<()> {
        self.insert(path.to_string(), record.clone());
        Ok(())
    }

    fn remove(&mut self, path: &str) -> KvResult<()> {
        BTreeMap::remove(self, path);
        Ok(())
    }
}

/// Thread-safe in-memory tree.
#[derive(Clone)]
pub struct MemoryKvTree {
    nodes: Arc<Mutex<BTreeMap<String, NodeRecord>>>,
}

impl MemoryKvTree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(crate::path::ROOT.to_string(), NodeRecord::default());
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
        }
    }

    /// End the session: drop every ephemeral node.
    pub fn close_session(&self) -> KvResult<usize> {
        let purged = self.with_nodes(|nodes| node::purge_ephemeral(nodes))?;
        debug!(count = purged.len(), "ephemeral nodes removed");
        Ok(purged.len())
    }

    fn with_nodes<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, NodeRecord>) -> KvResult<T>,
    ) -> KvResult<T> {
        let mut nodes = self
            .nodes
            .lock()
            .map_err(|_| KvError::Storage("memory tree lock poisoned".to_string()))?;
        f(&mut nodes)
    }
}

impl Default for MemoryKvTree {
    fn default() -> Self {
        Self::new()
    }
}

impl KvTree for MemoryKvTree {
    fn create(&self, path: &str, value: &str, mode: CreateMode) -> KvResult<String> {
        let real = self.with_nodes(|nodes| node::create(nodes, path, value, mode))?;
        debug!(path = %real, "node created");
        Ok(real)
    }

    fn exists(&self, path: &str) -> KvResult<bool> {
        self.with_nodes(|nodes| node::exists(&*nodes, path))
    }

    fn get(&self, path: &str) -> KvResult<String> {
        self.with_nodes(|nodes| node::get(&*nodes, path))
    }

    fn get_children(&self, path: &str) -> KvResult<Vec<String>> {
        self.with_nodes(|nodes| node::children(&*nodes, path))
    }

    fn set(&self, path: &str, value: &str) -> KvResult<()> {
        self.with_nodes(|nodes| node::set(nodes, path, value))
    }

    fn delete(&self, path: &str, recursive: bool) -> KvResult<()> {
        self.with_nodes(|nodes| node::delete(nodes, path, recursive))?;
        debug!(%path, recursive, "node deleted");
        Ok(())
    }

    fn set_if(&self, path: &str, expected: &str, value: &str) -> KvResult<bool> {
        self.with_nodes(|nodes| node::set_if(nodes, path, expected, value))
    }

    fn delete_if(&self, path: &str, expected: &str, recursive: bool) -> KvResult<bool> {
        self.with_nodes(|nodes| node::delete_if(nodes, path, expected, recursive))
    }
}

//! Tree semantics shared by every backend.
//!
//! A backend only has to expose an ordered `path -> NodeRecord` map
//! through [`NodeRead`] / [`NodeWrite`]; the functions here implement the
//! [`KvTree`](crate::KvTree) operations on top of it. Callers hold a lock
//! or a transaction around each call, which makes every operation atomic.

use serde::{Deserialize, Serialize};

use crate::error::{KvError, KvResult};
use crate::path::{self, ROOT};
use crate::tree::{CreateMode, RESERVED_ROOT_CHILDREN};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NodeRecord {
    pub value: String,
    /// Next sequence number handed to a sequential child.
    #[serde(default)]
    pub next_seq: u64,
    #[serde(default)]
    pub ephemeral: bool,
}

impl NodeRecord {
    pub fn to_bytes(&self) -> KvResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| KvError::Serialize(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> KvResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| KvError::Deserialize(e.to_string()))
    }
}

pub(crate) trait NodeRead {
    fn load(&self, path: &str) -> KvResult<Option<NodeRecord>>;

    /// Every stored path starting with `prefix`, ascending.
    fn paths_with_prefix(&self, prefix: &str) -> KvResult<Vec<String>>;
}

pub(crate) trait NodeWrite: NodeRead {
    fn store(&mut self, path: &str, record: &NodeRecord) -> KvResult<()>;

    fn remove(&mut self, path: &str) -> KvResult<()>;
}

fn require<R: NodeRead + ?Sized>(nodes: &R, node: &str) -> KvResult<NodeRecord> {
    path::validate(node)?;
    nodes
        .load(node)?
        .ok_or_else(|| KvError::KeyDoesNotExist(node.to_string()))
}

pub(crate) fn ensure_root<W: NodeWrite + ?Sized>(nodes: &mut W) -> KvResult<()> {
    if nodes.load(ROOT)?.is_none() {
        nodes.store(ROOT, &NodeRecord::default())?;
    }
    Ok(())
}

pub(crate) fn create<W: NodeWrite + ?Sized>(
    nodes: &mut W,
    requested: &str,
    value: &str,
    mode: CreateMode,
) -> KvResult<String> {
    // In sequence mode the requested path may end with '/', so the parent
    // is derived from the requested path rather than the final one.
    if requested == ROOT {
        return Err(KvError::KeyExists(ROOT.to_string()));
    }
    let parent_path =
        path::parent(requested).ok_or_else(|| KvError::InvalidPath(requested.to_string()))?;
    let mut parent = require(&*nodes, parent_path)?;
    if parent.ephemeral {
        return Err(KvError::EphemeralParent(parent_path.to_string()));
    }

    let real = if mode.sequence {
        format!("{requested}{:010}", parent.next_seq)
    } else {
        requested.to_string()
    };
    path::validate(&real)?;
    if nodes.load(&real)?.is_some() {
        return Err(KvError::KeyExists(real));
    }

    if mode.sequence {
        parent.next_seq += 1;
        nodes.store(parent_path, &parent)?;
    }
    nodes.store(
        &real,
        &NodeRecord {
            value: value.to_string(),
            next_seq: 0,
            ephemeral: mode.ephemeral,
        },
    )?;
    Ok(real)
}

pub(crate) fn exists<R: NodeRead + ?Sized>(nodes: &R, node: &str) -> KvResult<bool> {
    path::validate(node)?;
    Ok(nodes.load(node)?.is_some())
}

pub(crate) fn get<R: NodeRead + ?Sized>(nodes: &R, node: &str) -> KvResult<String> {
    Ok(require(nodes, node)?.value)
}

pub(crate) fn children<R: NodeRead + ?Sized>(nodes: &R, node: &str) -> KvResult<Vec<String>> {
    require(nodes, node)?;
    let prefix = path::child_prefix(node);
    Ok(nodes
        .paths_with_prefix(&prefix)?
        .into_iter()
        .filter(|p| p != node)
        .filter_map(|p| {
            let rest = &p[prefix.len()..];
            (!rest.contains('/')).then(|| rest.to_string())
        })
        .collect())
}

pub(crate) fn set<W: NodeWrite + ?Sized>(nodes: &mut W, node: &str, value: &str) -> KvResult<()> {
    let mut record = require(&*nodes, node)?;
    record.value = value.to_string();
    nodes.store(node, &record)
}

pub(crate) fn delete<W: NodeWrite + ?Sized>(
    nodes: &mut W,
    node: &str,
    recursive: bool,
) -> KvResult<()> {
    path::validate(node)?;
    if node == ROOT {
        if !recursive {
            return Ok(());
        }
        for p in nodes.paths_with_prefix(ROOT)? {
            if p == ROOT || RESERVED_ROOT_CHILDREN.contains(&path::top_level(&p)) {
                continue;
            }
            nodes.remove(&p)?;
        }
        return Ok(());
    }

    require(&*nodes, node)?;
    let descendants = nodes.paths_with_prefix(&path::child_prefix(node))?;
    if !descendants.is_empty() && !recursive {
        return Err(KvError::NotEmpty(node.to_string()));
    }
    for p in descendants {
        nodes.remove(&p)?;
    }
    nodes.remove(node)
}

pub(crate) fn set_if<W: NodeWrite + ?Sized>(
    nodes: &mut W,
    node: &str,
    expected: &str,
    value: &str,
) -> KvResult<bool> {
    path::validate(node)?;
    match nodes.load(node)? {
        Some(mut record) if record.value == expected => {
            record.value = value.to_string();
            nodes.store(node, &record)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub(crate) fn delete_if<W: NodeWrite + ?Sized>(
    nodes: &mut W,
    node: &str,
    expected: &str,
    recursive: bool,
) -> KvResult<bool> {
    path::validate(node)?;
    match nodes.load(node)? {
        Some(record) if record.value == expected => {
            delete(nodes, node, recursive)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Remove every ephemeral node, returning the removed paths.
pub(crate) fn purge_ephemeral<W: NodeWrite + ?Sized>(nodes: &mut W) -> KvResult<Vec<String>> {
    let mut purged = Vec::new();
    for p in nodes.paths_with_prefix(ROOT)? {
        let ephemeral = nodes.load(&p)?.is_some_and(|record| record.ephemeral);
        if ephemeral {
            nodes.remove(&p)?;
            purged.push(p);
        }
    }
    Ok(purged)
}

//! The KV tree capability surface.

use std::fmt::Write as _;

use crate::error::{KvError, KvResult};
use crate::path;

/// Top-level names owned by the coordination service itself.
///
/// `delete("/", true)` removes every root child except these.
pub const RESERVED_ROOT_CHILDREN: &[&str] = &["zookeeper"];

/// How a node is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateMode {
    /// Append a zero-padded, per-parent monotonically increasing counter
    /// to the requested path. The requested path may end with `/`.
    pub sequence: bool,
    /// Remove the node when the creating session ends.
    pub ephemeral: bool,
}

impl CreateMode {
    pub const PERSISTENT: Self = Self {
        sequence: false,
        ephemeral: false,
    };
    pub const SEQUENTIAL: Self = Self {
        sequence: true,
        ephemeral: false,
    };
    pub const EPHEMERAL: Self = Self {
        sequence: false,
        ephemeral: true,
    };
}

/// Hierarchical key-value tree.
///
/// Single-node operations are atomic. There are no multi-node
/// transactions; `set_if` and `delete_if` are the primitives concurrent
/// writers use to avoid clobbering each other.
pub trait KvTree: Send + Sync {
    /// Create a node; the parent must exist. Returns the real path,
    /// which differs from `path` only in sequence mode.
    fn create(&self, path: &str, value: &str, mode: CreateMode) -> KvResult<String>;

    fn exists(&self, path: &str) -> KvResult<bool>;

    fn get(&self, path: &str) -> KvResult<String>;

    /// Names (not paths) of the direct children, sorted.
    fn get_children(&self, path: &str) -> KvResult<Vec<String>>;

    fn set(&self, path: &str, value: &str) -> KvResult<()>;

    /// Delete a node. Non-recursive delete of a node with children fails
    /// with `NotEmpty`. The root is special: non-recursive delete is a
    /// no-op, recursive delete keeps [`RESERVED_ROOT_CHILDREN`].
    fn delete(&self, path: &str, recursive: bool) -> KvResult<()>;

    /// Set `value` only if the current value equals `expected`.
    /// Returns `false` when the node is missing or holds something else.
    fn set_if(&self, path: &str, expected: &str, value: &str) -> KvResult<bool>;

    /// Delete only if the current value equals `expected`.
    /// Returns `false` when the node is missing or holds something else.
    fn delete_if(&self, path: &str, expected: &str, recursive: bool) -> KvResult<bool>;

    /// `get` that maps a missing node to `None`.
    fn get_or_none(&self, path: &str) -> KvResult<Option<String>> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(KvError::KeyDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `get_children` that maps a missing node to `None`.
    fn children_or_none(&self, path: &str) -> KvResult<Option<Vec<String>>> {
        match self.get_children(path) {
            Ok(children) => Ok(Some(children)),
            Err(KvError::KeyDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Render the subtree at `path`, one `path = value` line per node.
    fn dump(&self, path: &str) -> KvResult<String> {
        let mut out = String::new();
        dump_into(self, path, &mut out)?;
        Ok(out)
    }
}

fn dump_into<T: KvTree + ?Sized>(tree: &T, node: &str, out: &mut String) -> KvResult<()> {
    // Nodes may vanish mid-walk; skip them.
    let Some(value) = tree.get_or_none(node)? else {
        return Ok(());
    };
    let _ = writeln!(out, "{node} = {value}");
    for child in tree.children_or_none(node)?.unwrap_or_default() {
        dump_into(tree, &path::join(node, &child), out)?;
    }
    Ok(())
}

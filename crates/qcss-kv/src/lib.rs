//! qcss-kv — hierarchical key-value tree for the CSS.
//!
//! The [`KvTree`] trait is the capability surface the control plane
//! consumes: ZooKeeper-style create/get/set/delete/children with sequence
//! and ephemeral nodes, plus atomic conditional writes.
//!
//! # Backends
//!
//! - [`MemoryKvTree`] — `Mutex<BTreeMap>`, one session per instance
//! - [`RedbKvTree`] — backed by [redb](https://docs.rs/redb); every
//!   operation runs in a single redb transaction
//!
//! Both backends share the tree semantics in `node`, so they behave
//! identically for every operation.

pub mod error;
pub mod memory;
mod node;
pub mod path;
pub mod redb_tree;
pub mod tables;
pub mod tree;

pub use error::{KvError, KvResult};
pub use memory::MemoryKvTree;
pub use redb_tree::RedbKvTree;
pub use tree::{CreateMode, KvTree, RESERVED_ROOT_CHILDREN};

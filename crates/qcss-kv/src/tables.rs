//! redb table definitions for the KV tree backend.

use redb::TableDefinition;

/// Tree nodes keyed by absolute path; values are JSON `NodeRecord`s.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

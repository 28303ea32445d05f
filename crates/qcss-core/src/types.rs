use std::collections::{BTreeMap, BTreeSet};

/// Chunk identifier within a partitioning scheme.
pub type ChunkId = u32;

/// Worker (node) name as recorded in replica records.
pub type WorkerName = String;

/// Chunk id → set of workers hosting a replica of that chunk.
///
/// Ordered containers keep worker selection deterministic across runs.
pub type ChunkMap = BTreeMap<ChunkId, BTreeSet<WorkerName>>;

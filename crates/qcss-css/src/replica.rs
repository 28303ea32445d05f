//! Chunk replica records.
//!
//! A replica node under `.../CHUNKS/<chunk>/REPLICAS/` names its worker in
//! one of two forms:
//!
//! - packed: the node value is a JSON object, `{"nodeName": "worker1"}`
//! - unpacked: the node value is empty and a `nodeName` child holds the worker
//!
//! New replicas are always written packed.

use serde::{Deserialize, Serialize};

use qcss_core::layout::NODE_NAME;
use qcss_kv::{KvTree, path};

use crate::error::{CssError, CssResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    #[serde(rename = "nodeName")]
    pub node_name: String,
}

impl ReplicaRecord {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn to_packed(&self) -> CssResult<String> {
        serde_json::to_string(self).map_err(|e| CssError::BadReplica {
            path: String::new(),
            reason: e.to_string(),
        })
    }

    /// Read the replica at `replica_path`. `None` if the node vanished.
    pub fn read(kv: &dyn KvTree, replica_path: &str) -> CssResult<Option<Self>> {
        let Some(value) = kv.get_or_none(replica_path)? else {
            return Ok(None);
        };

        if !value.trim().is_empty() {
            return serde_json::from_str(&value)
                .map(Some)
                .map_err(|e| CssError::BadReplica {
                    path: replica_path.to_string(),
                    reason: e.to_string(),
                });
        }

        match kv.get_or_none(&path::join(replica_path, NODE_NAME))? {
            Some(node_name) => Ok(Some(Self { node_name })),
            None if !kv.exists(replica_path)? => Ok(None),
            None => Err(CssError::BadReplica {
                path: replica_path.to_string(),
                reason: "neither packed value nor nodeName child".to_string(),
            }),
        }
    }
}

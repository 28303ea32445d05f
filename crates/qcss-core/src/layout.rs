//! Path builders for the CSS tree.
//!
//! ```text
//! /DBS/<db>                                              status
//! /DBS/<db>/TABLES/<table>                               status
//! /DBS/<db>/TABLES/<table>/CHUNKS/<chunk>/REPLICAS/<id>  replica record
//! ```

use crate::types::ChunkId;

pub const DBS: &str = "/DBS";
pub const TABLES: &str = "TABLES";
pub const CHUNKS: &str = "CHUNKS";
pub const REPLICAS: &str = "REPLICAS";

/// Child of an unpacked replica node naming the hosting worker.
pub const NODE_NAME: &str = "nodeName";

pub fn db_path(db: &str) -> String {
    format!("{DBS}/{db}")
}

pub fn tables_path(db: &str) -> String {
    format!("{DBS}/{db}/{TABLES}")
}

pub fn table_path(db: &str, table: &str) -> String {
    format!("{DBS}/{db}/{TABLES}/{table}")
}

pub fn chunks_path(db: &str, table: &str) -> String {
    format!("{}/{CHUNKS}", table_path(db, table))
}

pub fn chunk_path(db: &str, table: &str, chunk: ChunkId) -> String {
    format!("{}/{chunk}", chunks_path(db, table))
}

pub fn replicas_path(db: &str, table: &str, chunk: ChunkId) -> String {
    format!("{}/{REPLICAS}", chunk_path(db, table, chunk))
}

//! qcss-css — typed access to the Central State System tree.
//!
//! [`CssAccess`] wraps a [`qcss_kv::KvTree`] and speaks in databases,
//! tables, statuses and chunk replicas instead of raw paths. Lookups of
//! things that may legitimately be absent return `Option`; only real KV
//! failures surface as errors.

pub mod access;
pub mod error;
pub mod replica;

pub use access::CssAccess;
pub use error::{CssError, CssResult};
pub use replica::ReplicaRecord;

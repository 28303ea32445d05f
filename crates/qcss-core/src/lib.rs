//! qcss-core — shared types for the chunked-engine control plane.
//!
//! - [`config`]: the `qcss.toml` configuration value object
//! - [`layout`]: path builders for the CSS tree (`/DBS/...`)
//! - [`status`]: the resource status model stored at database and table nodes
//! - [`types`]: chunk and worker aliases

pub mod config;
pub mod layout;
pub mod status;
pub mod types;

pub use config::{ConfigError, QcssConfig};
pub use status::{ResourceStatus, StatusKind};
pub use types::*;

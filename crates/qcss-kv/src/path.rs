//! Absolute path helpers.
//!
//! Paths are `/`-separated and absolute. The root is `/`; every other
//! path has no trailing slash and no empty segments.

use crate::error::{KvError, KvResult};

pub const ROOT: &str = "/";

pub fn validate(path: &str) -> KvResult<()> {
    if path == ROOT {
        return Ok(());
    }
    let valid = path.starts_with('/') && path[1..].split('/').all(|seg| !seg.is_empty());
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidPath(path.to_string()))
    }
}

/// Parent of `path`; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Prefix shared by every descendant of `path`.
pub fn child_prefix(path: &str) -> String {
    if path == ROOT {
        ROOT.to_string()
    } else {
        format!("{path}/")
    }
}

pub fn join(parent: &str, child: &str) -> String {
    format!("{}{child}", child_prefix(parent))
}

/// First segment below the root (`/a/b` → `a`).
pub fn top_level(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

//! Resource status model.
//!
//! Database and table nodes in the CSS carry a status string:
//!
//! ```text
//! READY
//! PENDING_CREATE:<options>
//! PENDING_DROP:<options>
//! FAILED:<reason>
//! DO_NOT_USE
//! ```
//!
//! The payload is everything after the *first* colon, so payloads may
//! contain colons themselves (`PENDING_DROP:12345:qid=24`). Strings that
//! do not match any kind parse as [`StatusKind::Unknown`] instead of
//! failing; the watcher skips them.

use std::fmt;

pub const READY: &str = "READY";
pub const PENDING_CREATE: &str = "PENDING_CREATE";
pub const PENDING_DROP: &str = "PENDING_DROP";
pub const FAILED: &str = "FAILED";
pub const DO_NOT_USE: &str = "DO_NOT_USE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Ready,
    PendingCreate,
    PendingDrop,
    Failed,
    DoNotUse,
    Unknown,
}

impl StatusKind {
    /// The literal used in the status string, `None` for `Unknown`.
    pub fn literal(self) -> Option<&'static str> {
        match self {
            Self::Ready => Some(READY),
            Self::PendingCreate => Some(PENDING_CREATE),
            Self::PendingDrop => Some(PENDING_DROP),
            Self::Failed => Some(FAILED),
            Self::DoNotUse => Some(DO_NOT_USE),
            Self::Unknown => None,
        }
    }

    /// Whether the status string for this kind carries a payload.
    pub fn has_payload(self) -> bool {
        matches!(self, Self::PendingCreate | Self::PendingDrop | Self::Failed)
    }
}

/// A parsed status: kind plus payload.
///
/// For `Unknown` the payload holds the raw string so it can be logged
/// and written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    pub kind: StatusKind,
    pub payload: String,
}

impl ResourceStatus {
    pub fn new(kind: StatusKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn ready() -> Self {
        Self::new(StatusKind::Ready, "")
    }

    pub fn do_not_use() -> Self {
        Self::new(StatusKind::DoNotUse, "")
    }

    pub fn pending_create(options: impl Into<String>) -> Self {
        Self::new(StatusKind::PendingCreate, options)
    }

    pub fn pending_drop(options: impl Into<String>) -> Self {
        Self::new(StatusKind::PendingDrop, options)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(StatusKind::Failed, reason)
    }

    /// Parse a raw status string. Never fails.
    pub fn parse(raw: &str) -> Self {
        let (head, payload) = match raw.split_once(':') {
            Some((head, payload)) => (head, Some(payload)),
            None => (raw, None),
        };
        let kind = match head {
            READY => StatusKind::Ready,
            PENDING_CREATE => StatusKind::PendingCreate,
            PENDING_DROP => StatusKind::PendingDrop,
            FAILED => StatusKind::Failed,
            DO_NOT_USE => StatusKind::DoNotUse,
            _ => StatusKind::Unknown,
        };
        match (kind, payload) {
            (StatusKind::Unknown, _) => Self::new(StatusKind::Unknown, raw),
            // READY and DO_NOT_USE never carry a payload.
            (k, Some(_)) if !k.has_payload() => Self::new(StatusKind::Unknown, raw),
            (k, payload) => Self::new(k, payload.unwrap_or_default()),
        }
    }

    /// Render back to the raw status string.
    pub fn format(&self) -> String {
        format(self.kind, &self.payload)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.kind, StatusKind::PendingCreate | StatusKind::PendingDrop)
    }
}

/// Render a kind and payload as a raw status string.
///
/// Payload-carrying kinds always include the colon, even for an empty
/// payload; `Unknown` renders its payload verbatim.
pub fn format(kind: StatusKind, payload: &str) -> String {
    match kind.literal() {
        Some(literal) if kind.has_payload() => format!("{literal}:{payload}"),
        Some(literal) => literal.to_string(),
        None => payload.to_string(),
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl From<&str> for ResourceStatus {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

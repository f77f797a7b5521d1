//! Newtype domain identifiers.
//!
//! Every platform object the run task refers to is represented as a distinct
//! newtype wrapping a primitive. This prevents accidentally passing a
//! [`WorkspaceId`] where a [`RunId`] is expected even though both are opaque
//! strings such as `"run-CZcmD7eagjhyX0vN"` and `"ws-noZcaGXsac6aZSJR"`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: platform-assigned strings
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a single plan/apply execution tracked by the platform.
    ///
    /// This is the sole unit of work held in the apply queue.
    RunId
}

string_id! {
    /// Identifies the workspace a run belongs to.
    WorkspaceId
}

string_id! {
    /// Identifies the task result the platform expects a callback for.
    ///
    /// Only used for log correlation; the callback URL already encodes it.
    TaskResultId
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one inbound run task event as received by the listener.
///
/// Generated fresh on receipt and attached to the spans of the per-event
/// worker so log lines from a single delivery can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a new random event identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

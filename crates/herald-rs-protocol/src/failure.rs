use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy shared by every backend path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Target address unreachable.
    Connectivity,
    /// Target reachable but silent past the deadline.
    Timeout,
    /// Response received but malformed or outside the expected schema.
    Protocol,
    /// Target explicitly reported an error or non-success status.
    Upstream,
    /// The task request itself is malformed.
    Input,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connectivity => "connectivity",
            FailureKind::Timeout => "timeout",
            FailureKind::Protocol => "protocol",
            FailureKind::Upstream => "upstream",
            FailureKind::Input => "input",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure", self.as_str())
    }
}

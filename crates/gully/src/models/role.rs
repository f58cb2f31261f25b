use serde::{Deserialize, Serialize};

/// Who authored a message in the transcript. Capability results travel as
/// `ToolResponse` content inside a `User` message and serialize to the
/// wire-level "tool" role at the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// src/models/college.rs
use serde::{Deserialize, Serialize};

/// An immutable entry of the canonical college registry.
///
/// Built once by the registry loader and owned by the index set for the rest
/// of the process; matching only ever hands out shared references to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCollege {
    pub id: String,
    /// Current official name, with any trailing parenthetical removed.
    pub name: String,
    /// Former name taken from a trailing parenthetical, e.g. `X College (Old Name)`.
    pub previous_name: Option<String>,
    pub address: Option<String>,
    pub state: String,
    #[serde(rename = "type")]
    pub college_type: String,
    pub management: Option<String>,
    pub university: Option<String>,
}

use serde::Serialize;

/// Reasoning block of a Responses API request.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Reasoning {
    pub effort: String,
}

impl Reasoning {
    pub fn with_effort(effort: impl Into<String>) -> Self {
        Self {
            effort: effort.into(),
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
}

impl Tool {
    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search".to_string(),
        }
    }
}

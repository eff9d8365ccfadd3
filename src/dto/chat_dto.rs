use serde::{Deserialize, Serialize};
use validator::Validate;

/// One prior turn of the conversation, as the frontend stores it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Chat endpoint payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,

    #[serde(default)]
    pub conversation: Vec<ChatTurn>,
}

/// Chat endpoint response
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub timestamp: String,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::assistant::ChatTurn;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct AiChat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AiChat> for ChatTurn {
    fn from(chat: &AiChat) -> Self {
        ChatTurn {
            prompt: chat.prompt.clone(),
            response: chat.response.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAiChat {
    pub user_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskAssistantRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

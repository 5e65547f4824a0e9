use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::core::AppError;

pub const MAX_MESSAGE_GRAPHEMES: usize = 4000;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct GroupMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

impl PostMessageRequest {
    /// Trimmed content, non-empty and within the grapheme limit.
    pub fn content(&self) -> Result<String, AppError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::validation_error("Message content is required"));
        }
        if content.graphemes(true).count() > MAX_MESSAGE_GRAPHEMES {
            return Err(AppError::validation_error(format!(
                "Message must be at most {} characters",
                MAX_MESSAGE_GRAPHEMES
            )));
        }
        Ok(content.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessageQuery {
    pub message_id: Uuid,
}

/// Result of adding a freshly signed-in user to the default group.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AutoJoin {
    Joined { group_id: Uuid },
    AlreadyMember { group_id: Uuid },
    Skipped { reason: String },
}

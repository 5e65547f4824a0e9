use async_trait::async_trait;
use uuid::Uuid;

use super::{AiChatStore, PgStore};
use crate::core::AppError;
use crate::models::ai_chats::{AiChat, NewAiChat};
use crate::models::pagination::PaginationQuery;

#[async_trait]
impl AiChatStore for PgStore {
    async fn chats_for_user(&self, user_id: Uuid, page: &PaginationQuery) -> Result<(Vec<AiChat>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_chats WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        let chats = sqlx::query_as::<_, AiChat>(
            r#"
            SELECT id, user_id, prompt, response, model, created_at
            FROM ai_chats
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        Ok((chats, total))
    }

    async fn insert_chat(&self, chat: &NewAiChat) -> Result<AiChat, AppError> {
        let stored = sqlx::query_as::<_, AiChat>(
            r#"
            INSERT INTO ai_chats (user_id, prompt, response, model)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, prompt, response, model, created_at
            "#,
        )
        .bind(chat.user_id)
        .bind(&chat.prompt)
        .bind(&chat.response)
        .bind(&chat.model)
        .fetch_one(self.pool())
        .await?;

        Ok(stored)
    }
}

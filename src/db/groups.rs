use async_trait::async_trait;
use uuid::Uuid;

use super::{GroupStore, PgStore};
use crate::core::AppError;
use crate::models::groups::{Group, GroupMessage};
use crate::models::pagination::PaginationQuery;

const GROUP_COLUMNS: &str = "id, name, description, is_default, created_at";
const MESSAGE_COLUMNS: &str = "id, group_id, user_id, content, created_at";

#[async_trait]
impl GroupStore for PgStore {
    async fn group_exists(&self, group_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE id = $1)")
            .bind(group_id)
            .fetch_one(self.pool())
            .await?;

        Ok(exists)
    }

    async fn default_group(&self) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {} FROM groups WHERE is_default ORDER BY created_at ASC LIMIT 1",
            GROUP_COLUMNS
        ))
        .fetch_optional(self.pool())
        .await?;

        Ok(group)
    }

    async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name, g.description, g.is_default, g.created_at
            FROM groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(groups)
    }

    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(member)
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_messages(
        &self,
        group_id: Uuid,
        page: &PaginationQuery,
    ) -> Result<(Vec<GroupMessage>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_messages WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(self.pool())
            .await?;

        let messages = sqlx::query_as::<_, GroupMessage>(&format!(
            r#"
            SELECT {} FROM group_messages
            WHERE group_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(group_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        Ok((messages, total))
    }

    async fn insert_message(&self, group_id: Uuid, user_id: Uuid, content: &str) -> Result<GroupMessage, AppError> {
        let message = sqlx::query_as::<_, GroupMessage>(&format!(
            "INSERT INTO group_messages (group_id, user_id, content) VALUES ($1, $2, $3) RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(group_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(self.pool())
        .await?;

        Ok(message)
    }

    async fn get_message(&self, message_id: Uuid) -> Result<Option<GroupMessage>, AppError> {
        let message = sqlx::query_as::<_, GroupMessage>(&format!(
            "SELECT {} FROM group_messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(message)
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM group_messages WHERE id = $1")
            .bind(message_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use super::{AdminRequestStore, PgStore};
use crate::core::{unique_violation_as, AppError};
use crate::models::admin_requests::{AdminRequest, AdminRequestStatus};
use crate::models::profiles::Role;

const REQUEST_COLUMNS: &str = "id, user_id, reason, status, reviewed_by, reviewed_at, created_at";

pub const DUPLICATE_PENDING_MESSAGE: &str = "You already have a pending admin request";

#[async_trait]
impl AdminRequestStore for PgStore {
    async fn pending_request_for(&self, user_id: Uuid) -> Result<Option<AdminRequest>, AppError> {
        let request = sqlx::query_as::<_, AdminRequest>(&format!(
            "SELECT {} FROM admin_requests WHERE user_id = $1 AND status = 'pending'",
            REQUEST_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(request)
    }

    async fn create_request(&self, user_id: Uuid, reason: &str) -> Result<AdminRequest, AppError> {
        let mut tx = self.pool().begin().await?;

        // admin_requests_one_pending_per_user backs the route's duplicate check.
        let request = sqlx::query_as::<_, AdminRequest>(&format!(
            "INSERT INTO admin_requests (user_id, reason) VALUES ($1, $2) RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(user_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation_as(e, DUPLICATE_PENDING_MESSAGE))?;

        sqlx::query("UPDATE profiles SET role = $2 WHERE id = $1")
            .bind(user_id)
            .bind(Role::PendingAdmin)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(request)
    }

    async fn list_requests(&self, status: Option<AdminRequestStatus>) -> Result<Vec<AdminRequest>, AppError> {
        let requests = sqlx::query_as::<_, AdminRequest>(&format!(
            r#"
            SELECT {} FROM admin_requests
            WHERE ($1::admin_request_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status)
        .fetch_all(self.pool())
        .await?;

        Ok(requests)
    }

    async fn review_request(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        decision: AdminRequestStatus,
    ) -> Result<AdminRequest, AppError> {
        let mut tx = self.pool().begin().await?;

        // Row lock serializes concurrent reviews of the same request.
        let current = sqlx::query_as::<_, AdminRequest>(&format!(
            "SELECT {} FROM admin_requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Admin request not found"))?;

        let next = current.status.review(decision)?;

        let reviewed = sqlx::query_as::<_, AdminRequest>(&format!(
            r#"
            UPDATE admin_requests
            SET status = $2, reviewed_by = $3, reviewed_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(next)
        .bind(reviewer_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE profiles SET role = $2 WHERE id = $1")
            .bind(reviewed.user_id)
            .bind(next.resulting_role())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request_id,
            reviewer = %reviewer_id,
            status = %next,
            "admin request reviewed"
        );

        Ok(reviewed)
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use super::{PgStore, ProfileStore};
use crate::core::AppError;
use crate::models::profiles::{NewProfile, Profile};

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role, created_at FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(profile)
    }

    async fn ensure_profile(&self, profile: &NewProfile) -> Result<Profile, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, full_name, role)
            VALUES ($1, $2, $3, 'student')
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email, full_name, role, created_at
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .fetch_one(self.pool())
        .await?;

        Ok(profile)
    }
}

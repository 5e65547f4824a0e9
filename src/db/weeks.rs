use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use super::{PgStore, WeekStore};
use crate::core::{unique_violation_as, AppError};
use crate::models::weeks::{NewWeek, NewWeekFile, Week, WeekChanges, WeekFile, WeekWithFiles};

const WEEK_COLUMNS: &str = "id, week_number, title, description, created_by, created_at";
const FILE_COLUMNS: &str =
    "id, week_id, file_name, file_type, file_url, storage_path, file_size, uploaded_by, created_at";

fn attach_files(weeks: Vec<Week>, files: Vec<WeekFile>) -> Vec<WeekWithFiles> {
    let mut by_week: HashMap<Uuid, Vec<WeekFile>> = HashMap::new();
    for file in files {
        by_week.entry(file.week_id).or_default().push(file);
    }
    weeks
        .into_iter()
        .map(|week| {
            let files = by_week.remove(&week.id).unwrap_or_default();
            WeekWithFiles { week, files }
        })
        .collect()
}

impl PgStore {
    async fn files_for_weeks(&self, week_ids: &[Uuid]) -> Result<Vec<WeekFile>, AppError> {
        let files = sqlx::query_as::<_, WeekFile>(&format!(
            "SELECT {} FROM week_files WHERE week_id = ANY($1) ORDER BY created_at ASC, file_name ASC",
            FILE_COLUMNS
        ))
        .bind(week_ids)
        .fetch_all(self.pool())
        .await?;

        Ok(files)
    }
}

#[async_trait]
impl WeekStore for PgStore {
    async fn week_number_exists(&self, week_number: i32) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM weeks WHERE week_number = $1)")
                .bind(week_number)
                .fetch_one(self.pool())
                .await?;

        Ok(exists)
    }

    async fn insert_week(&self, week: &NewWeek) -> Result<Week, AppError> {
        sqlx::query_as::<_, Week>(&format!(
            r#"
            INSERT INTO weeks (week_number, title, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            WEEK_COLUMNS
        ))
        .bind(week.week_number)
        .bind(&week.title)
        .bind(&week.description)
        .bind(week.created_by)
        .fetch_one(self.pool())
        .await
        .map_err(|e| unique_violation_as(e, &format!("Week {} already exists", week.week_number)))
    }

    async fn insert_week_file(&self, file: &NewWeekFile) -> Result<WeekFile, AppError> {
        let inserted = sqlx::query_as::<_, WeekFile>(&format!(
            r#"
            INSERT INTO week_files (week_id, file_name, file_type, file_url, storage_path, file_size, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(file.week_id)
        .bind(&file.file_name)
        .bind(file.file_type)
        .bind(&file.file_url)
        .bind(&file.storage_path)
        .bind(file.file_size)
        .bind(file.uploaded_by)
        .fetch_one(self.pool())
        .await?;

        Ok(inserted)
    }

    async fn list_weeks(&self) -> Result<Vec<WeekWithFiles>, AppError> {
        let weeks = sqlx::query_as::<_, Week>(&format!(
            "SELECT {} FROM weeks ORDER BY week_number ASC",
            WEEK_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        let week_ids: Vec<Uuid> = weeks.iter().map(|w| w.id).collect();
        let files = self.files_for_weeks(&week_ids).await?;

        Ok(attach_files(weeks, files))
    }

    async fn get_week(&self, week_id: Uuid) -> Result<Option<WeekWithFiles>, AppError> {
        let week = sqlx::query_as::<_, Week>(&format!(
            "SELECT {} FROM weeks WHERE id = $1",
            WEEK_COLUMNS
        ))
        .bind(week_id)
        .fetch_optional(self.pool())
        .await?;

        match week {
            Some(week) => {
                let files = self.files_for_weeks(&[week.id]).await?;
                Ok(Some(WeekWithFiles { week, files }))
            }
            None => Ok(None),
        }
    }

    async fn update_week(&self, week_id: Uuid, changes: &WeekChanges) -> Result<Option<Week>, AppError> {
        let week = sqlx::query_as::<_, Week>(&format!(
            r#"
            UPDATE weeks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING {}
            "#,
            WEEK_COLUMNS
        ))
        .bind(week_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .fetch_optional(self.pool())
        .await?;

        Ok(week)
    }

    async fn delete_week(&self, week_id: Uuid) -> Result<Option<WeekWithFiles>, AppError> {
        let mut tx = self.pool().begin().await?;

        let files = sqlx::query_as::<_, WeekFile>(&format!(
            "SELECT {} FROM week_files WHERE week_id = $1 ORDER BY created_at ASC, file_name ASC",
            FILE_COLUMNS
        ))
        .bind(week_id)
        .fetch_all(&mut *tx)
        .await?;

        let week = sqlx::query_as::<_, Week>(&format!(
            "DELETE FROM weeks WHERE id = $1 RETURNING {}",
            WEEK_COLUMNS
        ))
        .bind(week_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(week.map(|week| WeekWithFiles { week, files }))
    }

    async fn delete_week_file(&self, week_id: Uuid, file_id: Uuid) -> Result<Option<WeekFile>, AppError> {
        let file = sqlx::query_as::<_, WeekFile>(&format!(
            "DELETE FROM week_files WHERE id = $1 AND week_id = $2 RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .bind(week_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(file)
    }
}

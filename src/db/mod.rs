//! Persistence seams. Route handlers only see these traits; `PgStore`
//! implements all of them over the Supabase-hosted Postgres database.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::admin_requests::{AdminRequest, AdminRequestStatus};
use crate::models::ai_chats::{AiChat, NewAiChat};
use crate::models::groups::{Group, GroupMessage};
use crate::models::pagination::PaginationQuery;
use crate::models::profiles::{NewProfile, Profile};
use crate::models::weeks::{NewWeek, NewWeekFile, Week, WeekChanges, WeekFile, WeekWithFiles};

pub mod admin_requests;
pub mod ai_chats;
pub mod groups;
pub mod profiles;
pub mod weeks;

#[async_trait]
pub trait WeekStore: Send + Sync {
    async fn week_number_exists(&self, week_number: i32) -> Result<bool, AppError>;
    /// Fails with a validation error when the week number is taken.
    async fn insert_week(&self, week: &NewWeek) -> Result<Week, AppError>;
    async fn insert_week_file(&self, file: &NewWeekFile) -> Result<WeekFile, AppError>;
    /// Ascending by week number; files in upload order.
    async fn list_weeks(&self) -> Result<Vec<WeekWithFiles>, AppError>;
    async fn get_week(&self, week_id: Uuid) -> Result<Option<WeekWithFiles>, AppError>;
    async fn update_week(&self, week_id: Uuid, changes: &WeekChanges) -> Result<Option<Week>, AppError>;
    /// Returns the removed week with the files that cascaded with it.
    async fn delete_week(&self, week_id: Uuid) -> Result<Option<WeekWithFiles>, AppError>;
    async fn delete_week_file(&self, week_id: Uuid, file_id: Uuid) -> Result<Option<WeekFile>, AppError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;
    /// Returns the existing profile or creates a student profile.
    async fn ensure_profile(&self, profile: &NewProfile) -> Result<Profile, AppError>;
}

#[async_trait]
pub trait AdminRequestStore: Send + Sync {
    async fn pending_request_for(&self, user_id: Uuid) -> Result<Option<AdminRequest>, AppError>;
    /// Stores a pending request and marks the requester `pending_admin`.
    async fn create_request(&self, user_id: Uuid, reason: &str) -> Result<AdminRequest, AppError>;
    async fn list_requests(&self, status: Option<AdminRequestStatus>) -> Result<Vec<AdminRequest>, AppError>;
    /// Applies the transition and the requester's resulting role atomically.
    async fn review_request(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        decision: AdminRequestStatus,
    ) -> Result<AdminRequest, AppError>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn group_exists(&self, group_id: Uuid) -> Result<bool, AppError>;
    /// The group flagged `is_default`, if any.
    async fn default_group(&self) -> Result<Option<Group>, AppError>;
    async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, AppError>;
    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
    /// `true` when a membership row was created.
    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
    /// Oldest first, with the total message count of the group.
    async fn list_messages(
        &self,
        group_id: Uuid,
        page: &PaginationQuery,
    ) -> Result<(Vec<GroupMessage>, i64), AppError>;
    async fn insert_message(&self, group_id: Uuid, user_id: Uuid, content: &str) -> Result<GroupMessage, AppError>;
    async fn get_message(&self, message_id: Uuid) -> Result<Option<GroupMessage>, AppError>;
    async fn delete_message(&self, message_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AiChatStore: Send + Sync {
    /// Newest first.
    async fn chats_for_user(&self, user_id: Uuid, page: &PaginationQuery) -> Result<(Vec<AiChat>, i64), AppError>;
    async fn insert_chat(&self, chat: &NewAiChat) -> Result<AiChat, AppError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

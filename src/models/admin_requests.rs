use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::core::AppError;
use crate::models::profiles::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admin_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminRequestStatus {
    Pending,
    Approved,
    Denied,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReviewError {
    #[error("Admin request has already been {0}")]
    AlreadyReviewed(AdminRequestStatus),
    #[error("Admin requests can only be approved or denied")]
    InvalidDecision,
}

impl From<ReviewError> for AppError {
    fn from(error: ReviewError) -> Self {
        AppError::validation_error(error)
    }
}

impl AdminRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRequestStatus::Pending => "pending",
            AdminRequestStatus::Approved => "approved",
            AdminRequestStatus::Denied => "denied",
        }
    }

    /// pending -> approved | denied, exactly once.
    pub fn review(self, decision: AdminRequestStatus) -> Result<AdminRequestStatus, ReviewError> {
        if self != AdminRequestStatus::Pending {
            return Err(ReviewError::AlreadyReviewed(self));
        }
        match decision {
            AdminRequestStatus::Pending => Err(ReviewError::InvalidDecision),
            terminal => Ok(terminal),
        }
    }

    /// Role the requester ends up with once the request reaches this status.
    pub fn resulting_role(&self) -> Role {
        match self {
            AdminRequestStatus::Pending => Role::PendingAdmin,
            AdminRequestStatus::Approved => Role::Admin,
            AdminRequestStatus::Denied => Role::Student,
        }
    }
}

impl fmt::Display for AdminRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct AdminRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub status: AdminRequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewAdminRequest {
    pub status: AdminRequestStatus,
}

#[derive(Debug, Deserialize)]
pub struct AdminRequestFilter {
    pub status: Option<AdminRequestStatus>,
}

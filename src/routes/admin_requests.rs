use actix_web::{get, patch, post, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::AuthenticatedUser;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::admin_requests::DUPLICATE_PENDING_MESSAGE;
use crate::db::{AdminRequestStore, ProfileStore};
use crate::models::admin_requests::{
    AdminRequestFilter, AdminRequestStatus, CreateAdminRequest, ReviewAdminRequest, ReviewError,
};
use crate::models::profiles::Role;

#[tracing::instrument(name = "Submit Admin Request", skip(requests, profiles, user, request), fields(user_id = %user.user_id))]
#[post("/requests")]
pub async fn submit_admin_request(
    requests: web::Data<dyn AdminRequestStore>,
    profiles: web::Data<dyn ProfileStore>,
    user: AuthenticatedUser,
    request: web::Json<CreateAdminRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation_error("A reason is required"));
    }

    let profile = profiles
        .get_profile(user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    if profile.role == Role::Admin {
        return Err(AppError::validation_error("You are already an admin"));
    }

    if requests.pending_request_for(user.user_id).await?.is_some() {
        return Err(AppError::validation_error(DUPLICATE_PENDING_MESSAGE));
    }

    let created = requests.create_request(user.user_id, reason).await?;
    tracing::info!(request_id = %created.id, "admin request submitted");

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(created, "Admin request submitted successfully")))
}

#[tracing::instrument(name = "List Admin Requests", skip(requests, profiles, user), fields(user_id = %user.user_id))]
#[get("/requests")]
pub async fn list_admin_requests(
    requests: web::Data<dyn AdminRequestStore>,
    profiles: web::Data<dyn ProfileStore>,
    user: AuthenticatedUser,
    filter: web::Query<AdminRequestFilter>,
) -> Result<HttpResponse, AppError> {
    user.require_admin(profiles.get_ref()).await?;

    let listed = requests.list_requests(filter.status).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(listed, "Admin requests retrieved successfully")))
}

#[tracing::instrument(name = "Review Admin Request", skip(requests, profiles, user, request), fields(user_id = %user.user_id))]
#[patch("/requests/{request_id}")]
pub async fn review_admin_request(
    requests: web::Data<dyn AdminRequestStore>,
    profiles: web::Data<dyn ProfileStore>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    request: web::Json<ReviewAdminRequest>,
) -> Result<HttpResponse, AppError> {
    let admin = user.require_admin(profiles.get_ref()).await?;

    if request.status == AdminRequestStatus::Pending {
        return Err(ReviewError::InvalidDecision.into());
    }

    let reviewed = requests
        .review_request(path.into_inner(), admin.id, request.status)
        .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        reviewed,
        format!("Admin request {}", request.status),
    )))
}

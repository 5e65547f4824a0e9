use actix_web::{delete, get, post, web, HttpResponse};
use uuid::Uuid;

use crate::core::jwt_auth::AuthenticatedUser;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{GroupStore, ProfileStore};
use crate::models::groups::{AutoJoin, DeleteMessageQuery, PostMessageRequest};
use crate::models::pagination::{PaginationMeta, PaginationQuery};
use crate::models::profiles::Role;

async fn ensure_member(groups: &dyn GroupStore, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    if !groups.group_exists(group_id).await? {
        return Err(AppError::not_found("Group not found"));
    }
    if !groups.is_member(group_id, user_id).await? {
        return Err(AppError::forbidden_error("You are not a member of this group"));
    }
    Ok(())
}

async fn resolve_default_group(
    groups: &dyn GroupStore,
    configured: Option<Uuid>,
) -> Result<Uuid, AutoJoin> {
    let skipped = |reason: &str| AutoJoin::Skipped {
        reason: reason.to_string(),
    };

    match configured {
        Some(group_id) => match groups.group_exists(group_id).await {
            Ok(true) => Ok(group_id),
            Ok(false) => {
                tracing::warn!(group_id = %group_id, "configured default group does not exist");
                Err(skipped("Default group does not exist"))
            }
            Err(e) => {
                tracing::warn!(group_id = %group_id, error = %e, "could not look up the default group");
                Err(skipped("Default group lookup failed"))
            }
        },
        None => match groups.default_group().await {
            Ok(Some(group)) => Ok(group.id),
            Ok(None) => Err(skipped("No default group is configured")),
            Err(e) => {
                tracing::warn!(error = %e, "could not look up the default group");
                Err(skipped("Default group lookup failed"))
            }
        },
    }
}

/// Add `user_id` to the default group: the configured id when set, otherwise
/// the group flagged `is_default`. Never fails: problems become
/// `AutoJoin::Skipped` with the reason.
pub async fn join_default_group(
    groups: &dyn GroupStore,
    default_group_id: Option<Uuid>,
    user_id: Uuid,
) -> AutoJoin {
    let group_id = match resolve_default_group(groups, default_group_id).await {
        Ok(group_id) => group_id,
        Err(skipped) => return skipped,
    };

    match groups.add_member(group_id, user_id).await {
        Ok(true) => {
            tracing::info!(group_id = %group_id, user_id = %user_id, "joined default group");
            AutoJoin::Joined { group_id }
        }
        Ok(false) => AutoJoin::AlreadyMember { group_id },
        Err(e) => {
            tracing::warn!(group_id = %group_id, error = %e, "failed to join default group");
            AutoJoin::Skipped {
                reason: "Joining the default group failed".to_string(),
            }
        }
    }
}

#[tracing::instrument(name = "List My Groups", skip(groups, user), fields(user_id = %user.user_id))]
#[get("")]
pub async fn list_my_groups(
    groups: web::Data<dyn GroupStore>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let mine = groups.groups_for_user(user.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(mine, "Groups retrieved successfully")))
}

#[tracing::instrument(name = "Post Group Message", skip(groups, user, request), fields(user_id = %user.user_id))]
#[post("/{group_id}/messages")]
pub async fn post_message(
    groups: web::Data<dyn GroupStore>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    request: web::Json<PostMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    ensure_member(groups.get_ref(), group_id, user.user_id).await?;

    let content = request.content()?;
    let message = groups.insert_message(group_id, user.user_id, &content).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(message, "Message sent successfully")))
}

#[tracing::instrument(name = "Get Group Messages", skip(groups, user), fields(user_id = %user.user_id))]
#[get("/{group_id}/messages")]
pub async fn get_messages(
    groups: web::Data<dyn GroupStore>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pagination: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    ensure_member(groups.get_ref(), group_id, user.user_id).await?;

    let page = pagination.into_inner().normalized();
    let (messages, total) = groups.list_messages(group_id, &page).await?;

    let mut response = AppSuccessResponse::new(messages, "Messages retrieved successfully");
    response.pagination = Some(PaginationMeta::new(&page, total));
    Ok(HttpResponse::Ok().json(response))
}

#[tracing::instrument(name = "Delete Group Message", skip(groups, profiles, user), fields(user_id = %user.user_id))]
#[delete("/{group_id}/messages")]
pub async fn delete_message(
    groups: web::Data<dyn GroupStore>,
    profiles: web::Data<dyn ProfileStore>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<DeleteMessageQuery>,
) -> Result<HttpResponse, AppError> {
    let group_id = path.into_inner();
    let message = groups
        .get_message(query.message_id)
        .await?
        .filter(|message| message.group_id == group_id)
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    if message.user_id != user.user_id {
        let is_admin = profiles
            .get_profile(user.user_id)
            .await?
            .map(|profile| profile.role == Role::Admin)
            .unwrap_or(false);
        if !is_admin {
            return Err(AppError::forbidden_error("You can only delete your own messages"));
        }
    }

    groups.delete_message(message.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(message, "Message deleted successfully")))
}

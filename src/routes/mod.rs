use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::web::{scope, JsonConfig, PathConfig, QueryConfig, ServiceConfig};
use actix_web::{HttpRequest, Scope};
use admin_requests::{list_admin_requests, review_admin_request, submit_admin_request};
use ai_chats::{ask_assistant, get_chat_history};
use auth::{login, logout, me};
use groups::{delete_message, get_messages, list_my_groups, post_message};
use weeks::{create_week, delete_week, delete_week_file, get_week, list_weeks, update_week, view_week_file};

mod admin_requests;
mod ai_chats;
mod auth;
pub mod groups;
mod health_check;
pub mod weeks;

use crate::core::AppError;
use crate::routes::health_check::*;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!("rejected json body: {}", err);
    let message = match &err {
        JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
        JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
        _ => "Invalid request body".to_string(),
    };
    AppError::validation_error(message).into()
}

// Path parameters are ids; one that does not parse cannot name anything.
fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!("rejected path: {}", err);
    AppError::not_found("Resource not found").into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!("rejected query string: {}", err);
    let message = match &err {
        QueryPayloadError::Deserialize(e) => format!("Invalid query string: {}", e),
        _ => "Invalid query string".to_string(),
    };
    AppError::validation_error(message).into()
}

fn util_routes() -> Scope {
    scope("").service(health_check)
}

fn weeks_routes() -> Scope {
    scope("weeks")
        .service(list_weeks)
        .service(create_week)
        .service(get_week)
        .service(update_week)
        .service(delete_week)
        .service(view_week_file)
        .service(delete_week_file)
}

fn admin_routes() -> Scope {
    scope("admin")
        .service(submit_admin_request)
        .service(list_admin_requests)
        .service(review_admin_request)
}

fn groups_routes() -> Scope {
    scope("groups")
        .service(list_my_groups)
        .service(post_message)
        .service(get_messages)
        .service(delete_message)
}

fn auth_routes() -> Scope {
    scope("auth").service(login).service(logout).service(me)
}

fn ai_routes() -> Scope {
    scope("ai").service(ask_assistant).service(get_chat_history)
}

pub fn career_guide_routes(conf: &mut ServiceConfig) {
    conf.service(
        scope("api")
            .app_data(JsonConfig::default().error_handler(json_error_handler))
            .app_data(PathConfig::default().error_handler(path_error_handler))
            .app_data(QueryConfig::default().error_handler(query_error_handler))
            .service(weeks_routes())
            .service(admin_routes())
            .service(groups_routes())
            .service(auth_routes())
            .service(ai_routes())
            .service(util_routes()),
    );
}

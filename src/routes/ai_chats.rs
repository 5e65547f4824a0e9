use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::core::assistant::ChatTurn;
use crate::core::jwt_auth::AuthenticatedUser;
use crate::core::{AppError, AppSuccessResponse, AssistantClient};
use crate::db::AiChatStore;
use crate::models::ai_chats::{AskAssistantRequest, NewAiChat};
use crate::models::pagination::{PaginationMeta, PaginationQuery};

#[tracing::instrument(name = "Ask Assistant", skip(chats, assistant, user, request), fields(user_id = %user.user_id))]
#[post("/chat")]
pub async fn ask_assistant(
    chats: web::Data<dyn AiChatStore>,
    assistant: web::Data<AssistantClient>,
    user: AuthenticatedUser,
    request: web::Json<AskAssistantRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let prompt = request.message.trim();
    if prompt.is_empty() {
        return Err(AppError::validation_error("Message is required"));
    }

    let recent = PaginationQuery {
        page: 1,
        per_page: assistant.history_turns().max(1) as i64,
    };
    let (mut previous, _) = chats.chats_for_user(user.user_id, &recent).await?;
    previous.reverse();
    let history: Vec<ChatTurn> = previous.iter().map(ChatTurn::from).collect();

    let response = assistant.reply(&history, prompt).await?;

    let stored = chats
        .insert_chat(&NewAiChat {
            user_id: user.user_id,
            prompt: prompt.to_string(),
            response,
            model: assistant.model().to_string(),
        })
        .await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(stored, "Assistant replied successfully")))
}

#[tracing::instrument(name = "Get Chat History", skip(chats, user), fields(user_id = %user.user_id))]
#[get("/chats")]
pub async fn get_chat_history(
    chats: web::Data<dyn AiChatStore>,
    user: AuthenticatedUser,
    pagination: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let page = pagination.into_inner().normalized();
    let (history, total) = chats.chats_for_user(user.user_id, &page).await?;

    let mut response = AppSuccessResponse::new(history, "Chat history retrieved successfully");
    response.pagination = Some(PaginationMeta::new(&page, total));
    Ok(HttpResponse::Ok().json(response))
}

use crate::api::AppState;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::middleware::AuthUser;
use crate::api::schemas::messaging::{
    ConversationResponse, ConversationsResponse, MessagesResponse, SendMessageRequest, SendMessageResponse,
    StartConversation,
};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Lists the caller's conversations, newest activity first.
///
/// # Errors
/// Returns `AppError::AuthError` without a valid bearer token.
pub async fn list_conversations(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let conversations = state.conversation_service.list_conversations(auth_user.user_id).await?;

    Ok(Json(ConversationsResponse {
        success: true,
        conversations: conversations.into_iter().map(Into::into).collect(),
    }))
}

/// Returns one conversation's messages, oldest first, and marks them read for the caller.
///
/// # Errors
/// Returns `AppError::NotFound` if the conversation does not exist or the caller is not in it.
pub async fn get_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(conversation_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    let messages = state.conversation_service.get_messages(conversation_id, auth_user.user_id).await?;

    Ok(Json(MessagesResponse { success: true, messages: messages.into_iter().map(Into::into).collect() }))
}

/// Opens (or returns) the conversation between the caller and another user.
///
/// # Errors
/// Returns `AppError::NotFound` for an unknown participant and `AppError::BadRequest` for an invalid pairing.
pub async fn start_conversation(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<StartConversation>,
) -> Result<impl IntoResponse> {
    let conversation =
        state.conversation_service.start_conversation(auth_user.user_id, payload.participant_id).await?;

    Ok(Json(ConversationResponse { success: true, conversation: conversation.into() }))
}

/// Stores a message and returns it with the updated conversation summary.
///
/// # Errors
/// Returns `AppError::BadRequest` if the message is blank or malformed.
/// Returns `AppError::NotFound` if the target conversation or recipient does not exist.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let (target, draft) = payload.into_parts().map_err(AppError::BadRequest)?;
    let sent = state.conversation_service.send_message(auth_user.user_id, target, draft).await?;

    Ok((StatusCode::CREATED, Json(SendMessageResponse::from(sent))))
}

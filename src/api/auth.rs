use crate::api::AppState;
use crate::api::extract::ApiJson;
use crate::api::schemas::auth::{Login, Registration, SessionResponse};
use crate::error::Result;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Registration>,
) -> Result<impl IntoResponse> {
    let session = state.auth_service.register(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

pub async fn login(State(state): State<AppState>, ApiJson(payload): ApiJson<Login>) -> Result<impl IntoResponse> {
    let session = state.auth_service.login(&payload.username, &payload.password).await?;
    Ok(Json(SessionResponse::from(session)))
}

use crate::error::AppError;
use crate::services::rate_limit_service::{RateLimitService, RateLimitTier};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_governor::GovernorError;

#[derive(Clone, Debug)]
pub struct TierState {
    pub service: RateLimitService,
    pub tier: RateLimitTier,
}

/// Records every governor decision for one tier; throttled responses carry `retry-after`.
pub async fn log_rate_limit_events(State(state): State<TierState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let retry_after = response.headers().get("retry-after").and_then(|v| v.to_str().ok());
    state.service.log_decision(state.tier, response.status(), retry_after);
    response
}

/// Renders governor rejections with the same JSON body as every other error.
pub fn governor_error_response(error: GovernorError) -> Response {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut response = AppError::RateLimited { retry_after_secs: wait_time }.into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            tracing::error!("Rate limiter could not determine the client address");
            AppError::Internal.into_response()
        }
        GovernorError::Other { code, msg, headers } => {
            let message = msg.unwrap_or_else(|| code.canonical_reason().unwrap_or("Error").to_string());
            let mut response = (code, axum::Json(json!({ "success": false, "message": message }))).into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_throttled_response_keeps_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));

        let response = governor_error_response(GovernorError::TooManyRequests { wait_time: 3, headers: Some(headers) });

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "3");
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Too many requests, retry in 3s");
    }

    #[tokio::test]
    async fn test_missing_peer_address_is_internal() {
        let response = governor_error_response(GovernorError::UnableToExtractKey);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["success"], false);
    }
}

use crate::api::rate_limit::{TierState, governor_error_response, log_rate_limit_events};
use crate::config::Config;
use crate::services::auth_service::AuthService;
use crate::services::conversation_service::ConversationService;
use crate::services::health_service::HealthService;
use crate::services::rate_limit_service::{RateLimitService, RateLimitTier};
use axum::body::Body;
use axum::http::Request;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod extract;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod rate_limit;
pub mod schemas;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub conversation_service: ConversationService,
    pub rate_limit_service: RateLimitService,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub auth_service: AuthService,
    pub conversation_service: ConversationService,
    pub rate_limit_service: RateLimitService,
}

/// Configures and returns the public API router, mounted under `/api`.
///
/// # Panics
/// Panics if the rate limiter configuration cannot be constructed.
#[allow(clippy::expect_used)]
pub fn app_router(config: Config, services: ServiceContainer) -> Router {
    let std_interval_ns = 1_000_000_000 / config.rate_limit.per_second.max(1);
    let standard_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(std_interval_ns))
            .burst_size(config.rate_limit.burst.max(1))
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .expect("Failed to build standard rate limiter config"),
    );

    // Password hashing makes register/login the expensive endpoints
    let auth_interval_ns = 1_000_000_000 / config.rate_limit.auth_per_second.max(1);
    let auth_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(auth_interval_ns))
            .burst_size(config.rate_limit.auth_burst.max(1))
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .expect("Failed to build auth rate limiter config"),
    );

    let state = AppState {
        config,
        auth_service: services.auth_service,
        conversation_service: services.conversation_service,
        rate_limit_service: services.rate_limit_service,
    };

    let auth_tier = TierState { service: state.rate_limit_service.clone(), tier: RateLimitTier::Auth };
    let standard_tier = TierState { service: state.rate_limit_service.clone(), tier: RateLimitTier::Standard };

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .layer(GovernorLayer::new(auth_conf).error_handler(governor_error_response))
        .layer(from_fn_with_state(auth_tier, log_rate_limit_events));

    let messaging_routes = Router::new()
        .route("/messages/conversations", get(messages::list_conversations).post(messages::start_conversation))
        .route("/messages/conversations/{id}", get(messages::get_messages))
        .route("/messages/send", post(messages::send_message))
        .layer(GovernorLayer::new(standard_conf).error_handler(governor_error_response))
        .layer(from_fn_with_state(standard_tier, log_rate_limit_events));

    Router::new()
        .nest("/api", auth_routes.merge(messaging_routes))
        .layer(PropagateRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = response.status();
                        span.record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id"), middleware::MakeRequestUuid))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}

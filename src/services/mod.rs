pub mod auth_service;
pub mod conversation_service;
pub mod health_service;
pub mod rate_limit_service;

use crate::domain::auth::AuthSession;
use crate::domain::user::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: u64,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        Self { success: true, token: session.token, user_id: session.user_id, expires_at: session.expires_at }
    }
}

impl From<Registration> for crate::services::auth_service::Registration {
    fn from(payload: Registration) -> Self {
        Self {
            username: payload.username,
            password: payload.password,
            display_name: payload.display_name,
            avatar_url: payload.avatar_url,
            role: payload.role,
        }
    }
}

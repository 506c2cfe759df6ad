use crate::domain::user::User;
use crate::error::AppError;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) password_hash: String,
    pub(crate) display_name: String,
    pub(crate) avatar_url: Option<String>,
    pub(crate) role: String,
    pub(crate) created_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = AppError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let role = record.role.parse().map_err(|e: String| {
            tracing::error!(user_id = %record.id, error = %e, "Stored user has an invalid role");
            AppError::Internal
        })?;

        Ok(Self {
            id: record.id,
            username: record.username,
            password_hash: record.password_hash,
            display_name: record.display_name,
            avatar_url: record.avatar_url,
            role,
            created_at: record.created_at,
        })
    }
}

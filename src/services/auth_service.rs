use crate::config::AuthConfig;
use crate::domain::auth::{AuthSession, Claims};
use crate::domain::user::{NewUser, Role};
use crate::error::{AppError, Result};
use crate::storage::UserStore;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use opentelemetry::{KeyValue, global, metrics::Counter};
use rand::rngs::OsRng;
use std::sync::Arc;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    registrations_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("bhromon-messaging");
        Self {
            login_total: meter
                .u64_counter("bhromon_auth_login_total")
                .with_description("Login attempts by outcome")
                .build(),
            registrations_total: meter
                .u64_counter("bhromon_auth_registrations_total")
                .with_description("Accounts created")
                .build(),
        }
    }
}

/// Profile fields collected at sign-up.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct AuthService {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    metrics: Metrics,
}

impl AuthService {
    #[must_use]
    pub fn new(config: AuthConfig, users: Arc<dyn UserStore>) -> Self {
        Self { config, users, metrics: Metrics::new() }
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for a blank username or display name or a short password.
    /// Returns `AppError::Conflict` if the username is taken.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, registration),
        fields(username = %registration.username, role = %registration.role, user_id = tracing::field::Empty)
    )]
    pub async fn register(&self, registration: Registration) -> Result<AuthSession> {
        let username = registration.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::BadRequest("Username cannot be empty".into()));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!("Password must be at least {MIN_PASSWORD_LEN} characters")));
        }
        let display_name = registration.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AppError::BadRequest("Display name cannot be empty".into()));
        }

        let password_hash = self.hash_password(&registration.password).await?;
        let user = self
            .users
            .create(NewUser {
                username,
                password_hash,
                display_name,
                avatar_url: registration.avatar_url.filter(|url| !url.trim().is_empty()),
                role: registration.role,
            })
            .await?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        tracing::info!("Account registered");
        self.metrics.registrations_total.add(1, &[KeyValue::new("role", user.role.as_str())]);

        self.issue_session(user.id)
    }

    /// # Errors
    /// Returns `AppError::AuthError` if the user does not exist or the password is wrong.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, username, password),
        fields(user_id = tracing::field::Empty)
    )]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            tracing::warn!("Login failed: user not found");
            self.metrics.login_total.add(1, &[KeyValue::new("status", "failure")]);
            return Err(AppError::AuthError);
        };

        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::warn!("Login failed: invalid password");
            self.metrics.login_total.add(1, &[KeyValue::new("status", "failure")]);
            return Err(AppError::AuthError);
        }

        self.metrics.login_total.add(1, &[KeyValue::new("status", "success")]);
        self.issue_session(user.id)
    }

    /// Verifies a bearer token and returns the user ID (subject).
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is invalid or expired.
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        Ok(Claims::decode(token, &self.config.jwt_secret)?.sub)
    }

    fn issue_session(&self, user_id: Uuid) -> Result<AuthSession> {
        let claims = Claims::new(user_id, self.config.access_token_ttl_secs);
        let token = claims.encode(&self.config.jwt_secret)?;
        Ok(AuthSession { token, user_id, expires_at: claims.exp })
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|_| AppError::Internal)
        })
        .await
        .map_err(|_| AppError::Internal)?
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash).map_err(|_| AppError::Internal)?;
            Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
        })
        .await
        .map_err(|_| AppError::Internal)?
    }
}

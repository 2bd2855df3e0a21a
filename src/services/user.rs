//! Admin user service
//!
//! Handles admin login/logout, session validation and the bootstrap of the
//! first admin account from configuration.

use crate::config::AdminConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for admin login
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginInput {
    /// Username or email
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

/// User service for admin accounts and sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
        }
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Create an admin account
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        if input.username.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }
        if !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }
        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }

        for login in [&input.username, &input.email] {
            if self
                .user_repo
                .get_by_login(login)
                .await
                .context("Failed to check existing user")?
                .is_some()
            {
                return Err(UserServiceError::UserExists(login.clone()));
            }
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .user_repo
            .create(input.username.trim(), input.email.trim(), &password_hash)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, "Admin account created");
        Ok(user)
    }

    /// Create the configured admin account when no user exists yet
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, config: &AdminConfig) -> Result<bool, UserServiceError> {
        let (Some(username), Some(email), Some(password)) =
            (&config.username, &config.email, &config.password)
        else {
            return Ok(false);
        };

        let count = self.user_repo.count().await.context("Failed to count users")?;
        if count > 0 {
            return Ok(false);
        }

        self.create_user(CreateUserInput {
            username: username.clone(),
            email: email.clone(),
            password: password.clone(),
        })
        .await?;
        Ok(true)
    }

    /// Check credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError("Invalid username or password".to_string())
        };

        let user = self
            .user_repo
            .get_by_login(input.login.trim())
            .await
            .context("Failed to get user")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::warn!(login = %input.login, "Rejected admin login");
            return Err(invalid());
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok((session, user))
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User owning a live session, `None` for unknown or expired tokens
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// Remove expired sessions, returns how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

//! Authentication service
//!
//! Registration, login, logout and resolving a session token back to the
//! user it belongs to. Sessions live in the database; the web layer only
//! carries the token.

use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{FieldErrors, LoginInput, RegisterInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Form input failed validation
    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("You've already signed up with that email. Login instead")]
    EmailTaken,

    #[error("This email does not exist. Please try again.")]
    UnknownEmail,

    #[error("Invalid password.")]
    InvalidPassword,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Authentication service
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a service whose sessions last `session_expiration_days`
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


    /// Register a new user and log them in.
    ///
    /// The first account ever created gets id 1 and with it admin rights.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, Session), AuthServiceError> {
        let input = input.normalized();
        input.validate().map_err(AuthServiceError::Validation)?;

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            tracing::info!(email = %input.email, "Registration rejected: email already registered");
            return Err(AuthServiceError::EmailTaken);
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.email, password_hash, input.name);
        let session = self.new_session(0)?;

        // A concurrent registration can still win the race for the email.
        let (user, session) = match self.user_repo.create_with_session(&user, &session).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => return Err(AuthServiceError::EmailTaken),
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!(user_id = user.id, admin = user.is_admin(), "User registered");

        Ok((user, session))
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), AuthServiceError> {
        input.validate().map_err(AuthServiceError::Validation)?;

        let user = self
            .user_repo
            .get_by_email(input.email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| {
                tracing::warn!(email = %input.email.trim(), "Login failed: unknown email");
                AuthServiceError::UnknownEmail
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::warn!(user_id = user.id, "Login failed: invalid password");
            return Err(AuthServiceError::InvalidPassword);
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok((user, session))
    }

    /// Invalidate a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AuthServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens yield `None`; expired sessions are removed.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<User>, AuthServiceError> {
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
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    /// Fresh session token for `user_id`, expiring after the configured lifetime
    fn new_session(&self, user_id: i64) -> Result<Session, AuthServiceError> {
        let now = Utc::now();
        let expires_at = Duration::try_days(self.session_expiration_days)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Session lifetime of {} days is out of range",
                    self.session_expiration_days
                )
            })?;

        Ok(Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, AuthServiceError> {
        let session = self.new_session(user_id)?;
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, AuthService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = AuthService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    #[tokio::test]
    async fn test_register_logs_in_and_first_user_is_admin() {
        let (_pool, service) = setup_test_service().await;

        let (alice, session) = service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .expect("Failed to register");
        assert_eq!(alice.id, 1);
        assert!(alice.is_admin());
        assert_eq!(session.user_id, alice.id);

        let resolved = service.resolve_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.email, "a@x.com");

        let (bob, _) = service
            .register(RegisterInput::new("b@x.com", "pw", "Bob"))
            .await
            .unwrap();
        assert_eq!(bob.id, 2);
        assert!(!bob.is_admin());
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (_pool, service) = setup_test_service().await;
        let (user, _) = service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();

        assert_ne!(user.password_hash, "pw");
        assert!(verify_password("pw", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_creates_nothing() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();

        let err = service
            .register(RegisterInput::new(" a@x.com ", "other", "Impostor"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthServiceError::EmailTaken));
        let user = service.user_repo.get_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert!(service.user_repo.get_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_pool, service) = setup_test_service().await;
        let err = service
            .register(RegisterInput::new("nope", "", "Alice"))
            .await
            .unwrap_err();
        match err {
            AuthServiceError::Validation(errors) => {
                assert!(errors.contains_key("email"));
                assert!(errors.contains_key("password"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(service.user_repo.get_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_checks_credentials() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();

        let (user, session) = service.login(LoginInput::new("a@x.com", "pw")).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(session.user_id, 1);

        let err = service.login(LoginInput::new("a@x.com", "wrong")).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::InvalidPassword));

        let err = service.login(LoginInput::new("z@x.com", "pw")).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::UnknownEmail));
        assert_eq!(err.to_string(), "This email does not exist. Please try again.");
    }

    #[tokio::test]
    async fn test_logout_returns_to_anonymous() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();
        let (_, session) = service.login(LoginInput::new("a@x.com", "pw")).await.unwrap();

        service.logout(&session.id).await.unwrap();
        assert!(service.resolve_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_resolves_to_none_and_is_removed() {
        let (pool, _) = setup_test_service().await;
        let service = AuthService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            -1,
        );
        let (_, session) = service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();

        assert!(service.resolve_session(&session.id).await.unwrap().is_none());
        assert!(service.session_repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let (pool, live) = setup_test_service().await;
        let stale = AuthService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            -1,
        );
        live.register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();
        stale.login(LoginInput::new("a@x.com", "pw")).await.unwrap();
        stale.login(LoginInput::new("a@x.com", "pw")).await.unwrap();

        assert_eq!(live.cleanup_expired_sessions().await.unwrap(), 2);
        assert_eq!(live.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_token_resolves_to_none() {
        let (_pool, service) = setup_test_service().await;
        assert!(service.resolve_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_an_error_and_creates_nothing() {
        let (pool, _) = setup_test_service().await;
        let service = AuthService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            100_000_000,
        );

        let err = service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthServiceError::Internal(_)));
        assert!(service.user_repo.get_by_email("a@x.com").await.unwrap().is_none());

        let err = service
            .login(LoginInput::new("a@x.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthServiceError::UnknownEmail));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_fails_login() {
        let (pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("a@x.com", "pw", "Alice"))
            .await
            .unwrap();
        let long_lived = AuthService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            i64::MAX,
        );

        let err = long_lived
            .login(LoginInput::new("a@x.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthServiceError::Internal(_)));
    }
}

//! User repository
//!
//! - `UserRepository` trait used by the auth service
//! - `SqlxUserRepository` implementing it for SQLite and MySQL
//!
//! A user is only ever created together with the session that logs them in,
//! in one transaction.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Session, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and its first session in one transaction.
    ///
    /// The session's `user_id` is replaced by the id assigned to the user.
    async fn create_with_session(
        &self,
        user: &User,
        session: &Session,
    ) -> Result<(User, Session)>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_USER: &str = "SELECT id, email, password_hash, name, created_at FROM users";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_with_session(
        &self,
        user: &User,
        session: &Session,
    ) -> Result<(User, Session)> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user, session).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user, session).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{} WHERE id = ?", SELECT_USER);
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by ID")?
                .map(|row| row_to_user_sqlite(&row))
                .transpose(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by ID")?
                .map(|row| row_to_user_mysql(&row))
                .transpose(),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("{} WHERE email = ?", SELECT_USER);
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(email)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by email")?
                .map(|row| row_to_user_sqlite(&row))
                .transpose(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(email)
                .fetch_optional(pool)
                .await
                .context("Failed to get user by email")?
                .map(|row| row_to_user_mysql(&row))
                .transpose(),
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(
    pool: &SqlitePool,
    user: &User,
    session: &Session,
) -> Result<(User, Session)> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, name, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?;
    let user = User {
        id: result.last_insert_rowid(),
        created_at: now,
        ..user.clone()
    };

    let session = Session {
        user_id: user.id,
        ..session.clone()
    };
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create session")?;

    tx.commit().await.context("Failed to commit registration")?;
    Ok((user, session))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(
    pool: &MySqlPool,
    user: &User,
    session: &Session,
) -> Result<(User, Session)> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, name, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?;
    let user = User {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..user.clone()
    };

    let session = Session {
        user_id: user.id,
        ..session.clone()
    };
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create session")?;

    tx.commit().await.context("Failed to commit registration")?;
    Ok((user, session))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a bare user row, for fixtures that need an author
#[cfg(test)]
impl SqlxUserRepository {
    pub(crate) async fn create(&self, user: &User) -> Result<User> {
        let Backend::Sqlite(pool) = self.pool.backend() else {
            anyhow::bail!("user fixtures are SQLite only");
        };
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.created_at)
        .execute(pool)
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            ..user.clone()
        })
    }
}

//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Comment, CommentWithAuthor};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a new comment and return it with its assigned id
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Comments on a post with their authors' names, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COMMENT_WITH_AUTHOR: &str = r#"
    SELECT c.id, c.author_id, c.post_id, c.text, u.name AS author_name
    FROM comments c
    INNER JOIN users u ON u.id = c.author_id
    WHERE c.post_id = ?
    ORDER BY c.id ASC
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_comment_sqlite(pool, comment).await,
            Backend::Mysql(pool) => create_comment_mysql(pool, comment).await,
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(SELECT_COMMENT_WITH_AUTHOR)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(row_to_comment_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(SELECT_COMMENT_WITH_AUTHOR)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(row_to_comment_mysql)
                .collect(),
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query("INSERT INTO comments (author_id, post_id, text) VALUES (?, ?, ?)")
        .bind(comment.author_id)
        .bind(comment.post_id)
        .bind(&comment.text)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        ..comment.clone()
    })
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<CommentWithAuthor> {
    Ok(CommentWithAuthor {
        comment: Comment {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            post_id: row.try_get("post_id")?,
            text: row.try_get("text")?,
        },
        author_name: row.try_get("author_name")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query("INSERT INTO comments (author_id, post_id, text) VALUES (?, ?, ?)")
        .bind(comment.author_id)
        .bind(comment.post_id)
        .bind(&comment.text)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        ..comment.clone()
    })
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<CommentWithAuthor> {
    Ok(CommentWithAuthor {
        comment: Comment {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            post_id: row.try_get("post_id")?,
            text: row.try_get("text")?,
        },
        author_name: row.try_get("author_name")?,
    })
}

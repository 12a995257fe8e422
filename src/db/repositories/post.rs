//! Post repository
//!
//! Posts are always read joined with their author's name since every page
//! that shows a post also shows who wrote it.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Post, PostInput, PostWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post and return it with its assigned id
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by ID together with its author's name
    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>>;

    /// List every post with its author's name, oldest first
    async fn list_with_authors(&self) -> Result<Vec<PostWithAuthor>>;

    /// Overwrite the editable fields. Author and date are left untouched.
    async fn update(&self, id: i64, input: &PostInput) -> Result<bool>;

    /// Delete a post and its comments. Returns false if no such post.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_POST: &str =
    "SELECT id, author_id, title, subtitle, date, body, img_url FROM blog_posts";

const SELECT_POST_WITH_AUTHOR: &str = r#"
    SELECT p.id, p.author_id, p.title, p.subtitle, p.date, p.body, p.img_url,
           u.name AS author_name
    FROM blog_posts p
    INNER JOIN users u ON u.id = p.author_id
"#;

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_post_sqlite(pool, post).await,
            Backend::Mysql(pool) => create_post_mysql(pool, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE id = ?", SELECT_POST);
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post by ID")?
                .map(|row| row_to_post_sqlite(&row))
                .transpose(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post by ID")?
                .map(|row| row_to_post_mysql(&row))
                .transpose(),
        }
    }

    async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let sql = format!("{} WHERE p.id = ?", SELECT_POST_WITH_AUTHOR);
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post with author")?
                .map(|row| row_to_post_with_author_sqlite(&row))
                .transpose(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post with author")?
                .map(|row| row_to_post_with_author_mysql(&row))
                .transpose(),
        }
    }

    async fn list_with_authors(&self) -> Result<Vec<PostWithAuthor>> {
        let sql = format!("{} ORDER BY p.id ASC", SELECT_POST_WITH_AUTHOR);
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list posts")?
                .iter()
                .map(row_to_post_with_author_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list posts")?
                .iter()
                .map(row_to_post_with_author_mysql)
                .collect(),
        }
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<bool> {
        let sql = "UPDATE blog_posts SET title = ?, subtitle = ?, img_url = ?, body = ? WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.subtitle)
                .bind(&input.img_url)
                .bind(&input.body)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.subtitle)
                .bind(&input.img_url)
                .bind(&input.body)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update post")?;

        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_post_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_post_mysql(pool, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.subtitle)
    .bind(&post.date)
    .bind(&post.body)
    .bind(&post.img_url)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        ..post.clone()
    })
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?;
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?;

    tx.commit().await.context("Failed to commit post deletion")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        date: row.try_get("date")?,
        body: row.try_get("body")?,
        img_url: row.try_get("img_url")?,
    })
}

fn row_to_post_with_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithAuthor> {
    Ok(PostWithAuthor {
        post: row_to_post_sqlite(row)?,
        author_name: row.try_get("author_name")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.subtitle)
    .bind(&post.date)
    .bind(&post.body)
    .bind(&post.img_url)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        ..post.clone()
    })
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post comments")?;
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?;

    tx.commit().await.context("Failed to commit post deletion")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        date: row.try_get("date")?,
        body: row.try_get("body")?,
        img_url: row.try_get("img_url")?,
    })
}

fn row_to_post_with_author_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithAuthor> {
    Ok(PostWithAuthor {
        post: row_to_post_mysql(row)?,
        author_name: row.try_get("author_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, is_unique_violation, migrations};
    use crate::models::User;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool.clone())
            .create(&User::new("admin@x.com".into(), "hash".into(), "Admin".into()))
            .await
            .expect("Failed to create test user");
        (pool.clone(), SqlxPostRepository::new(pool))
    }

    fn test_post(title: &str) -> Post {
        Post {
            id: 0,
            author_id: 1,
            title: title.to_string(),
            subtitle: "Sub".to_string(),
            date: "January 01, 2024".to_string(),
            body: "<p>Body</p>".to_string(),
            img_url: "http://img".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_with_author() {
        let (_, repo) = setup_test_repo().await;

        let created = repo.create(&test_post("Hello")).await.unwrap();
        assert_eq!(created.id, 1);

        let found = repo.get_with_author(created.id).await.unwrap().unwrap();
        assert_eq!(found.post, created);
        assert_eq!(found.author_name, "Admin");

        assert!(repo.get_by_id(42).await.unwrap().is_none());
        assert!(repo.get_with_author(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_id() {
        let (_, repo) = setup_test_repo().await;
        assert!(repo.list_with_authors().await.unwrap().is_empty());

        repo.create(&test_post("First")).await.unwrap();
        repo.create(&test_post("Second")).await.unwrap();

        let titles: Vec<_> = repo
            .list_with_authors()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.post.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_duplicate_title_is_unique_violation() {
        let (_, repo) = setup_test_repo().await;
        repo.create(&test_post("Hello")).await.unwrap();

        let err = repo.create(&test_post("Hello")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_date() {
        let (_, repo) = setup_test_repo().await;
        let created = repo.create(&test_post("Hello")).await.unwrap();

        let input = PostInput::new("Hello again", "New sub", "https://img/2", "<p>New</p>");
        assert!(repo.update(created.id, &input).await.unwrap());

        let updated = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Hello again");
        assert_eq!(updated.subtitle, "New sub");
        assert_eq!(updated.img_url, "https://img/2");
        assert_eq!(updated.body, "<p>New</p>");
        assert_eq!(updated.author_id, created.author_id);
        assert_eq!(updated.date, created.date);

        assert!(!repo.update(99, &input).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_comments() {
        let (pool, repo) = setup_test_repo().await;
        let kept = repo.create(&test_post("Kept")).await.unwrap();
        let doomed = repo.create(&test_post("Doomed")).await.unwrap();
        pool.execute(&format!(
            "INSERT INTO comments (author_id, post_id, text) VALUES (1, {}, 'a'), (1, {}, 'b')",
            doomed.id, kept.id
        ))
        .await
        .unwrap();

        assert!(repo.delete(doomed.id).await.unwrap());
        assert!(repo.get_by_id(doomed.id).await.unwrap().is_none());
        assert!(!repo.delete(doomed.id).await.unwrap());

        let remaining = pool
            .execute(&format!("DELETE FROM comments WHERE post_id = {}", doomed.id))
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        let kept_comments = pool
            .execute(&format!("DELETE FROM comments WHERE post_id = {}", kept.id))
            .await
            .unwrap();
        assert_eq!(kept_comments, 1);
    }
}

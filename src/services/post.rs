//! Post service
//!
//! Reading, writing and deleting blog posts. Callers are responsible for the
//! admin check; this layer only enforces data rules (validation, unique
//! titles, existence).

use crate::db::is_unique_violation;
use crate::db::repositories::PostRepository;
use crate::models::{today_post_date, FieldErrors, Post, PostInput, PostWithAuthor};
use anyhow::Context;
use std::sync::Arc;

/// Error types for post operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("A post with this title already exists.")]
    DuplicateTitle,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PostServiceError {
    /// Field errors to show on the post form, if this error belongs there
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors.clone()),
            Self::DuplicateTitle => {
                let mut errors = FieldErrors::new();
                errors.insert("title", self.to_string());
                Some(errors)
            }
            _ => None,
        }
    }
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// All posts, in storage order
    pub async fn list(&self) -> Result<Vec<PostWithAuthor>, PostServiceError> {
        Ok(self.repo.list_with_authors().await?)
    }

    /// One post with its author's name
    pub async fn get(&self, id: i64) -> Result<PostWithAuthor, PostServiceError> {
        self.repo
            .get_with_author(id)
            .await?
            .ok_or(PostServiceError::NotFound(id))
    }

    /// Publish a new post dated today
    pub async fn create(&self, author_id: i64, input: PostInput) -> Result<Post, PostServiceError> {
        let input = input.normalized();
        input.validate().map_err(PostServiceError::Validation)?;

        let post = Post {
            id: 0,
            author_id,
            title: input.title,
            subtitle: input.subtitle,
            date: today_post_date(),
            body: input.body,
            img_url: input.img_url,
        };

        let post = match self.repo.create(&post).await {
            Ok(post) => post,
            Err(e) if is_unique_violation(&e) => return Err(PostServiceError::DuplicateTitle),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(post_id = post.id, author_id, "Post created");
        Ok(post)
    }

    /// Overwrite title, subtitle, image and body. Author and date stay.
    pub async fn update(&self, id: i64, input: PostInput) -> Result<Post, PostServiceError> {
        let input = input.normalized();
        input.validate().map_err(PostServiceError::Validation)?;

        let existing = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound(id))?;

        match self.repo.update(id, &input).await {
            Ok(true) => {}
            // Deleted between the read and the write
            Ok(false) => return Err(PostServiceError::NotFound(id)),
            Err(e) if is_unique_violation(&e) => return Err(PostServiceError::DuplicateTitle),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(post_id = id, "Post updated");
        Ok(Post {
            title: input.title,
            subtitle: input.subtitle,
            img_url: input.img_url,
            body: input.body,
            ..existing
        })
    }

    /// Delete a post together with its comments
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .context("Failed to delete post")?;
        if !deleted {
            return Err(PostServiceError::NotFound(id));
        }

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }
}

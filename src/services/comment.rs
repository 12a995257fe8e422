//! Comment service

use std::sync::Arc;

use anyhow::Context;

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput, FieldErrors};

/// Error types for comment operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self { repo, post_repo }
    }

    /// Add a comment by `author_id` to post `post_id`
    pub async fn create(
        &self,
        author_id: i64,
        post_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        input.validate().map_err(CommentServiceError::Validation)?;

        if self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to check post")?
            .is_none()
        {
            return Err(CommentServiceError::PostNotFound(post_id));
        }

        let comment = self
            .repo
            .create(&Comment {
                id: 0,
                author_id,
                post_id,
                text: input.text.trim().to_string(),
            })
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, post_id, author_id, "Comment added");
        Ok(comment)
    }

    /// Comments on one post, oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        Ok(self.repo.list_by_post(post_id).await?)
    }
}

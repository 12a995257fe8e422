//! Comment model

use serde::{Deserialize, Serialize};

use super::FieldErrors;

const MAX_COMMENT_LEN: usize = 250;

/// Comment left by a user on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    pub text: String,
}

/// Comment joined with its author's display name
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
}

/// Comment form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub text: String,
}

impl CreateCommentInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.text.trim().is_empty() {
            errors.insert("text", "Comment is required.".to_string());
        } else if self.text.chars().count() > MAX_COMMENT_LEN {
            errors.insert(
                "text",
                format!("Comment must be at most {} characters.", MAX_COMMENT_LEN),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

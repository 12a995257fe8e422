//! Data models
//!
//! Database entities (User, Session, Post, Comment), the read views that join
//! author names onto posts and comments, and the validated form inputs.

mod comment;
mod post;
mod session;
mod user;

pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use post::{format_post_date, today_post_date, Post, PostInput, PostWithAuthor};
pub use session::Session;
pub use user::{LoginInput, RegisterInput, User, ADMIN_USER_ID};

use std::collections::BTreeMap;

/// Per-field validation messages, keyed by form field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

//! Database repositories
//!
//! One repository per entity. Each exposes a trait used by the services and
//! a sqlx implementation over [`DynDatabasePool`](crate::db::DynDatabasePool).

pub mod comment;
pub mod post;
pub mod session;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

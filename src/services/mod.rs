//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They apply
//! validation and data rules and translate storage failures into typed
//! errors the handlers can act on.

pub mod auth;
pub mod comment;
pub mod password;
pub mod post;

pub use auth::{AuthService, AuthServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};

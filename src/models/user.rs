//! User model
//!
//! Users are created at registration and never change afterwards. The
//! account with [`ADMIN_USER_ID`] (the first one ever registered) is the
//! only one allowed to write posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FieldErrors;

/// Identifier of the single privileged account.
pub const ADMIN_USER_ID: i64 = 1;

/// Registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2, PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User. The password must already be hashed.
    pub fn new(email: String, password_hash: String, name: String) -> Self {
        Self {
            id: 0, // assigned by the database
            email,
            password_hash,
            name,
            created_at: Utc::now(),
        }
    }

    /// Whether this user may create, edit and delete posts
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_USER_ID
    }
}

/// Registration form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl RegisterInput {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    /// Trim surrounding whitespace from email and name
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        validate_email(&self.email, &mut errors);
        if self.password.is_empty() {
            errors.insert("password", "Password is required.".to_string());
        }
        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required.".to_string());
        } else if self.name.chars().count() > 200 {
            errors.insert("name", "Name must be at most 200 characters.".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Login form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.insert("email", "Email is required.".to_string());
        }
        if self.password.is_empty() {
            errors.insert("password", "Password is required.".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_email(email: &str, errors: &mut FieldErrors) {
    let email = email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required.".to_string());
        return;
    }
    if email.chars().count() > 200 {
        errors.insert("email", "Email must be at most 200 characters.".to_string());
        return;
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        errors.insert("email", "Invalid email address.".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_first_user_is_admin() {
        let mut user = User::new("a@x.com".into(), "hash".into(), "Alice".into());
        user.id = 1;
        assert!(user.is_admin());
        user.id = 2;
        assert!(!user.is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@x.com".into(), "secret-hash".into(), "Alice".into());
        let serialized = serde_yaml::to_string(&user).unwrap();
        assert!(serialized.contains("Alice"));
        assert!(!serialized.contains("secret-hash"));
    }

    #[test]
    fn test_register_input_valid() {
        let input = RegisterInput::new("a@x.com", "pw", "Alice");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_register_input_reports_every_field() {
        let errors = RegisterInput::new("", "", " ").validate().unwrap_err();
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
        assert!(errors.contains_key("name"));
    }

    #[test]
    fn test_register_input_rejects_malformed_email() {
        for email in ["alice", "@x.com", "a@", "a@b@c"] {
            let errors = RegisterInput::new(email, "pw", "A").validate().unwrap_err();
            assert_eq!(errors["email"], "Invalid email address.", "email: {email}");
        }
    }

    #[test]
    fn test_register_input_normalized() {
        let input = RegisterInput::new("  a@x.com ", "pw", " Alice ").normalized();
        assert_eq!(input.email, "a@x.com");
        assert_eq!(input.name, "Alice");
    }

    #[test]
    fn test_login_input_requires_fields() {
        assert!(LoginInput::new("a@x.com", "pw").validate().is_ok());
        let errors = LoginInput::new("", "").validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}

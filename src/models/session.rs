//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side login session. `id` is the token carried by the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: "token".to_string(),
            user_id: 1,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(!session(Duration::days(1)).is_expired());
        assert!(session(Duration::seconds(-1)).is_expired());
    }
}

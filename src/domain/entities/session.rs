//! User Session entity and repository trait.
//!
//! Maps to the `user_sessions` table in the database schema.
//! Used for refresh token management.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Represents a user session for refresh token management.
///
/// Maps to the `user_sessions` table:
/// - id: UUID PRIMARY KEY
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - tenant_id: BIGINT NOT NULL REFERENCES tenants(id)
/// - refresh_token_hash: VARCHAR(64) NOT NULL (SHA-256 hex)
/// - device_info: TEXT NULL (user agent string)
/// - expires_at: TIMESTAMPTZ NOT NULL
/// - created_at / last_used_at: TIMESTAMPTZ NOT NULL
/// - revoked_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub tenant_id: i64,

    /// SHA-256 hash of the refresh token (never store raw tokens)
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    /// Raw user agent string
    pub device_info: Option<String>,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,

    /// When the session was revoked (None if active)
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new session with a fresh UUID.
    pub fn new(
        user_id: i64,
        tenant_id: i64,
        refresh_token_hash: String,
        device_info: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            refresh_token_hash,
            device_info,
            expires_at,
            created_at: now,
            last_used_at: now,
            revoked_at: None,
        }
    }

    /// Check if the session is currently active (not expired, not revoked).
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

/// Repository trait for session data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session.
    async fn create(&self, session: &Session) -> Result<Session, AppError>;

    /// Look up a session by the hash of its refresh token.
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AppError>;

    /// Rotate the refresh token of a session, only if `old_hash` is still the
    /// current one. Returns false when another rotation or a revocation won.
    async fn update_token_hash(
        &self,
        id: Uuid,
        old_hash: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Mark a session as revoked.
    async fn revoke(&self, id: Uuid) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_session_is_active() {
        let session = Session::new(1, 2, "hash".into(), None, Utc::now() + Duration::days(1));
        assert!(session.is_active());
    }

    #[test]
    fn test_expired_session_is_inactive() {
        let session = Session::new(1, 2, "hash".into(), None, Utc::now() - Duration::seconds(1));
        assert!(!session.is_active());
    }

    #[test]
    fn test_revoked_session_is_inactive() {
        let mut session = Session::new(1, 2, "hash".into(), None, Utc::now() + Duration::days(1));
        session.revoked_at = Some(Utc::now());
        assert!(!session.is_active());
    }
}

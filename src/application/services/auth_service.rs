//! Authentication Service
//!
//! Handles credential login, JWT access tokens and refresh-token sessions.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::JwtSettings;
use crate::domain::{Session, SessionRepository, TenantRepository, User, UserRepository};
use crate::shared::error::AppError;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Authenticate with email and password
    async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<String>,
    ) -> Result<(User, AuthTokens), AuthError>;

    /// Exchange a refresh token for a new token pair (the old one stops working)
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke a refresh token (logout). Unknown tokens are ignored.
    async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError>;
}

/// Authentication tokens response
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Tenant ID
    pub tid: String,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    /// User and tenant ids carried by the token
    pub fn identity(&self) -> Result<(i64, i64), AuthError> {
        let user_id = self.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        let tenant_id = self.tid.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok((user_id, tenant_id))
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::AccountDisabled => AppError::Unauthorized("Account disabled".into()),
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            AuthError::InvalidToken => AppError::Unauthorized("Invalid token".into()),
            AuthError::SessionNotFound => {
                AppError::Unauthorized("Session not found or expired".into())
            }
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Store(e) => e,
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash refresh token for storage
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sign an access token for a user in a tenant
pub fn issue_access_token(
    settings: &JwtSettings,
    user_id: i64,
    tenant_id: i64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        tid: tenant_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(settings.access_token_expiry_minutes)).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate an access token
pub fn decode_access_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// AuthService implementation
pub struct AuthServiceImpl<U, S, T>
where
    U: UserRepository,
    S: SessionRepository,
    T: TenantRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    tenant_repo: Arc<T>,
    jwt_settings: JwtSettings,
}

impl<U, S, T> AuthServiceImpl<U, S, T>
where
    U: UserRepository,
    S: SessionRepository,
    T: TenantRepository,
{
    /// Create a new AuthServiceImpl
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        tenant_repo: Arc<T>,
        jwt_settings: JwtSettings,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            tenant_repo,
            jwt_settings,
        }
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user_id: i64, tenant_id: i64) -> Result<AuthTokens, AuthError> {
        let access_token = issue_access_token(&self.jwt_settings, user_id, tenant_id)?;

        // Opaque refresh token; only its hash is stored
        let refresh_token = format!("{}.{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt_settings.access_token_expiry_minutes * 60,
            token_type: "Bearer".to_string(),
        })
    }

    /// The user and its tenant must both be active
    async fn ensure_active(&self, user: &User) -> Result<(), AuthError> {
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        let tenant = self.tenant_repo.find_by_id(user.tenant_id).await?;
        match tenant {
            Some(tenant) if tenant.is_active => Ok(()),
            _ => Err(AuthError::AccountDisabled),
        }
    }

    fn refresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.jwt_settings.refresh_token_expiry_days)
    }
}

#[async_trait]
impl<U, S, T> AuthService for AuthServiceImpl<U, S, T>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
    T: TenantRepository + 'static,
{
    async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<String>,
    ) -> Result<(User, AuthTokens), AuthError> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.ensure_active(&user).await?;

        let tokens = self.generate_tokens(user.id, user.tenant_id)?;

        let session = Session::new(
            user.id,
            user.tenant_id,
            hash_refresh_token(&tokens.refresh_token),
            device_info,
            self.refresh_expiry(),
        );
        self.session_repo.create(&session).await?;

        info!(user_id = user.id, tenant_id = user.tenant_id, "User logged in");
        Ok((user, tokens))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let old_hash = hash_refresh_token(refresh_token);
        let session = self
            .session_repo
            .find_by_token_hash(&old_hash)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !session.is_active() {
            return Err(AuthError::TokenExpired);
        }

        let user = self
            .user_repo
            .find_by_id(session.tenant_id, session.user_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if let Err(e) = self.ensure_active(&user).await {
            self.session_repo.revoke(session.id).await?;
            return Err(e);
        }

        // Rotation: the presented token is replaced, once
        let tokens = self.generate_tokens(user.id, user.tenant_id)?;
        let rotated = self
            .session_repo
            .update_token_hash(
                session.id,
                &old_hash,
                &hash_refresh_token(&tokens.refresh_token),
                self.refresh_expiry(),
            )
            .await?;
        if !rotated {
            warn!(user_id = user.id, session_id = %session.id, "Refresh token reused");
            return Err(AuthError::SessionNotFound);
        }

        Ok(tokens)
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&hash_refresh_token(refresh_token))
            .await?;

        match session {
            Some(session) => {
                self.session_repo.revoke(session.id).await?;
                info!(user_id = session.user_id, "Session revoked");
            }
            None => warn!("Logout with unknown refresh token"),
        }
        Ok(())
    }
}

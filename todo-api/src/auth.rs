//! Authentication Module
//!
//! Username/password registration, bearer token issuance and per-request
//! token verification.
//!
//! Passwords are hashed with Argon2id into PHC strings; tokens are HS256
//! JWTs whose subject is the user id. Every verification failure collapses
//! into the same 401 so callers learn nothing about why a token was refused.

use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use todo_core::{ConfigError, User, UserId};
use todo_storage::TodoStore;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Default token lifetime: 30 minutes.
pub const DEFAULT_JWT_EXPIRATION_SECS: i64 = 1800;

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS)
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// Time checks are done here rather than inside `jsonwebtoken`, so tests can
/// pin the clock.
pub trait JwtClock: Send + Sync {
    /// Get current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Test clock helpers for common scenarios.
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2020-01-01 00:00:00 UTC
    pub fn expired() -> FixedClock {
        FixedClock(1577836800)
    }

    /// 2030-01-01 00:00:00 UTC
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "TODO_JWT_SECRET".to_string(),
            });
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Get the length of the secret without exposing it.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (HS256)
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 30 minutes)
    pub jwt_expiration_secs: i64,

    /// Leeway applied to `exp` to absorb clock drift (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: DEFAULT_JWT_EXPIRATION_SECS,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `TODO_JWT_SECRET`: JWT signing secret
    /// - `TODO_JWT_EXPIRATION_SECS`: token lifetime (default: 1800)
    /// - `TODO_JWT_CLOCK_SKEW_SECS`: leeway on expiry (default: 60)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("TODO_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("TODO_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_JWT_EXPIRATION_SECS),
            jwt_clock_skew_secs: std::env::var("TODO_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn JwtClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the authentication configuration for production use.
    ///
    /// Call at startup. In development, insecure settings only log warnings.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        let environment = std::env::var("TODO_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();

        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ConfigError::InvalidValue {
                    field: "TODO_JWT_SECRET".to_string(),
                    value: "[default]".to_string(),
                    reason: format!(
                        "insecure default secret is not allowed when TODO_ENVIRONMENT={}",
                        environment
                    ),
                });
            }
            tracing::warn!(
                "SECURITY WARNING: Using insecure default JWT secret. \
                 Set TODO_JWT_SECRET to a secure random value (minimum 32 characters) \
                 before deploying."
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ConfigError::InvalidValue {
                    field: "TODO_JWT_SECRET".to_string(),
                    value: format!("[{} chars]", self.jwt_secret.len()),
                    reason: "must be at least 32 characters in production".to_string(),
                });
            }
            tracing::warn!(
                "SECURITY WARNING: JWT secret is short ({} chars). \
                 For production, use at least 32 characters.",
                self.jwt_secret.len()
            );
        }

        Ok(())
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create new claims for a user using a clock.
    pub fn new(user_id: UserId, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now + expiration_secs,
        }
    }

    /// Check if the token has expired according to a clock.
    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }

    /// The subject as a user id, if it is one.
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}

/// Validate a JWT and extract its claims.
///
/// Only the signature is checked by `jsonwebtoken`; expiry is checked here
/// against the configured clock with `jwt_clock_skew_secs` of leeway. Any
/// failure is reported as [`ApiError::invalid_credentials`].
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::invalid_credentials()
        })?
        .claims;

    let now = config.clock.now_epoch_secs();
    if claims.exp < now - config.jwt_clock_skew_secs {
        tracing::debug!(exp = claims.exp, now, "Rejected expired bearer token");
        return Err(ApiError::invalid_credentials());
    }

    Ok(claims)
}

/// Generate a signed token for a user.
pub fn generate_jwt_token(config: &AuthConfig, user_id: UserId) -> ApiResult<String> {
    let claims = Claims::new(user_id, config.jwt_expiration_secs, &*config.clock);
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

// ============================================================================
// PASSWORD HASHING
// ============================================================================

/// Hash a password into an Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// `Err` only if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash checked against when the username is unknown, so a login attempt
/// costs one verification either way.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("todo-api-dummy-password").ok());

async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal_error(format!("Password task failed: {}", e)))
}

// ============================================================================
// AUTH SERVICE
// ============================================================================

/// Issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessToken {
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

/// Registration, login and token verification over a [`TodoStore`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TodoStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn TodoStore>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register a new user. The raw password is hashed before it reaches
    /// the store and is never logged.
    pub async fn register(&self, username: &str, password: &str) -> ApiResult<User> {
        let password = password.to_string();
        let hashed = run_blocking(move || hash_password(&password))
            .await?
            .map_err(|e| ApiError::internal_error(format!("Failed to hash password: {}", e)))?;

        let user = self.store.create_user(username, &hashed).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AccessToken> {
        let user = self.store.get_user_by_username(username).await?;

        let stored_hash = user.as_ref().map(|user| user.hashed_password.clone());
        let password = password.to_string();
        let verified = run_blocking(move || match stored_hash {
            Some(hash) => verify_password(&password, &hash).unwrap_or(false),
            None => {
                if let Some(dummy) = DUMMY_HASH.as_ref() {
                    let _ = verify_password(&password, dummy);
                }
                false
            }
        })
        .await?;

        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::info!("Login rejected");
                return Err(ApiError::incorrect_login());
            }
        };

        let access_token = generate_jwt_token(&self.config, user.id)?;
        tracing::info!(user_id = %user.id, "Token issued");
        Ok(AccessToken {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> ApiResult<User> {
        let claims = validate_jwt_token(&self.config, token)?;
        let user_id = claims.user_id().ok_or_else(ApiError::invalid_credentials)?;

        match self.store.get_user(user_id).await? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!(user_id = %user_id, "Token subject no longer exists");
                Err(ApiError::invalid_credentials())
            }
        }
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .finish()
    }
}

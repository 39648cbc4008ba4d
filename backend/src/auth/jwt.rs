//! JWT token issuance and validation
//!
//! Tokens are HS256-signed and self-contained. There is no refresh token and
//! no server-side revocation list; a token is valid until its `exp`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chatmentor_shared::{AuthError, Role};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (internal numeric user id)
    pub sub: String,
    /// Unique per issuance
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Display name
    pub name: String,
    pub role: Role,
    /// External user GUID
    pub uid: Uuid,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    /// Internal user id carried in `sub`
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Pre-computed JWT keys
/// These are expensive to create, so we cache them in AppState
#[derive(Clone)]
struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

/// Token issuer and validator
///
/// Keys are wrapped in Arc, so cloning is cheap.
#[derive(Clone)]
pub struct TokenService {
    keys: JwtKeys,
    issuer: String,
    audience: String,
    strict: bool,
    default_ttl: Duration,
}

impl TokenService {
    /// Build the service from configuration
    ///
    /// Fails when no signing secret is configured. Call once at startup.
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.trim().is_empty() {
            anyhow::bail!("JWT signing secret is not configured (set CM__JWT__SECRET or JWT_SECRET)");
        }

        Ok(Self {
            keys: JwtKeys::new(&config.secret),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            strict: config.strict_validation,
            default_ttl: Duration::minutes(config.ttl_minutes()),
        })
    }

    /// Lifetime applied by [`TokenService::issue_default`]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token with the configured lifetime
    pub fn issue_default(
        &self,
        subject: i64,
        user_guid: Uuid,
        display_name: &str,
        role: Role,
    ) -> Result<IssuedToken> {
        self.issue(subject, user_guid, display_name, role, self.default_ttl)
    }

    /// Issue a token valid for `ttl` from now
    pub fn issue(
        &self,
        subject: i64,
        user_guid: Uuid,
        display_name: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        self.issue_at(subject, user_guid, display_name, role, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        subject: i64,
        user_guid: Uuid,
        display_name: &str,
        role: Role,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let expires_at = now + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            name: display_name.to_string(),
            role,
            uid: user_guid,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign token: {}", e))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate signature, expiry and (in strict mode) issuer and audience
    #[inline]
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate as if the current time were `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against `now` with zero leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if self.strict {
            validation.set_issuer(&[&self.issuer]);
            validation.set_audience(&[&self.audience]);
        } else {
            validation.validate_aud = false;
        }

        let data = decode::<Claims>(token, &self.keys.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if data.claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(data.claims)
    }
}

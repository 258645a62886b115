use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

// ============================================================================
// Signing Domains
// ============================================================================

/// Independent signing keys. Each has its own secret and TTL, and the domain
/// tag is embedded in the claims so a token can only verify under the key it
/// was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningDomain {
    /// Primary domain: access tokens and WebSocket handshakes.
    Access,
    /// Primary domain refresh policy (separate secret and TTL).
    Refresh,
    /// Secondary guard domain.
    Secondary,
}

impl SigningDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningDomain::Access => "access",
            SigningDomain::Refresh => "refresh",
            SigningDomain::Secondary => "secondary",
        }
    }
}

#[derive(Clone)]
pub struct DomainKey {
    pub secret: SecretString,
    pub ttl: Duration,
}

impl DomainKey {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }
}

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub typ: SigningDomain,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthorized)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token signature")]
    InvalidSignature,
}

// ============================================================================
// Token Codec
// ============================================================================

#[derive(Clone)]
pub struct TokenCodec {
    access: DomainKey,
    refresh: DomainKey,
    secondary: DomainKey,
}

impl TokenCodec {
    pub fn new(access: DomainKey, refresh: DomainKey, secondary: DomainKey) -> Self {
        Self {
            access,
            refresh,
            secondary,
        }
    }

    fn key(&self, domain: SigningDomain) -> &DomainKey {
        match domain {
            SigningDomain::Access => &self.access,
            SigningDomain::Refresh => &self.refresh,
            SigningDomain::Secondary => &self.secondary,
        }
    }

    pub fn ttl(&self, domain: SigningDomain) -> Duration {
        self.key(domain).ttl
    }

    /// Build claims for `user_id` in `domain`, issued at `now`.
    pub fn claims_at(&self, user_id: Uuid, domain: SigningDomain, now: OffsetDateTime) -> Claims {
        let iat = now.unix_timestamp();
        Claims {
            sub: user_id.to_string(),
            typ: domain,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat + self.key(domain).ttl.whole_seconds(),
        }
    }

    /// Sign claims with the key of `domain`. Deterministic for fixed claims.
    pub fn sign(&self, claims: &Claims, domain: SigningDomain) -> AppResult<String> {
        if claims.typ != domain {
            return Err(AppError::Internal(format!(
                "claims tagged {} cannot be signed as {}",
                claims.typ.as_str(),
                domain.as_str()
            )));
        }
        let header = Header::new(Algorithm::HS256);
        encode(
            &header,
            claims,
            &EncodingKey::from_secret(self.key(domain).secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AppError::Internal(e.to_string()))
    }

    pub fn issue(&self, user_id: Uuid, domain: SigningDomain) -> AppResult<String> {
        let claims = self.claims_at(user_id, domain, OffsetDateTime::now_utc());
        self.sign(&claims, domain)
    }

    pub fn verify(&self, token: &str, domain: SigningDomain) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.key(domain).secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidSignature,
        })?;

        if claims.typ != domain {
            return Err(TokenError::InvalidSignature);
        }
        Ok(claims)
    }
}

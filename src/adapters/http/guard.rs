//! Bearer-token guards for the primary and secondary signing domains.
//!
//! Both guards run the same algorithm; the domain is chosen by the marker
//! type. Verified claims are handed to the handler as the extractor value.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt::{Claims, SigningDomain, TokenCodec},
};

pub trait GuardDomain: Send + Sync + 'static {
    const DOMAIN: SigningDomain;
}

pub struct Primary;

impl GuardDomain for Primary {
    const DOMAIN: SigningDomain = SigningDomain::Access;
}

pub struct Secondary;

impl GuardDomain for Secondary {
    const DOMAIN: SigningDomain = SigningDomain::Secondary;
}

/// Claims of a request that passed the guard for domain `D`.
pub struct Authenticated<D: GuardDomain> {
    pub user_id: Uuid,
    pub claims: Claims,
    _domain: PhantomData<D>,
}

pub type AccessClaims = Authenticated<Primary>;
pub type SecondaryClaims = Authenticated<Secondary>;

impl<D: GuardDomain> FromRequestParts<AppState> for Authenticated<D> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = authorize(&state.codec, D::DOMAIN, &parts.headers)?;
        Ok(Self {
            user_id: claims.user_id()?,
            claims,
            _domain: PhantomData,
        })
    }
}

/// Text left after dropping an optional `Bearer` prefix, or `None` if that is empty.
fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AppError::Unauthorized)?;
    let token = value.strip_prefix("Bearer").unwrap_or(value).trim();
    Ok((!token.is_empty()).then_some(token))
}

pub fn authorize(codec: &TokenCodec, domain: SigningDomain, headers: &HeaderMap) -> AppResult<Claims> {
    let result = bearer_token(headers).and_then(|token| {
        let token = token.ok_or(AppError::TokenNotProvided)?;
        codec.verify(token, domain).map_err(|_| AppError::Unauthorized)
    });

    result.map_err(|err| {
        if err.is_forbidden() {
            err
        } else {
            tracing::debug!(domain = domain.as_str(), error = %err, "Guard rejected token");
            AppError::Unauthorized
        }
    })
}

use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;

use crate::application::jwt::{DomainKey, TokenCodec};
use crate::application::password::PasswordHasher;
use crate::infra::error::InfraError;

pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Primary signing domain: access tokens and WebSocket handshakes.
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    pub jwt_refresh_secret: SecretString,
    pub refresh_token_ttl: Duration,
    /// Secondary guard domain, for service-to-service callers.
    pub jwt_secondary_secret: SecretString,
    pub secondary_token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);

        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid { var: "CORS_ORIGIN" })?;

        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 900);

        let jwt_refresh_secret = SecretString::new(get_env::<String>("JWT_REFRESH_SECRET").into());
        let refresh_token_ttl_days: i64 = get_env_default("REFRESH_TOKEN_TTL_DAYS", 30);

        let jwt_secondary_secret =
            SecretString::new(get_env::<String>("JWT_SECONDARY_SECRET").into());
        let secondary_token_ttl_secs: i64 = get_env_default("SECONDARY_TOKEN_TTL_SECS", 3600);

        let bcrypt_cost: u32 = get_env_default("BCRYPT_COST", 10);

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            cors_origin,
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            jwt_refresh_secret,
            refresh_token_ttl: Duration::days(refresh_token_ttl_days),
            jwt_secondary_secret,
            secondary_token_ttl: Duration::seconds(secondary_token_ttl_secs),
            bcrypt_cost,
        })
    }

    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(
            DomainKey::new(self.jwt_secret.clone(), self.access_token_ttl),
            DomainKey::new(self.jwt_refresh_secret.clone(), self.refresh_token_ttl),
            DomainKey::new(self.jwt_secondary_secret.clone(), self.secondary_token_ttl),
        )
    }

    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.bcrypt_cost)
    }
}

use authz::{Principal, Role};
use chrono::{Duration, Utc};
use entity::admin_user;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "advancia_session";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub local_auth_enabled: bool,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

pub fn issue_token(
    user_id: Uuid,
    role: Role,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        role: role.as_str().to_string(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

/// The stored role enum and the registry role carry the same wire spellings.
pub fn role_from_entity(role: admin_user::Role) -> Role {
    match role {
        admin_user::Role::Maker => Role::Maker,
        admin_user::Role::Checker => Role::Checker,
        admin_user::Role::Support => Role::Support,
        admin_user::Role::SuperAdmin => Role::SuperAdmin,
    }
}

pub fn role_to_entity(role: Role) -> admin_user::Role {
    match role {
        Role::Maker => admin_user::Role::Maker,
        Role::Checker => admin_user::Role::Checker,
        Role::Support => admin_user::Role::Support,
        Role::SuperAdmin => admin_user::Role::SuperAdmin,
    }
}

/// Build the engine's view of an admin row. The `active` flag travels with
/// the principal so deactivated accounts are denied (and audit-tagged) by the
/// engine rather than silently dropped at the transport layer.
pub fn principal_from_model(model: &admin_user::Model) -> Principal {
    Principal {
        id: model.id,
        name: model.name.clone(),
        role: role_from_entity(model.role),
        active: model.is_active,
    }
}

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Role, SessionContext};
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = std::env::var("JWT_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(24))
            .map_err(|_| AppError::configuration("JWT_EXP_HOURS must be a valid integer"))?;

        Ok(Self::new(secret.into_bytes(), exp_hours))
    }

    pub fn encode(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: user_id,
            role: role.as_str().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    /// Role token as issued; validated again on every request.
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

/// Caller authenticated by a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// `None` when the token carries a role the portal no longer recognises.
    pub role: Option<Role>,
}

impl AuthUser {
    fn from_claims(claims: Claims) -> Self {
        let role = claims.role.parse::<Role>().ok();
        if role.is_none() {
            tracing::warn!(user_id = %claims.sub, role = %claims.role, "token carries unknown role");
        }

        Self {
            user_id: claims.sub,
            role,
        }
    }

    pub fn session(&self) -> SessionContext {
        SessionContext::new(true, self.role)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::unauthorized("Authorization header missing"))?;
        let claims = state.jwt.decode(token)?;

        Ok(AuthUser::from_claims(claims))
    }
}

/// Caller that may or may not be signed in. A missing header is an anonymous
/// session; a header with a bad token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn session(&self) -> SessionContext {
        self.0
            .as_ref()
            .map(AuthUser::session)
            .unwrap_or_else(SessionContext::anonymous)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if parts.headers.get(axum::http::header::AUTHORIZATION).is_none() {
            return Ok(MaybeAuthUser(None));
        }

        let token = bearer_token(parts).ok_or_else(|| AppError::unauthorized("expected a bearer token"))?;
        let claims = state.jwt.decode(token)?;

        Ok(MaybeAuthUser(Some(AuthUser::from_claims(claims))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_role_claim() {
        let config = JwtConfig::new("unit-test-secret", 1);
        let user_id = Uuid::new_v4();

        let token = config.encode(user_id, Role::DatasetCreator).unwrap();
        let claims = config.decode(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "dataset_creator");
        let user = AuthUser::from_claims(claims);
        assert_eq!(user.session(), SessionContext::authenticated(Role::DatasetCreator));
    }

    #[test]
    fn unknown_role_claim_yields_roleless_session() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: "superadmin".to_string(),
            exp: 0,
            iat: 0,
        };

        let session = AuthUser::from_claims(claims).session();
        assert!(session.is_authenticated);
        assert_eq!(session.role, None);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issuer = JwtConfig::new("secret-a", 1);
        let verifier = JwtConfig::new("secret-b", 1);
        let token = issuer.encode(Uuid::new_v4(), Role::User).unwrap();

        assert!(matches!(verifier.decode(&token), Err(AppError::Token(_))));
    }

    #[test]
    fn anonymous_when_no_user() {
        assert_eq!(MaybeAuthUser(None).session(), SessionContext::anonymous());
    }
}

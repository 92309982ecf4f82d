use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::users,
    error::{AppError, AppResult},
    models::{ActorSnapshot, UserGroup},
    state::{AppState, AuthSettings},
};

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub group: UserGroup,
    pub active: bool,
}

impl Session {
    pub fn actor(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.group == UserGroup::Admin
    }
}

impl From<&users::Model> for Session {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            group: user.group,
            active: user.active,
        }
    }
}

/// The only access-control checkpoint of the admin surface.
pub fn ensure_admin(session: &Session) -> AppResult<()> {
    if !session.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn issue_token(settings: &AuthSettings, session: &Session) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(settings.session_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: session.id.to_string(),
        username: session.username.clone(),
        first_name: session.first_name.clone(),
        last_name: session.last_name.clone(),
        email: session.email.clone(),
        group: session.group,
        active: session.active,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(settings: &AuthSettings, token: &str) -> AppResult<Session> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "rejected session token");
        AppError::Unauthorized
    })?;

    let claims = decoded.claims;
    let id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(Session {
        id,
        username: claims.username,
        first_name: claims.first_name,
        last_name: claims.last_name,
        email: claims.email,
        group: claims.group,
        active: claims.active,
    })
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        verify_token(&state.auth, token)
    }
}

/// A session that already passed [`ensure_admin`]. Admin handlers take this
/// ahead of their body extractor, so a non-admin gets 403 whatever the payload.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        ensure_admin(&session)?;
        Ok(Self(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "test-secret".into(),
            session_ttl_hours: 1,
        }
    }

    fn session(group: UserGroup) -> Session {
        Session {
            id: Uuid::new_v4(),
            username: Some("jkowalski".into()),
            first_name: "Jan".into(),
            last_name: "Kowalski".into(),
            email: "jan@example.com".into(),
            group,
            active: true,
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let original = session(UserGroup::Admin);
        let token = issue_token(&settings(), &original).unwrap();
        let decoded = verify_token(&settings(), &token).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthorized() {
        let token = issue_token(&settings(), &session(UserGroup::User)).unwrap();
        let other = AuthSettings {
            jwt_secret: "different".into(),
            session_ttl_hours: 1,
        };
        assert!(matches!(
            verify_token(&other, &token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn only_admins_pass_the_gate() {
        assert!(ensure_admin(&session(UserGroup::Admin)).is_ok());
        assert!(matches!(
            ensure_admin(&session(UserGroup::User)),
            Err(AppError::Forbidden)
        ));
    }
}

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
    entity::users::{ActiveModel, Column, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{Session, issue_token},
    models::{HistoryMetadata, HistoryType, NewHistoryEntry, UserGroup},
    response::ApiResponse,
    services::user_service::{can_authenticate, ensure_unique_identity, touch_last_active, unique_violation},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    payload.validate()?;
    let blank = [
        &payload.username,
        &payload.password,
        &payload.first_name,
        &payload.last_name,
    ]
    .iter()
    .any(|field| field.trim().is_empty());
    if blank {
        return Err(AppError::BadRequest("Wszystkie pola są wymagane".into()));
    }

    ensure_unique_identity(
        &state.orm,
        &payload.email,
        Some(payload.username.as_str()),
        None,
    )
    .await?;

    let password_hash = hash_password(&payload.password)?;
    let user = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(Some(payload.username)),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        email: Set(payload.email),
        password_hash: Set(Some(password_hash)),
        group: Set(UserGroup::User),
        active: Set(true),
        approved: Set(false),
        approved_by: Set(None),
        approved_at: Set(None),
        last_active: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(&state.orm)
    .await
    .map_err(unique_violation)?;
    tracing::info!(user_id = %user.id, "user registered, awaiting approval");

    let metadata = HistoryMetadata::from([("email".to_string(), user.email.clone().into())]);
    audit::record(
        &state.orm,
        NewHistoryEntry::new(
            HistoryType::UserCreate,
            &user.actor(),
            format!("Zarejestrowano użytkownika {} {}", user.first_name, user.last_name),
        )
        .metadata(metadata),
    )
    .await;

    Ok(ApiResponse::success(RegisterResponse {
        message: "Rejestracja zakończona sukcesem. Twoje konto oczekuje na zatwierdzenie przez administratora.".into(),
        status: "pending_approval".into(),
    }))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    let user = Users::find()
        .filter(Column::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;
    if !verify_password(&password, hash)? {
        return Err(AppError::InvalidCredentials);
    }

    can_authenticate(&user)?;

    if let Err(err) = touch_last_active(&state.orm, user.id).await {
        tracing::warn!(error = %err, user_id = %user.id, "failed to stamp lastActive");
    }

    let session = Session::from(&user);
    let token = issue_token(&state.auth, &session)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(ApiResponse::success(LoginResponse {
        token: format!("Bearer {}", token),
        user: session,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies_only_the_original() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_internal_error() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AppError::Internal(_))
        ));
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{middleware::auth::Session, models::UserGroup};

#[derive(Deserialize, Debug, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Wszystkie pola są wymagane"))]
    pub username: String,
    #[validate(email(message = "Nieprawidłowy format adresu email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Wszystkie pola są wymagane"))]
    pub password: String,
    #[validate(length(min = 1, message = "Wszystkie pola są wymagane"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Wszystkie pola są wymagane"))]
    pub last_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub status: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: Session,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub group: UserGroup,
    pub active: bool,
    pub exp: usize,
}

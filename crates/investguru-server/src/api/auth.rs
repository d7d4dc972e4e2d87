use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::{
    auth::{hash_password, verify_password, AuthError, CurrentUser},
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const USERNAME_LEN: (usize, usize) = (3, 50);
const PASSWORD_LEN: (usize, usize) = (6, 128);

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> ApiResult<Json<UserOut>> {
    check_length("username", &body.username, USERNAME_LEN)?;
    check_length("password", &body.password, PASSWORD_LEN)?;

    let store = state.store.clone();
    let user = task::spawn_blocking(move || -> ApiResult<_> {
        let password_hash = hash_password(&body.password)?;
        Ok(store.create_user(&body.username, &password_hash)?)
    })
    .await??;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(UserOut {
        id: user.id,
        username: user.username,
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> ApiResult<Json<TokenOut>> {
    let store = state.store.clone();
    let username = task::spawn_blocking(move || -> ApiResult<String> {
        let user = store
            .find_user_by_username(&body.username)?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(&body.password, &user.password_hash)?;
        Ok(user.username)
    })
    .await??;

    let access_token = state.auth.issue_token(&username)?;
    Ok(Json(TokenOut {
        access_token,
        token_type: "bearer",
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserOut> {
    Json(UserOut {
        id: user.id,
        username: user.username,
    })
}

fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> ApiResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

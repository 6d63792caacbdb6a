use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth;
use crate::models::Account;
use crate::services::accounts::{self, AccountOverview, LoginResponse, RegisterRequest, UpdateProfileRequest};
use crate::state::AppState;

// POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    auth::caller(&state, &headers)?;
    let Json(body) = payload?;

    let new_account = accounts::prepare_registration(&body)?;
    let account = {
        let db = state.db()?;
        accounts::insert_account(&db, &new_account)?
    };

    Ok((StatusCode::CREATED, Json(account)))
}

// POST /api/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(body) = payload?;

    let session = {
        let db = state.db()?;
        accounts::login(&db, &body.email, &body.password, state.config.session_ttl_hours)?
    };

    Ok(Json(session))
}

// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = auth::bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("unauthorized".to_string()))?;

    let revoked = {
        let db = state.db()?;
        accounts::logout(&db, token)?
    };

    Ok(Json(serde_json::json!({"ok": revoked})))
}

// GET /api/account/:id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<AccountOverview>, AppError> {
    auth::caller(&state, &headers)?.require_owner_or_staff(Some(id))?;

    let overview = {
        let db = state.db()?;
        accounts::overview(&db, &state.clock, id)?
    };

    Ok(Json(overview))
}

// PUT /api/account/:id
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<Account>, AppError> {
    auth::caller(&state, &headers)?.require_owner_or_staff(Some(id))?;
    let Json(body) = payload?;

    let account = {
        let db = state.db()?;
        accounts::update_profile(&db, id, &body)?
    };

    Ok(Json(account))
}

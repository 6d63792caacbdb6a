use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::models::{Account, Role};
use crate::services::accounts;
use crate::state::AppState;

/// Who is making a request.
#[derive(Debug)]
pub enum Caller {
    /// The admin token bearer, or a session of an admin account.
    Staff,
    Customer(Account),
    Anonymous,
}

impl Caller {
    pub fn require_staff(&self) -> Result<(), AppError> {
        match self {
            Caller::Staff => Ok(()),
            Caller::Customer(_) => Err(AppError::Forbidden),
            Caller::Anonymous => Err(AppError::Unauthorized("unauthorized".to_string())),
        }
    }

    /// Staff may touch anything; a customer only what belongs to their
    /// account.
    pub fn require_owner_or_staff(&self, owner: Option<i64>) -> Result<(), AppError> {
        match self {
            Caller::Staff => Ok(()),
            Caller::Customer(account) if owner == Some(account.id) => Ok(()),
            Caller::Customer(_) => Err(AppError::Forbidden),
            Caller::Anonymous => Err(AppError::Unauthorized("unauthorized".to_string())),
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves a raw token. No token is anonymous; a token that matches neither
/// the admin token nor a live session is rejected.
pub fn caller_from_token(state: &AppState, token: Option<&str>) -> Result<Caller, AppError> {
    let Some(token) = token else {
        return Ok(Caller::Anonymous);
    };
    if token == state.config.admin_token {
        return Ok(Caller::Staff);
    }

    let account = {
        let db = state.db()?;
        accounts::resolve_session(&db, token)?
    };

    match account {
        Some(account) if account.role == Role::Admin => Ok(Caller::Staff),
        Some(account) => Ok(Caller::Customer(account)),
        None => Err(AppError::Unauthorized("invalid or expired session".to_string())),
    }
}

pub fn caller(state: &AppState, headers: &HeaderMap) -> Result<Caller, AppError> {
    caller_from_token(state, bearer_token(headers))
}

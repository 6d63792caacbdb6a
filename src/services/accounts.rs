use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use rand_core::OsRng;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{Account, BookingDetail, Role};
use crate::services::availability::ShopClock;
use crate::services::booking;

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A validated account whose password is already hashed, ready to insert.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewAccount {
    /// Hashes the password. Call it before taking the store lock.
    pub fn prepare(
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Self, AppError> {
        let password_hash = hash_password(password)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            phone: phone.to_string(),
            email: normalize_email(email),
            password_hash,
            role,
        })
    }
}

/// Validates a registration and hashes its password.
pub fn prepare_registration(req: &RegisterRequest) -> Result<NewAccount, AppError> {
    let (Some(name), Some(phone), Some(email), Some(password)) = (
        required(&req.name),
        required(&req.phone),
        required(&req.email),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("all fields are required".to_string()));
    };

    NewAccount::prepare(name, phone, email, password, Role::Client)
}

/// Creates a client account. The email must not be registered yet.
pub fn register(conn: &Connection, req: &RegisterRequest) -> Result<Account, AppError> {
    insert_account(conn, &prepare_registration(req)?)
}

pub fn create_account(
    conn: &Connection,
    name: &str,
    phone: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Account, AppError> {
    insert_account(conn, &NewAccount::prepare(name, phone, email, password, role)?)
}

pub fn insert_account(conn: &Connection, new: &NewAccount) -> Result<Account, AppError> {
    if queries::get_account_by_email(conn, &new.email)?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let id = match queries::insert_account(
        conn,
        &new.name,
        &new.email,
        &new.phone,
        &new.password_hash,
        new.role,
    ) {
        Ok(id) => id,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(account_id = id, role = new.role.as_str(), "account created");

    queries::get_account(conn, id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("account {id} vanished after insert")))
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Account>, AppError> {
    Ok(queries::get_account_by_email(conn, &normalize_email(email))?)
}

/// Checks credentials. Unknown email and wrong password are indistinguishable
/// to the caller.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<Account, AppError> {
    let invalid = || AppError::Unauthorized("invalid email or password".to_string());

    let account = queries::get_account_by_email(conn, &normalize_email(email))?.ok_or_else(invalid)?;
    if !verify_password(password, &account.password_hash) {
        return Err(invalid());
    }
    Ok(account)
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: Account,
}

pub fn login(
    conn: &Connection,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<LoginResponse, AppError> {
    let account = authenticate(conn, email, password)?;

    let now = Utc::now().naive_utc();
    queries::delete_expired_sessions(conn, &now)?;

    let token = uuid::Uuid::new_v4().to_string();
    queries::insert_session(conn, &token, account.id, &(now + Duration::hours(ttl_hours)))?;

    tracing::info!(account_id = account.id, "session opened");
    Ok(LoginResponse { token, account })
}

pub fn logout(conn: &Connection, token: &str) -> Result<bool, AppError> {
    Ok(queries::delete_session(conn, token)?)
}

pub fn resolve_session(conn: &Connection, token: &str) -> Result<Option<Account>, AppError> {
    let now = Utc::now().naive_utc();
    Ok(queries::get_session_account(conn, token, &now)?)
}

#[derive(Debug, Serialize)]
pub struct AccountOverview {
    pub account: Account,
    pub upcoming: Vec<BookingDetail>,
    pub past: Vec<BookingDetail>,
}

/// The account with its bookings split around the current moment.
pub fn overview(conn: &Connection, clock: &ShopClock, id: i64) -> Result<AccountOverview, AppError> {
    let account = queries::get_account(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("account {id}")))?;

    let now = Utc::now().naive_utc();
    let mut upcoming = vec![];
    let mut past = vec![];

    for b in queries::get_bookings_for_account(conn, id)? {
        let detail = booking::compose(conn, clock, b)?;
        if detail.date_time_utc >= now {
            upcoming.push(detail);
        } else {
            past.push(detail);
        }
    }

    Ok(AccountOverview {
        account,
        upcoming,
        past,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub fn update_profile(
    conn: &Connection,
    id: i64,
    req: &UpdateProfileRequest,
) -> Result<Account, AppError> {
    let (Some(name), Some(email), Some(phone)) =
        (required(&req.name), required(&req.email), required(&req.phone))
    else {
        return Err(AppError::Validation(
            "name, email and phone are required".to_string(),
        ));
    };
    let email = normalize_email(email);

    if queries::get_account(conn, id)?.is_none() {
        return Err(AppError::NotFound(format!("account {id}")));
    }
    if let Some(other) = queries::get_account_by_email(conn, &email)? {
        if other.id != id {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
    }

    match queries::update_account_profile(conn, id, name, &email, phone) {
        Ok(_) => {}
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    queries::get_account(conn, id)?.ok_or_else(|| AppError::NotFound(format!("account {id}")))
}

/// Creates the configured admin account on first start.
pub fn seed_admin(conn: &Connection, config: &AppConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if queries::get_account_by_email(conn, &normalize_email(email))?.is_some() {
        return Ok(());
    }

    create_account(conn, &config.admin_name, "", email, password, Role::Admin)
        .map_err(|e| anyhow::anyhow!("failed to seed admin account: {e}"))?;
    tracing::info!(email = %email, "seeded admin account");
    Ok(())
}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::auth::{self, Caller};
use crate::models::{BookingDetail, BookingEventKind};
use crate::services::availability::{self, parse_date};
use crate::services::booking::{self, AccountType, CreateBookingRequest, UpdateBookingRequest};
use crate::services::{accounts, events};
use crate::state::AppState;

// GET /api/booking
#[derive(Deserialize)]
pub struct BookingQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// With `date`, the occupied HH:MM times of that day, open to anyone.
/// Without it, the staff listing of every booking.
pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingQuery>,
) -> Result<Response, AppError> {
    let caller = auth::caller(&state, &headers)?;

    if let Some(date) = query.date.as_deref() {
        let date = parse_date(date)?;
        let times = {
            let db = state.db()?;
            availability::occupied_times(&db, &state.clock, date)?
        };
        return Ok(Json(times).into_response());
    }

    caller.require_staff()?;

    let from = query.from.as_deref().map(parse_date).transpose()?;
    let to = query.to.as_deref().map(parse_date).transpose()?;
    let bookings = {
        let db = state.db()?;
        booking::list_bookings(&db, &state.clock, from, to)?
    };
    Ok(Json(bookings).into_response())
}

// GET /api/booking/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub exclude_booking: Option<i64>,
}

pub async fn get_open_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    auth::caller(&state, &headers)?;
    let date = parse_date(&query.date)?;
    let slots = {
        let db = state.db()?;
        availability::open_slots(&db, &state.clock, date, query.exclude_booking)?
    };
    Ok(Json(slots))
}

// POST /api/booking
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingDetail>), AppError> {
    let caller = auth::caller(&state, &headers)?;
    let Json(body) = payload?;

    if body.account_type == Some(AccountType::Admin) {
        caller.require_staff()?;
    }

    let session = match &caller {
        Caller::Customer(account) => Some(account),
        _ => None,
    };
    let customer = booking::identify_customer(body.account_type, &body.client, session, |email| {
        let db = state.db()?;
        let account = accounts::find_by_email(&db, email)?;
        Ok(account)
    })?;

    let detail = {
        let mut db = state.db()?;
        booking::create_booking(&mut db, &state.clock, &body, &customer)?
    };

    events::publish(&state, BookingEventKind::Created, detail.id, &detail.date);
    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/booking/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BookingDetail>, AppError> {
    let caller = auth::caller(&state, &headers)?;

    let detail = {
        let db = state.db()?;
        booking::get_booking_detail(&db, &state.clock, id)?
    };
    caller.require_owner_or_staff(detail.account_id)?;

    Ok(Json(detail))
}

// PUT /api/booking/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateBookingRequest>, JsonRejection>,
) -> Result<Json<BookingDetail>, AppError> {
    auth::caller(&state, &headers)?.require_staff()?;
    let Json(body) = payload?;

    let detail = {
        let mut db = state.db()?;
        booking::update_booking(&mut db, &state.clock, id, &body)?
    };

    events::publish(&state, BookingEventKind::Updated, detail.id, &detail.date);
    Ok(Json(detail))
}

// DELETE /api/booking/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let caller = auth::caller(&state, &headers)?;

    let removed = {
        let mut db = state.db()?;
        let existing = booking::get_booking(&db, id)?;
        caller.require_owner_or_staff(existing.account_id)?;
        booking::delete_booking(&mut db, id)?
    };

    let date = state.clock.format_local(&removed.date_time);
    events::publish(&state, BookingEventKind::Deleted, id, &date);
    Ok(Json(serde_json::json!({"ok": true, "id": id})))
}

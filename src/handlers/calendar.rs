use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::handlers::auth;
use crate::services::booking;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

// GET /api/booking/:id/ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let caller = auth::caller(&state, &headers)?;

    let detail = {
        let db = state.db()?;
        booking::get_booking_detail(&db, &state.clock, id)?
    };
    caller.require_owner_or_staff(detail.account_id)?;

    let ics = generate_ics(&detail, &state.config.business_name);
    let filename = format!("booking-{id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}

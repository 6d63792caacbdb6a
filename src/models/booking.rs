use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A stored booking row. `date_time` is UTC.
///
/// Customer identity is either `account_id` or the free-text
/// `customer_name`/`customer_phone` pair entered by staff.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: i64,
    pub date_time: NaiveDateTime,
    pub account_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Professional whose calendar the slot was checked against.
    pub employee_id: Option<i64>,
}

impl Booking {
    /// Name and phone may only be rewritten on bookings not tied to an account.
    pub fn can_edit_client_info(&self) -> bool {
        self.account_id.is_none()
    }
}

/// One service line of a booking, joined with its service and professional.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingLine {
    #[serde(rename = "id")]
    pub service_id: i64,
    pub name: String,
    /// Price copied at booking time, in cents.
    #[serde(rename = "price")]
    pub price_cents: i64,
    #[serde(rename = "duration")]
    pub duration_minutes: i32,
    pub professional_id: Option<i64>,
    pub professional_name: Option<String>,
}

/// A booking as returned to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    pub id: i64,
    /// Shop-local start time, `YYYY-MM-DDTHH:MM:SS`.
    pub date: String,
    #[serde(skip)]
    pub date_time_utc: NaiveDateTime,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub account_id: Option<i64>,
    pub services: Vec<BookingLine>,
    /// Sum of line prices, in cents.
    pub price: i64,
}

impl BookingDetail {
    pub fn total_duration_minutes(&self) -> i64 {
        self.services.iter().map(|s| s.duration_minutes as i64).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingEventKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: i64,
    pub date: String,
}

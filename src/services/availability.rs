use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::AppError;

/// The shop's wall clock and slot grid.
///
/// Timestamps are stored and compared in UTC; everything a customer types or
/// reads (dates, HH:MM slots) is shop-local time at a fixed UTC offset.
#[derive(Debug, Clone)]
pub struct ShopClock {
    offset: FixedOffset,
    opening: NaiveTime,
    closing: NaiveTime,
    slot_minutes: u32,
}

impl ShopClock {
    pub fn new(utc_offset_minutes: i32, opening: NaiveTime, closing: NaiveTime, slot_minutes: u32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(utc_offset_minutes, "invalid shop UTC offset, falling back to UTC");
            Utc.fix()
        });

        Self {
            offset,
            opening,
            closing,
            slot_minutes: slot_minutes.max(1),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.utc_offset_minutes,
            config.opening_time,
            config.closing_time,
            config.slot_minutes,
        )
    }

    /// Converts a shop-local date and time of day to a UTC timestamp.
    pub fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
        date.and_time(time) - Duration::seconds(self.offset.local_minus_utc() as i64)
    }

    pub fn to_local(&self, utc: &NaiveDateTime) -> NaiveDateTime {
        self.offset.from_utc_datetime(utc).naive_local()
    }

    /// UTC bounds `[start, end)` of the shop-local calendar day `date`.
    pub fn day_bounds_utc(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.to_utc(date, NaiveTime::MIN);
        (start, start + Duration::days(1))
    }

    /// Local rendering used in every response, `YYYY-MM-DDTHH:MM:SS`.
    pub fn format_local(&self, utc: &NaiveDateTime) -> String {
        self.to_local(utc).format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Slot start times offered each day: opening time stepping by the slot
    /// length while strictly before closing time.
    pub fn slot_grid(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(self.slot_minutes as i64);
        let mut slots = vec![];
        let mut current = self.opening;

        while current < self.closing {
            slots.push(current);
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 || next <= current {
                break;
            }
            current = next;
        }
        slots
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {s} (expected YYYY-MM-DD)")))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("invalid time: {s} (expected HH:MM)")))
}

/// HH:MM of every booking starting on the shop-local day `date`, across all
/// professionals, in start order. Two bookings at the same time yield the
/// same value twice.
pub fn occupied_times(
    conn: &Connection,
    clock: &ShopClock,
    date: NaiveDate,
) -> Result<Vec<String>, AppError> {
    let (start, end) = clock.day_bounds_utc(date);
    let bookings = queries::get_bookings_in_range(conn, &start, &end)?;

    Ok(bookings
        .iter()
        .map(|b| clock.to_local(&b.date_time).format("%H:%M").to_string())
        .collect())
}

/// Slots of the grid on `date` that no booking occupies. A booking passed as
/// `exclude_booking` does not block its own slot, so an edit can keep it.
pub fn open_slots(
    conn: &Connection,
    clock: &ShopClock,
    date: NaiveDate,
    exclude_booking: Option<i64>,
) -> Result<Vec<String>, AppError> {
    let (start, end) = clock.day_bounds_utc(date);
    let taken: Vec<NaiveTime> = queries::get_bookings_in_range(conn, &start, &end)?
        .into_iter()
        .filter(|b| Some(b.id) != exclude_booking)
        .map(|b| clock.to_local(&b.date_time).time())
        .collect();

    Ok(clock
        .slot_grid()
        .into_iter()
        .filter(|slot| !taken.contains(slot))
        .map(|slot| slot.format("%H:%M").to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn utc_clock() -> ShopClock {
        ShopClock::new(0, t("09:00"), t("18:00"), 30)
    }

    fn book(conn: &Connection, utc: &str) -> i64 {
        let dt = NaiveDateTime::parse_from_str(utc, "%Y-%m-%d %H:%M").unwrap();
        queries::insert_booking(conn, &dt, None, Some("Cliente"), None, None).unwrap()
    }

    #[test]
    fn test_default_grid() {
        let grid = utc_clock().slot_grid();
        assert_eq!(grid.len(), 18);
        assert_eq!(grid.first(), Some(&t("09:00")));
        assert_eq!(grid.last(), Some(&t("17:30")));
    }

    #[test]
    fn test_grid_stops_at_midnight() {
        let clock = ShopClock::new(0, t("23:00"), NaiveTime::from_hms_opt(23, 59, 59).unwrap(), 30);
        assert_eq!(clock.slot_grid(), vec![t("23:00"), t("23:30")]);
    }

    #[test]
    fn test_occupied_times_keeps_duplicates() {
        let conn = setup_db();
        book(&conn, "2025-10-15 14:00");
        book(&conn, "2025-10-15 09:30");
        book(&conn, "2025-10-15 14:00");
        book(&conn, "2025-10-16 10:00");

        let times = occupied_times(&conn, &utc_clock(), d("2025-10-15")).unwrap();
        assert_eq!(times, vec!["09:30", "14:00", "14:00"]);
    }

    #[test]
    fn test_occupied_times_empty_day() {
        let conn = setup_db();
        assert!(occupied_times(&conn, &utc_clock(), d("2025-10-15")).unwrap().is_empty());
    }

    #[test]
    fn test_local_day_boundaries_follow_offset() {
        let conn = setup_db();
        let clock = ShopClock::new(-180, t("09:00"), t("18:00"), 30);

        // Local 14:00 at UTC-3 is stored as 17:00 UTC.
        let stored = clock.to_utc(d("2025-10-15"), t("14:00"));
        assert_eq!(stored, NaiveDateTime::parse_from_str("2025-10-15 17:00", "%Y-%m-%d %H:%M").unwrap());
        queries::insert_booking(&conn, &stored, None, Some("Maria"), None, None).unwrap();

        // 01:30 UTC on the 16th is still the evening of the 15th locally.
        book(&conn, "2025-10-16 01:30");

        let times = occupied_times(&conn, &clock, d("2025-10-15")).unwrap();
        assert_eq!(times, vec!["14:00", "22:30"]);
        assert!(occupied_times(&conn, &clock, d("2025-10-16")).unwrap().is_empty());
    }

    #[test]
    fn test_open_slots_excludes_taken_and_keeps_own() {
        let conn = setup_db();
        let clock = utc_clock();
        let own = book(&conn, "2025-10-15 14:00");

        let open = open_slots(&conn, &clock, d("2025-10-15"), None).unwrap();
        assert_eq!(open.len(), 17);
        assert!(!open.contains(&"14:00".to_string()));

        let open = open_slots(&conn, &clock, d("2025-10-15"), Some(own)).unwrap();
        assert_eq!(open.len(), 18);
        assert!(open.contains(&"14:00".to_string()));
    }

    #[test]
    fn test_parse_date_and_time() {
        assert!(parse_date("2025-10-15").is_ok());
        assert!(matches!(parse_date("2025-02-30"), Err(AppError::Validation(_))));
        assert!(matches!(parse_date("15/10/2025"), Err(AppError::Validation(_))));
        assert!(parse_time("14:00").is_ok());
        assert!(matches!(parse_time("25:00"), Err(AppError::Validation(_))));
        assert!(matches!(parse_time("2pm"), Err(AppError::Validation(_))));
    }
}

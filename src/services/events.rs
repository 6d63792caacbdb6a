use crate::models::{BookingEvent, BookingEventKind};
use crate::state::AppState;

/// Broadcasts a booking change to live subscribers; having none is fine.
pub fn publish(state: &AppState, kind: BookingEventKind, booking_id: i64, date: &str) {
    let event = BookingEvent {
        kind,
        booking_id,
        date: date.to_string(),
    };
    match state.events.send(event) {
        Ok(receivers) => tracing::debug!(booking_id, receivers, ?kind, "booking event published"),
        Err(_) => tracing::debug!(booking_id, ?kind, "no event subscribers"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let state = AppState::new(db::init_db(":memory:").unwrap(), AppConfig::default());
        let mut rx = state.events.subscribe();

        publish(&state, BookingEventKind::Created, 4, "2025-10-15T14:00:00");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, BookingEventKind::Created);
        assert_eq!(event.booking_id, 4);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let state = AppState::new(db::init_db(":memory:").unwrap(), AppConfig::default());
        publish(&state, BookingEventKind::Deleted, 1, "2025-10-15T14:00:00");
    }
}

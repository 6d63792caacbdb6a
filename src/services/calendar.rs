use chrono::{Duration, Utc};

use crate::models::BookingDetail;

const ICS_UTC: &str = "%Y%m%dT%H%M%SZ";

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Renders a single-event calendar file for a booking. Times are emitted in
/// UTC; the event lasts for the summed duration of its services.
pub fn generate_ics(booking: &BookingDetail, business_name: &str) -> String {
    let start = booking.date_time_utc;
    let end = start + Duration::minutes(booking.total_duration_minutes());

    let dtstart = start.format(ICS_UTC).to_string();
    let dtend = end.format(ICS_UTC).to_string();
    let dtstamp = Utc::now().naive_utc().format(ICS_UTC).to_string();
    let uid = format!("booking-{}@salonbook", booking.id);

    let names: Vec<&str> = booking.services.iter().map(|s| s.name.as_str()).collect();
    let summary = escape_text(&format!("{} - {}", names.join(", "), business_name));

    let description = booking
        .services
        .iter()
        .map(|s| match &s.professional_name {
            Some(professional) => format!("{} with {}", s.name, professional),
            None => s.name.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    let description = escape_text(&description);

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Salonbook//Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

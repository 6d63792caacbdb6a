use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{Account, Booking, BookingDetail, EmployeeStatus, Service};
use crate::services::accounts::{self, NewAccount, RegisterRequest};
use crate::services::availability::{parse_date, parse_time, ShopClock};

/// How the customer of a new booking is identified.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A registered account, looked up by email.
    Existing,
    /// Register an account as part of the booking.
    New,
    /// Staff entry: free-text name and phone, no account.
    Admin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSelection {
    pub id: i64,
    #[serde(default)]
    pub professional_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub services: Vec<ServiceSelection>,
    /// Service id to employee id.
    #[serde(default)]
    pub professionals: HashMap<i64, i64>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default)]
    pub client: ClientInfo,
    pub account_type: Option<AccountType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub services: Option<Vec<ServiceSelection>>,
    #[serde(default)]
    pub professionals: HashMap<i64, i64>,
}

/// Who a new booking is for, settled before the write transaction opens.
#[derive(Debug)]
pub enum Customer {
    Account(i64),
    /// Registered inside the booking transaction; the password is already hashed.
    Register(NewAccount),
    WalkIn { name: String, phone: Option<String> },
}

struct PlannedLine {
    service: Service,
    employee_id: Option<i64>,
}

fn slot_taken() -> AppError {
    AppError::Conflict("slot already taken".to_string())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn timestamp(
    clock: &ShopClock,
    date: Option<&str>,
    time: Option<&str>,
) -> Result<NaiveDateTime, AppError> {
    let (Some(date), Some(time)) = (date, time) else {
        return Err(AppError::Validation("date and time are required".to_string()));
    };
    Ok(clock.to_utc(parse_date(date)?, parse_time(time)?))
}

/// Resolves each selected service against the catalog, taking the price from
/// the stored Service and the professional from the selection or the
/// `professionals` map.
fn plan_lines(
    conn: &Connection,
    selections: &[ServiceSelection],
    professionals: &HashMap<i64, i64>,
    require_professional: bool,
) -> Result<Vec<PlannedLine>, AppError> {
    if selections.is_empty() {
        return Err(AppError::Validation("at least one service is required".to_string()));
    }

    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(selections.len());

    for selection in selections {
        if !seen.insert(selection.id) {
            return Err(AppError::Validation(format!(
                "service {} is listed more than once",
                selection.id
            )));
        }

        let service = queries::get_service(conn, selection.id)?
            .ok_or_else(|| AppError::NotFound(format!("service {}", selection.id)))?;

        let employee_id = selection
            .professional_id
            .or_else(|| professionals.get(&selection.id).copied());

        match employee_id {
            Some(employee_id) => {
                let employee = queries::get_employee(conn, employee_id)?
                    .ok_or_else(|| AppError::NotFound(format!("employee {employee_id}")))?;
                if employee.status == EmployeeStatus::Inactive {
                    return Err(AppError::Validation(format!(
                        "professional {} is not active",
                        employee.name
                    )));
                }
            }
            None if require_professional => {
                return Err(AppError::Validation(format!(
                    "service {} has no professional assigned",
                    service.name
                )));
            }
            None => {}
        }

        lines.push(PlannedLine {
            service,
            employee_id,
        });
    }

    Ok(lines)
}

fn insert_lines(conn: &Connection, booking_id: i64, lines: &[PlannedLine]) -> Result<(), AppError> {
    for line in lines {
        queries::insert_booking_line(
            conn,
            booking_id,
            line.service.id,
            line.employee_id,
            line.service.price_cents,
        )?;
    }
    Ok(())
}

/// Works out who a new booking is for. A logged-in customer books on their
/// session; an anonymous `existing` booking must present the account password.
///
/// Hashing and verification run here, so callers can keep them outside the
/// store lock. `lookup` fetches an account by normalized email.
pub fn identify_customer<F>(
    account_type: Option<AccountType>,
    client: &ClientInfo,
    session: Option<&Account>,
    lookup: F,
) -> Result<Customer, AppError>
where
    F: FnOnce(&str) -> Result<Option<Account>, AppError>,
{
    match account_type {
        None => Err(AppError::Validation("accountType is required".to_string())),
        Some(AccountType::Admin) => {
            let name = non_empty(&client.name)
                .ok_or_else(|| AppError::Validation("customer name is required".to_string()))?;
            Ok(Customer::WalkIn {
                name: name.to_string(),
                phone: non_empty(&client.phone).map(str::to_string),
            })
        }
        Some(AccountType::Existing) => {
            if let Some(account) = session {
                return Ok(Customer::Account(account.id));
            }

            let email = non_empty(&client.email)
                .ok_or_else(|| AppError::Validation("customer email is required".to_string()))?;
            let account = lookup(&accounts::normalize_email(email))?
                .ok_or_else(|| AppError::NotFound("account".to_string()))?;

            let password = client.password.as_deref().unwrap_or_default();
            if !accounts::verify_password(password, &account.password_hash) {
                return Err(AppError::Unauthorized("invalid email or password".to_string()));
            }
            Ok(Customer::Account(account.id))
        }
        Some(AccountType::New) => {
            let new_account = accounts::prepare_registration(&RegisterRequest {
                name: client.name.clone(),
                phone: client.phone.clone(),
                email: client.email.clone(),
                password: client.password.clone(),
            })?;
            Ok(Customer::Register(new_account))
        }
    }
}

/// Creates a booking and its service lines in one transaction.
///
/// The slot is checked against the professional of the first service only.
/// The unique (employee, timestamp) index backs the pre-check, so a
/// concurrent writer that slips past it still gets a conflict.
pub fn create_booking(
    conn: &mut Connection,
    clock: &ShopClock,
    req: &CreateBookingRequest,
    customer: &Customer,
) -> Result<BookingDetail, AppError> {
    let date_time = timestamp(clock, req.date.as_deref(), req.time.as_deref())?;

    let tx = conn.transaction()?;

    let lines = plan_lines(&tx, &req.services, &req.professionals, true)?;
    let slot_employee = lines.first().and_then(|l| l.employee_id);

    if let Some(employee_id) = slot_employee {
        if queries::find_booking_at(&tx, employee_id, &date_time)?.is_some() {
            tracing::warn!(employee_id, date_time = %date_time, "slot already taken");
            return Err(slot_taken());
        }
    }

    let (account_id, name, phone) = match customer {
        Customer::Account(id) => (Some(*id), None, None),
        Customer::Register(new_account) => {
            let account = accounts::insert_account(&tx, new_account)?;
            (Some(account.id), None, None)
        }
        Customer::WalkIn { name, phone } => (None, Some(name.as_str()), phone.as_deref()),
    };

    let booking_id =
        match queries::insert_booking(&tx, &date_time, account_id, name, phone, slot_employee) {
            Ok(id) => id,
            Err(e) if db::is_unique_violation(&e) => return Err(slot_taken()),
            Err(e) => return Err(e.into()),
        };
    insert_lines(&tx, booking_id, &lines)?;

    let detail = get_booking_detail(&tx, clock, booking_id)?;
    tx.commit()?;

    tracing::info!(booking_id, lines = lines.len(), "booking created");
    Ok(detail)
}

/// Applies a partial update. A supplied service list replaces every existing
/// line; name and phone are silently kept on bookings tied to an account.
pub fn update_booking(
    conn: &mut Connection,
    clock: &ShopClock,
    id: i64,
    req: &UpdateBookingRequest,
) -> Result<BookingDetail, AppError> {
    let tx = conn.transaction()?;

    let mut booking =
        queries::get_booking(&tx, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if booking.can_edit_client_info() {
        if req.customer_name.is_some() {
            booking.customer_name = non_empty(&req.customer_name).map(str::to_string);
        }
        if req.customer_phone.is_some() {
            booking.customer_phone = non_empty(&req.customer_phone).map(str::to_string);
        }
    } else if req.customer_name.is_some() || req.customer_phone.is_some() {
        tracing::debug!(booking_id = id, "ignoring client info on account booking");
    }

    match (req.date.as_deref(), req.time.as_deref()) {
        (None, None) => {}
        (date, time) => booking.date_time = timestamp(clock, date, time)?,
    }

    if let Some(selections) = &req.services {
        let lines = plan_lines(&tx, selections, &req.professionals, false)?;
        queries::delete_booking_lines(&tx, id)?;
        insert_lines(&tx, id, &lines)?;
        booking.employee_id = lines.first().and_then(|l| l.employee_id);
    }

    match queries::update_booking(&tx, &booking) {
        Ok(_) => {}
        Err(e) if db::is_unique_violation(&e) => return Err(slot_taken()),
        Err(e) => return Err(e.into()),
    }

    let detail = compose(&tx, clock, booking)?;
    tx.commit()?;

    tracing::info!(booking_id = id, "booking updated");
    Ok(detail)
}

/// Removes a booking and all of its lines atomically, returning the removed row.
pub fn delete_booking(conn: &mut Connection, id: i64) -> Result<Booking, AppError> {
    let tx = conn.transaction()?;

    let booking =
        queries::get_booking(&tx, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    let lines = queries::delete_booking_lines(&tx, id)?;
    queries::delete_booking(&tx, id)?;
    tx.commit()?;

    tracing::info!(booking_id = id, lines, "booking deleted");
    Ok(booking)
}

pub fn get_booking(conn: &Connection, id: i64) -> Result<Booking, AppError> {
    queries::get_booking(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn get_booking_detail(
    conn: &Connection,
    clock: &ShopClock,
    id: i64,
) -> Result<BookingDetail, AppError> {
    compose(conn, clock, get_booking(conn, id)?)
}

/// Joins a booking with its lines and customer identity.
pub fn compose(
    conn: &Connection,
    clock: &ShopClock,
    booking: Booking,
) -> Result<BookingDetail, AppError> {
    let services = queries::get_booking_lines(conn, booking.id)?;

    let (customer_name, customer_phone) = match booking.account_id {
        Some(account_id) => match queries::get_account(conn, account_id)? {
            Some(account) => (Some(account.name), Some(account.phone)),
            None => (booking.customer_name, booking.customer_phone),
        },
        None => (booking.customer_name, booking.customer_phone),
    };

    Ok(BookingDetail {
        id: booking.id,
        date: clock.format_local(&booking.date_time),
        date_time_utc: booking.date_time,
        customer_name,
        customer_phone,
        account_id: booking.account_id,
        price: services.iter().map(|s| s.price_cents).sum(),
        services,
    })
}

/// All bookings in start order, optionally limited to shop-local dates
/// `from..=to`.
pub fn list_bookings(
    conn: &Connection,
    clock: &ShopClock,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<BookingDetail>, AppError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::Validation("from must not be after to".to_string()));
        }
    }

    let mut details = vec![];
    for booking in queries::get_all_bookings(conn)? {
        let local_date = clock.to_local(&booking.date_time).date();
        if from.is_some_and(|f| local_date < f) || to.is_some_and(|t| local_date > t) {
            continue;
        }
        details.push(compose(conn, clock, booking)?);
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, ServiceCategory};
    use chrono::NaiveTime;
    use rusqlite::params;

    struct Fixture {
        conn: Connection,
        clock: ShopClock,
        cut: i64,
        nails: i64,
    }

    fn setup() -> Fixture {
        let conn = db::init_db(":memory:").unwrap();
        let cut = queries::insert_service(&conn, "Corte", ServiceCategory::Hair, 5000, 45).unwrap();
        let nails =
            queries::insert_service(&conn, "Manicure", ServiceCategory::Nails, 3000, 30).unwrap();

        for (id, name, status) in [(7, "Ana", "active"), (8, "Bia", "active"), (9, "Carla", "inactive")] {
            conn.execute(
                "INSERT INTO employees (id, name, experience, status) VALUES (?1, ?2, '5 anos', ?3)",
                params![id, name, status],
            )
            .unwrap();
        }

        let clock = ShopClock::new(
            0,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            30,
        );

        Fixture {
            conn,
            clock,
            cut,
            nails,
        }
    }

    fn walk_in(services: &[(i64, i64)], date: &str, time: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            services: services
                .iter()
                .map(|(id, _)| ServiceSelection {
                    id: *id,
                    professional_id: None,
                })
                .collect(),
            professionals: services.iter().copied().collect(),
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            client: ClientInfo {
                name: Some("Maria".to_string()),
                phone: Some("11999990000".to_string()),
                ..ClientInfo::default()
            },
            account_type: Some(AccountType::Admin),
        }
    }

    fn book(
        conn: &mut Connection,
        clock: &ShopClock,
        req: &CreateBookingRequest,
    ) -> Result<BookingDetail, AppError> {
        let customer = identify_customer(req.account_type, &req.client, None, |email| {
            Ok(queries::get_account_by_email(conn, email)?)
        })?;
        create_booking(conn, clock, req, &customer)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_create_composes_lines_and_total() {
        let mut f = setup();
        let req = walk_in(&[(f.cut, 7), (f.nails, 8)], "2025-10-15", "14:00");

        let detail = book(&mut f.conn, &f.clock, &req).unwrap();

        assert_eq!(count(&f.conn, "bookings"), 1);
        assert_eq!(count(&f.conn, "booking_services"), 2);
        assert_eq!(detail.price, 8000);
        assert_eq!(detail.date, "2025-10-15T14:00:00");
        assert_eq!(detail.customer_name.as_deref(), Some("Maria"));
        assert_eq!(detail.account_id, None);
        assert_eq!(detail.services[0].professional_name.as_deref(), Some("Ana"));
        assert_eq!(detail.services[1].professional_id, Some(8));
    }

    #[test]
    fn test_same_employee_same_time_is_rejected() {
        let mut f = setup();
        let first = walk_in(&[(f.cut, 7)], "2025-10-15", "14:00");
        book(&mut f.conn, &f.clock, &first).unwrap();

        let again = walk_in(&[(f.nails, 7)], "2025-10-15", "14:00");
        let err = book(&mut f.conn, &f.clock, &again).unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "slot already taken"));
        assert_eq!(count(&f.conn, "bookings"), 1);
        assert_eq!(count(&f.conn, "booking_services"), 1);

        let other = walk_in(&[(f.cut, 8)], "2025-10-15", "14:00");
        assert!(book(&mut f.conn, &f.clock, &other).is_ok());
        assert_eq!(count(&f.conn, "bookings"), 2);
    }

    #[test]
    fn test_only_first_professional_is_checked() {
        let mut f = setup();
        book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 8)], "2025-10-15", "14:00"))
            .unwrap();

        // Bia (8) is busy at 14:00, but only Ana (7), first in the list, is checked.
        let req = walk_in(&[(f.cut, 7), (f.nails, 8)], "2025-10-15", "14:00");
        assert!(book(&mut f.conn, &f.clock, &req).is_ok());
    }

    #[test]
    fn test_conflict_does_not_register_new_account() {
        let mut f = setup();
        book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "14:00"))
            .unwrap();

        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "14:00");
        req.account_type = Some(AccountType::New);
        req.client.email = Some("a@b.com".to_string());
        req.client.password = Some("segredo".to_string());

        assert!(matches!(
            book(&mut f.conn, &f.clock, &req),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(count(&f.conn, "accounts"), 0);
    }

    #[test]
    fn test_new_account_booking_reports_account_identity() {
        let mut f = setup();
        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "10:00");
        req.account_type = Some(AccountType::New);
        req.client.email = Some("a@b.com".to_string());
        req.client.password = Some("segredo".to_string());

        let detail = book(&mut f.conn, &f.clock, &req).unwrap();
        assert!(detail.account_id.is_some());
        assert_eq!(detail.customer_name.as_deref(), Some("Maria"));

        // The raw row keeps no denormalized name for account bookings.
        let stored = queries::get_booking(&f.conn, detail.id).unwrap().unwrap();
        assert_eq!(stored.customer_name, None);
    }

    #[test]
    fn test_existing_account_flow() {
        let mut f = setup();
        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "10:00");
        req.account_type = Some(AccountType::Existing);
        req.client.email = Some("a@b.com".to_string());
        req.client.password = Some("segredo".to_string());

        assert!(matches!(
            book(&mut f.conn, &f.clock, &req),
            Err(AppError::NotFound(_))
        ));

        accounts::create_account(&f.conn, "Maria", "119", "a@b.com", "segredo", Role::Client)
            .unwrap();
        let detail = book(&mut f.conn, &f.clock, &req).unwrap();
        assert!(detail.account_id.is_some());

        req.client.password = Some("errada".to_string());
        req.time = Some("11:00".to_string());
        assert!(matches!(
            book(&mut f.conn, &f.clock, &req),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_session_account_books_without_password() {
        let mut f = setup();
        let account =
            accounts::create_account(&f.conn, "Maria", "119", "a@b.com", "segredo", Role::Client)
                .unwrap();

        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "10:00");
        req.account_type = Some(AccountType::Existing);
        req.client = ClientInfo::default();

        let customer = identify_customer(req.account_type, &req.client, Some(&account), |_| {
            panic!("a session booking must not look up credentials")
        })
        .unwrap();
        let detail = create_booking(&mut f.conn, &f.clock, &req, &customer).unwrap();
        assert_eq!(detail.account_id, Some(account.id));

        // Without the session the same request has to prove the password.
        req.time = Some("11:00".to_string());
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_validation_errors() {
        let mut f = setup();

        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "14:00");
        req.date = None;
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));

        let req = walk_in(&[(f.cut, 7)], "2025-02-30", "14:00");
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));

        let req = walk_in(&[], "2025-10-15", "14:00");
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));

        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "14:00");
        req.professionals.clear();
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));

        let mut req = walk_in(&[(f.cut, 7)], "2025-10-15", "14:00");
        req.account_type = None;
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));

        let req = walk_in(&[(f.cut, 9)], "2025-10-15", "14:00");
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::Validation(_))));

        let req = walk_in(&[(999, 7)], "2025-10-15", "14:00");
        assert!(matches!(book(&mut f.conn, &f.clock, &req), Err(AppError::NotFound(_))));

        assert_eq!(count(&f.conn, "bookings"), 0);
    }

    #[test]
    fn test_request_price_is_ignored() {
        let mut f = setup();
        let json = format!(
            r#"{{"services":[{{"id":{},"price":1}}],"professionals":{{"{}":7}},
                "date":"2025-10-15","time":"14:00","client":{{"name":"Maria"}},"accountType":"admin"}}"#,
            f.cut, f.cut
        );
        let req: CreateBookingRequest = serde_json::from_str(&json).unwrap();

        let detail = book(&mut f.conn, &f.clock, &req).unwrap();
        assert_eq!(detail.services[0].price_cents, 5000);
    }

    #[test]
    fn test_edit_replaces_lines_with_catalog_prices() {
        let mut f = setup();
        let created =
            book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "14:00"))
                .unwrap();

        queries::update_service(&f.conn, f.nails, "Manicure", ServiceCategory::Nails, 3500, 30)
            .unwrap();

        let req = UpdateBookingRequest {
            services: Some(vec![ServiceSelection {
                id: f.nails,
                professional_id: Some(8),
            }]),
            ..UpdateBookingRequest::default()
        };
        let updated = update_booking(&mut f.conn, &f.clock, created.id, &req).unwrap();

        assert_eq!(updated.services.len(), 1);
        assert_eq!(updated.services[0].service_id, f.nails);
        assert_eq!(updated.services[0].price_cents, 3500);
        assert_eq!(updated.price, 3500);
        assert_eq!(count(&f.conn, "booking_services"), 1);

        let stored = queries::get_booking(&f.conn, created.id).unwrap().unwrap();
        assert_eq!(stored.employee_id, Some(8));
    }

    #[test]
    fn test_existing_lines_keep_their_copied_price() {
        let mut f = setup();
        let created =
            book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "14:00"))
                .unwrap();

        queries::update_service(&f.conn, f.cut, "Corte", ServiceCategory::Hair, 9900, 45).unwrap();

        let detail = get_booking_detail(&f.conn, &f.clock, created.id).unwrap();
        assert_eq!(detail.price, 5000);
    }

    #[test]
    fn test_edit_client_info_only_without_account() {
        let mut f = setup();
        let walk = book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "09:00"))
            .unwrap();

        let req = UpdateBookingRequest {
            customer_name: Some("Joana".to_string()),
            customer_phone: Some("11888880000".to_string()),
            ..UpdateBookingRequest::default()
        };
        let updated = update_booking(&mut f.conn, &f.clock, walk.id, &req).unwrap();
        assert_eq!(updated.customer_name.as_deref(), Some("Joana"));

        let mut with_account = walk_in(&[(f.cut, 7)], "2025-10-15", "10:00");
        with_account.account_type = Some(AccountType::New);
        with_account.client.email = Some("a@b.com".to_string());
        with_account.client.password = Some("segredo".to_string());
        let linked = book(&mut f.conn, &f.clock, &with_account).unwrap();

        let updated = update_booking(&mut f.conn, &f.clock, linked.id, &req).unwrap();
        assert_eq!(updated.customer_name.as_deref(), Some("Maria"));
        assert_eq!(updated.customer_phone.as_deref(), Some("11999990000"));

        let stored = queries::get_booking(&f.conn, linked.id).unwrap().unwrap();
        assert_eq!(stored.customer_name, None);
        assert_eq!(stored.customer_phone, None);
    }

    #[test]
    fn test_edit_time_requires_date_and_time() {
        let mut f = setup();
        let created =
            book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "14:00"))
                .unwrap();

        let req = UpdateBookingRequest {
            time: Some("15:00".to_string()),
            ..UpdateBookingRequest::default()
        };
        assert!(matches!(
            update_booking(&mut f.conn, &f.clock, created.id, &req),
            Err(AppError::Validation(_))
        ));

        let req = UpdateBookingRequest {
            date: Some("2025-10-16".to_string()),
            time: Some("15:00".to_string()),
            ..UpdateBookingRequest::default()
        };
        let moved = update_booking(&mut f.conn, &f.clock, created.id, &req).unwrap();
        assert_eq!(moved.date, "2025-10-16T15:00:00");
    }

    #[test]
    fn test_edit_into_occupied_slot_hits_store_constraint() {
        let mut f = setup();
        book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "14:00"))
            .unwrap();
        let second =
            book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "15:00"))
                .unwrap();

        let req = UpdateBookingRequest {
            date: Some("2025-10-15".to_string()),
            time: Some("14:00".to_string()),
            ..UpdateBookingRequest::default()
        };
        let err = update_booking(&mut f.conn, &f.clock, second.id, &req).unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "slot already taken"));

        let stored = queries::get_booking(&f.conn, second.id).unwrap().unwrap();
        assert_eq!(f.clock.format_local(&stored.date_time), "2025-10-15T15:00:00");
    }

    #[test]
    fn test_edit_with_empty_service_list_keeps_lines() {
        let mut f = setup();
        let created =
            book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], "2025-10-15", "14:00"))
                .unwrap();

        let req = UpdateBookingRequest {
            services: Some(vec![]),
            ..UpdateBookingRequest::default()
        };
        assert!(matches!(
            update_booking(&mut f.conn, &f.clock, created.id, &req),
            Err(AppError::Validation(_))
        ));
        assert_eq!(count(&f.conn, "booking_services"), 1);
    }

    #[test]
    fn test_edit_unknown_booking() {
        let mut f = setup();
        assert!(matches!(
            update_booking(&mut f.conn, &f.clock, 42, &UpdateBookingRequest::default()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_booking_and_lines() {
        let mut f = setup();
        let created = book(
            &mut f.conn,
            &f.clock,
            &walk_in(&[(f.cut, 7), (f.nails, 8)], "2025-10-15", "14:00"),
        )
        .unwrap();

        delete_booking(&mut f.conn, created.id).unwrap();

        assert_eq!(count(&f.conn, "bookings"), 0);
        assert_eq!(count(&f.conn, "booking_services"), 0);
        assert!(matches!(
            get_booking_detail(&f.conn, &f.clock, created.id),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(delete_booking(&mut f.conn, created.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_bookings_filters_by_local_date() {
        let mut f = setup();
        for (date, time) in [("2025-10-14", "10:00"), ("2025-10-15", "14:00"), ("2025-10-16", "09:00")] {
            book(&mut f.conn, &f.clock, &walk_in(&[(f.cut, 7)], date, time)).unwrap();
        }

        let all = list_bookings(&f.conn, &f.clock, None, None).unwrap();
        assert_eq!(all.len(), 3);

        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let some = list_bookings(&f.conn, &f.clock, Some(d("2025-10-15")), None).unwrap();
        assert_eq!(some.len(), 2);
        assert_eq!(some[0].date, "2025-10-15T14:00:00");

        assert!(matches!(
            list_bookings(&f.conn, &f.clock, Some(d("2025-10-16")), Some(d("2025-10-15"))),
            Err(AppError::Validation(_))
        ));
    }
}

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Account, Booking, BookingLine, Employee, EmployeeStatus, Role, Service, ServiceCategory,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid stored timestamp {s:?}: {e}"))
}

// ── Accounts ──

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, role, password_hash, created_at";

fn parse_account_row(row: &rusqlite::Row) -> anyhow::Result<Account> {
    let role: String = row.get(4)?;
    let created_at: String = row.get(6)?;

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role: Role::parse(&role),
        password_hash: row.get(5)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub fn get_account(conn: &Connection, id: i64) -> anyhow::Result<Option<Account>> {
    let result = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            params![id],
            |row| Ok(parse_account_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_account_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<Account>> {
    let result = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
            params![email],
            |row| Ok(parse_account_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn insert_account(
    conn: &Connection,
    name: &str,
    email: &str,
    phone: &str,
    password_hash: &str,
    role: Role,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, email, phone, password_hash, role) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, email, phone, password_hash, role.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_account_profile(
    conn: &Connection,
    id: i64,
    name: &str,
    email: &str,
    phone: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE accounts SET name = ?1, email = ?2, phone = ?3 WHERE id = ?4",
        params![name, email, phone, id],
    )?;
    Ok(count > 0)
}

// ── Sessions ──

pub fn insert_session(
    conn: &Connection,
    token: &str,
    account_id: i64,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, account_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token, account_id, format_timestamp(expires_at)],
    )?;
    Ok(())
}

/// Account owning `token`, if the session exists and has not expired at `now`.
pub fn get_session_account(
    conn: &Connection,
    token: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<Account>> {
    let result = conn
        .query_row(
            "SELECT a.id, a.name, a.email, a.phone, a.role, a.password_hash, a.created_at
             FROM sessions s JOIN accounts a ON a.id = s.account_id
             WHERE s.token = ?1 AND s.expires_at > ?2",
            params![token, format_timestamp(now)],
            |row| Ok(parse_account_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

pub fn delete_expired_sessions(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![format_timestamp(now)],
    )?;
    Ok(count)
}

// ── Services ──

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let category: String = row.get(2)?;
    let category = ServiceCategory::parse(&category)
        .ok_or_else(|| anyhow::anyhow!("unknown stored service category: {category}"))?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        category,
        price_cents: row.get(3)?,
        duration_minutes: row.get(4)?,
    })
}

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, price_cents, duration_minutes FROM services ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn get_service(conn: &Connection, id: i64) -> anyhow::Result<Option<Service>> {
    let result = conn
        .query_row(
            "SELECT id, name, category, price_cents, duration_minutes FROM services WHERE id = ?1",
            params![id],
            |row| Ok(parse_service_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn insert_service(
    conn: &Connection,
    name: &str,
    category: ServiceCategory,
    price_cents: i64,
    duration_minutes: i32,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO services (name, category, price_cents, duration_minutes) VALUES (?1, ?2, ?3, ?4)",
        params![name, category.as_str(), price_cents, duration_minutes],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_service(
    conn: &Connection,
    id: i64,
    name: &str,
    category: ServiceCategory,
    price_cents: i64,
    duration_minutes: i32,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, category = ?2, price_cents = ?3, duration_minutes = ?4 WHERE id = ?5",
        params![name, category.as_str(), price_cents, duration_minutes, id],
    )?;
    Ok(count > 0)
}

pub fn delete_service(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Employees ──

fn parse_employee_row(row: &rusqlite::Row) -> anyhow::Result<Employee> {
    let status: String = row.get(3)?;
    let status = EmployeeStatus::parse(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown stored employee status: {status}"))?;

    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        experience: row.get(2)?,
        status,
        specialties: vec![],
    })
}

fn employee_specialties(conn: &Connection) -> anyhow::Result<HashMap<i64, Vec<i64>>> {
    let mut stmt = conn.prepare(
        "SELECT employee_id, service_id FROM employee_services ORDER BY employee_id, service_id",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;

    let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        let (employee_id, service_id) = row?;
        map.entry(employee_id).or_default().push(service_id);
    }
    Ok(map)
}

pub fn list_employees(conn: &Connection) -> anyhow::Result<Vec<Employee>> {
    let mut specialties = employee_specialties(conn)?;

    let mut stmt = conn
        .prepare("SELECT id, name, experience, status FROM employees ORDER BY name ASC, id ASC")?;
    let rows = stmt.query_map([], |row| Ok(parse_employee_row(row)))?;

    let mut employees = vec![];
    for row in rows {
        let mut employee = row??;
        employee.specialties = specialties.remove(&employee.id).unwrap_or_default();
        employees.push(employee);
    }
    Ok(employees)
}

pub fn get_employee(conn: &Connection, id: i64) -> anyhow::Result<Option<Employee>> {
    let result = conn
        .query_row(
            "SELECT id, name, experience, status FROM employees WHERE id = ?1",
            params![id],
            |row| Ok(parse_employee_row(row)),
        )
        .optional()?;

    let Some(mut employee) = result.transpose()? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT service_id FROM employee_services WHERE employee_id = ?1 ORDER BY service_id",
    )?;
    let rows = stmt.query_map(params![id], |row| row.get::<_, i64>(0))?;
    for row in rows {
        employee.specialties.push(row?);
    }

    Ok(Some(employee))
}

pub fn insert_employee(
    conn: &Connection,
    name: &str,
    experience: &str,
    status: EmployeeStatus,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO employees (name, experience, status) VALUES (?1, ?2, ?3)",
        params![name, experience, status.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_employee(
    conn: &Connection,
    id: i64,
    name: &str,
    experience: &str,
    status: EmployeeStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE employees SET name = ?1, experience = ?2, status = ?3 WHERE id = ?4",
        params![name, experience, status.as_str(), id],
    )?;
    Ok(count > 0)
}

/// Replaces the full set of services an employee is qualified for.
pub fn set_employee_services(
    conn: &Connection,
    employee_id: i64,
    service_ids: &[i64],
) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM employee_services WHERE employee_id = ?1",
        params![employee_id],
    )?;
    for service_id in service_ids {
        conn.execute(
            "INSERT OR IGNORE INTO employee_services (employee_id, service_id) VALUES (?1, ?2)",
            params![employee_id, service_id],
        )?;
    }
    Ok(())
}

pub fn delete_employee(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM employees WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str =
    "id, date_time, account_id, customer_name, customer_phone, employee_id";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_time: String = row.get(1)?;

    Ok(Booking {
        id: row.get(0)?,
        date_time: parse_timestamp(&date_time)?,
        account_id: row.get(2)?,
        customer_name: row.get(3)?,
        customer_phone: row.get(4)?,
        employee_id: row.get(5)?,
    })
}

fn collect_bookings(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Id of a booking already holding the (employee, timestamp) slot.
pub fn find_booking_at(
    conn: &Connection,
    employee_id: i64,
    date_time: &NaiveDateTime,
) -> anyhow::Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM bookings WHERE employee_id = ?1 AND date_time = ?2 LIMIT 1",
            params![employee_id, format_timestamp(date_time)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn insert_booking(
    conn: &Connection,
    date_time: &NaiveDateTime,
    account_id: Option<i64>,
    customer_name: Option<&str>,
    customer_phone: Option<&str>,
    employee_id: Option<i64>,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO bookings (date_time, account_id, customer_name, customer_phone, employee_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            format_timestamp(date_time),
            account_id,
            customer_name,
            customer_phone,
            employee_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_booking_line(
    conn: &Connection,
    booking_id: i64,
    service_id: i64,
    employee_id: Option<i64>,
    price_cents: i64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO booking_services (booking_id, service_id, employee_id, price_cents)
         VALUES (?1, ?2, ?3, ?4)",
        params![booking_id, service_id, employee_id, price_cents],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_booking(conn: &Connection, id: i64) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET date_time = ?1, customer_name = ?2, customer_phone = ?3,
                employee_id = ?4, updated_at = datetime('now')
         WHERE id = ?5",
        params![
            format_timestamp(&booking.date_time),
            booking.customer_name,
            booking.customer_phone,
            booking.employee_id,
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_booking_lines(conn: &Connection, booking_id: i64) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM booking_services WHERE booking_id = ?1",
        params![booking_id],
    )?;
    Ok(count)
}

pub fn delete_booking(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Bookings starting in `[start, end)`, ordered by start time.
pub fn get_bookings_in_range(
    conn: &Connection,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    collect_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE date_time >= ?1 AND date_time < ?2 ORDER BY date_time ASC, id ASC"
        ),
        params![format_timestamp(start), format_timestamp(end)],
    )
}

pub fn get_all_bookings(conn: &Connection) -> anyhow::Result<Vec<Booking>> {
    collect_bookings(
        conn,
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY date_time ASC, id ASC"),
        params![],
    )
}

pub fn get_bookings_for_account(conn: &Connection, account_id: i64) -> anyhow::Result<Vec<Booking>> {
    collect_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE account_id = ?1 ORDER BY date_time ASC, id ASC"
        ),
        params![account_id],
    )
}

pub fn get_booking_lines(conn: &Connection, booking_id: i64) -> anyhow::Result<Vec<BookingLine>> {
    let mut stmt = conn.prepare(
        "SELECT bs.service_id, s.name, bs.price_cents, s.duration_minutes, bs.employee_id, e.name
         FROM booking_services bs
         JOIN services s ON s.id = bs.service_id
         LEFT JOIN employees e ON e.id = bs.employee_id
         WHERE bs.booking_id = ?1
         ORDER BY bs.id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        Ok(BookingLine {
            service_id: row.get(0)?,
            name: row.get(1)?,
            price_cents: row.get(2)?,
            duration_minutes: row.get(3)?,
            professional_id: row.get(4)?,
            professional_name: row.get(5)?,
        })
    })?;

    let mut lines = vec![];
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

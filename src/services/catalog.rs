use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{Employee, EmployeeStatus, Service, ServiceCategory};

#[derive(Debug, Default, Deserialize)]
pub struct ServiceInput {
    pub name: Option<String>,
    pub category: Option<String>,
    /// Cents.
    pub price: Option<i64>,
    pub duration: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeInput {
    pub name: Option<String>,
    pub experience: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub specialties: Vec<i64>,
}

struct ValidService<'a> {
    name: &'a str,
    category: ServiceCategory,
    price_cents: i64,
    duration_minutes: i32,
}

fn validate_service(input: &ServiceInput) -> Result<ValidService<'_>, AppError> {
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("service name is required".to_string()))?;

    let category = input.category.as_deref().unwrap_or_default();
    let category = ServiceCategory::parse(category)
        .ok_or_else(|| AppError::Validation(format!("unknown category: {category}")))?;

    let price_cents = input
        .price
        .ok_or_else(|| AppError::Validation("price is required".to_string()))?;
    if price_cents < 0 {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }

    let duration_minutes = input
        .duration
        .ok_or_else(|| AppError::Validation("duration is required".to_string()))?;
    if duration_minutes <= 0 {
        return Err(AppError::Validation("duration must be positive".to_string()));
    }

    Ok(ValidService {
        name,
        category,
        price_cents,
        duration_minutes,
    })
}

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, AppError> {
    Ok(queries::list_services(conn)?)
}

pub fn create_service(conn: &Connection, input: &ServiceInput) -> Result<Service, AppError> {
    let valid = validate_service(input)?;
    let id = queries::insert_service(
        conn,
        valid.name,
        valid.category,
        valid.price_cents,
        valid.duration_minutes,
    )?;
    tracing::info!(service_id = id, name = valid.name, "service created");

    queries::get_service(conn, id)?.ok_or_else(|| AppError::NotFound(format!("service {id}")))
}

/// Catalog edits never touch prices already copied onto booking lines.
pub fn update_service(conn: &Connection, id: i64, input: &ServiceInput) -> Result<Service, AppError> {
    let valid = validate_service(input)?;
    let updated = queries::update_service(
        conn,
        id,
        valid.name,
        valid.category,
        valid.price_cents,
        valid.duration_minutes,
    )?;
    if !updated {
        return Err(AppError::NotFound(format!("service {id}")));
    }

    queries::get_service(conn, id)?.ok_or_else(|| AppError::NotFound(format!("service {id}")))
}

pub fn delete_service(conn: &Connection, id: i64) -> Result<(), AppError> {
    match queries::delete_service(conn, id) {
        Ok(true) => {
            tracing::info!(service_id = id, "service deleted");
            Ok(())
        }
        Ok(false) => Err(AppError::NotFound(format!("service {id}"))),
        Err(e) if db::is_foreign_key_violation(&e) => Err(AppError::Conflict(
            "service is referenced by existing bookings".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

fn validate_employee<'a>(
    conn: &Connection,
    input: &'a EmployeeInput,
) -> Result<(&'a str, &'a str, EmployeeStatus), AppError> {
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("employee name is required".to_string()))?;
    let experience = input
        .experience
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("experience is required".to_string()))?;

    let status = match input.status.as_deref() {
        None => EmployeeStatus::Active,
        Some(s) => EmployeeStatus::parse(s)
            .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
    };

    if input.specialties.is_empty() {
        return Err(AppError::Validation(
            "at least one specialty is required".to_string(),
        ));
    }
    for service_id in &input.specialties {
        if queries::get_service(conn, *service_id)?.is_none() {
            return Err(AppError::NotFound(format!("service {service_id}")));
        }
    }

    Ok((name, experience, status))
}

pub fn list_employees(conn: &Connection) -> Result<Vec<Employee>, AppError> {
    Ok(queries::list_employees(conn)?)
}

pub fn create_employee(conn: &mut Connection, input: &EmployeeInput) -> Result<Employee, AppError> {
    let tx = conn.transaction()?;
    let (name, experience, status) = validate_employee(&tx, input)?;

    let id = queries::insert_employee(&tx, name, experience, status)?;
    queries::set_employee_services(&tx, id, &input.specialties)?;
    let employee = queries::get_employee(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("employee {id}")))?;
    tx.commit()?;

    tracing::info!(employee_id = id, name, "employee created");
    Ok(employee)
}

pub fn update_employee(
    conn: &mut Connection,
    id: i64,
    input: &EmployeeInput,
) -> Result<Employee, AppError> {
    let tx = conn.transaction()?;
    let (name, experience, status) = validate_employee(&tx, input)?;

    if !queries::update_employee(&tx, id, name, experience, status)? {
        return Err(AppError::NotFound(format!("employee {id}")));
    }
    queries::set_employee_services(&tx, id, &input.specialties)?;
    let employee = queries::get_employee(&tx, id)?
        .ok_or_else(|| AppError::NotFound(format!("employee {id}")))?;
    tx.commit()?;

    Ok(employee)
}

/// Bookings keep their lines; the professional reference is cleared.
pub fn delete_employee(conn: &Connection, id: i64) -> Result<(), AppError> {
    if !queries::delete_employee(conn, id)? {
        return Err(AppError::NotFound(format!("employee {id}")));
    }
    tracing::info!(employee_id = id, "employee deleted");
    Ok(())
}

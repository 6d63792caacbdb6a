use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::errors::AppError;
use crate::handlers::auth;
use crate::models::{Employee, Service};
use crate::services::catalog::{self, EmployeeInput, ServiceInput};
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    auth::caller(&state, &headers)?;
    let services = {
        let db = state.db()?;
        catalog::list_services(&db)?
    };
    Ok(Json(services))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ServiceInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    auth::caller(&state, &headers)?.require_staff()?;
    let Json(body) = payload?;

    let service = {
        let db = state.db()?;
        catalog::create_service(&db, &body)?
    };
    Ok((StatusCode::CREATED, Json(service)))
}

// PUT /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<Json<ServiceInput>, JsonRejection>,
) -> Result<Json<Service>, AppError> {
    auth::caller(&state, &headers)?.require_staff()?;
    let Json(body) = payload?;

    let service = {
        let db = state.db()?;
        catalog::update_service(&db, id, &body)?
    };
    Ok(Json(service))
}

// DELETE /api/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::caller(&state, &headers)?.require_staff()?;

    {
        let db = state.db()?;
        catalog::delete_service(&db, id)?;
    }
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/employees
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Employee>>, AppError> {
    auth::caller(&state, &headers)?;
    let employees = {
        let db = state.db()?;
        catalog::list_employees(&db)?
    };
    Ok(Json(employees))
}

// POST /api/employees
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<EmployeeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    auth::caller(&state, &headers)?.require_staff()?;
    let Json(body) = payload?;

    let employee = {
        let mut db = state.db()?;
        catalog::create_employee(&mut db, &body)?
    };
    Ok((StatusCode::CREATED, Json(employee)))
}

// PUT /api/employees/:id
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    payload: Result<Json<EmployeeInput>, JsonRejection>,
) -> Result<Json<Employee>, AppError> {
    auth::caller(&state, &headers)?.require_staff()?;
    let Json(body) = payload?;

    let employee = {
        let mut db = state.db()?;
        catalog::update_employee(&mut db, id, &body)?
    };
    Ok(Json(employee))
}

// DELETE /api/employees/:id
pub async fn delete_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::caller(&state, &headers)?.require_staff()?;

    {
        let db = state.db()?;
        catalog::delete_employee(&db, id)?;
    }
    Ok(Json(serde_json::json!({"ok": true})))
}

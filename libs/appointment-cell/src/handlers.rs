// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    AppointmentError, AvailableSlotsQuery, CancellationRequest, CreateAppointmentRequest,
    PageQuery, ReportWindow, StatusUpdateRequest, UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleManager;
use crate::services::reporting::AppointmentReportingService;

fn authorize(user: &User, allowed: &[Role]) -> Result<(), AppointmentError> {
    require_role(user, allowed).map_err(|e| match e {
        AppError::Forbidden(msg) | AppError::Auth(msg) => AppointmentError::Forbidden(msg),
    })
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppointmentError> {
    authorize(&user, &[Role::Admin])?;

    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let appointment = manager.create_appointment(request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

/// Patient booking or reschedule request, confirmed later by an admin.
#[axum::debug_handler]
pub async fn request_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppointmentError> {
    if user.role() == Some(Role::Patient) && request.patient_id.to_string() != user.id {
        return Err(AppointmentError::Forbidden(
            "Not authorized to request appointments for this patient".to_string(),
        ));
    }

    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let appointment = manager.request_appointment(request).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<AvailableSlotsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppointmentError> {
    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let slots = manager.available_slots(query.doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctorId": query.doctor_id,
        "date": query.date.format("%Y-%m-%d").to_string(),
        "availableSlots": slots
    })))
}

// ==============================================================================
// APPOINTMENT MANAGEMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Admin])?;

    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let appointments = manager.list_appointments().await?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppointmentError> {
    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let appointment = manager.get_appointment(appointment_id).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Admin])?;

    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let appointment = manager.update_appointment(appointment_id, request).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Doctor, Role::Admin])?;

    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let appointment = manager.update_status(appointment_id, request.status).await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn request_cancellation(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancellationRequest>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Patient, Role::Admin])?;

    // Patients may only cancel their own appointments
    let patient_scope = if user.is_admin() {
        None
    } else {
        Some(Uuid::parse_str(&user.id).map_err(|_| {
            AppointmentError::Forbidden("Patient identity is not a valid id".to_string())
        })?)
    };

    let manager = AppointmentLifecycleManager::for_request(&state, auth.token());
    let outcome = manager.request_cancellation(request, patient_scope).await?;

    Ok(Json(json!(outcome)))
}

// ==============================================================================
// REPORTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_completed_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PageQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Admin])?;

    let reporting = AppointmentReportingService::for_request(&state, auth.token());
    Ok(Json(json!(reporting.completed_page(query).await?)))
}

#[axum::debug_handler]
pub async fn get_requested_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PageQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Admin])?;

    let reporting = AppointmentReportingService::for_request(&state, auth.token());
    Ok(Json(json!(reporting.pending_page(query).await?)))
}

#[axum::debug_handler]
pub async fn get_completed_count(
    State(state): State<Arc<AppConfig>>,
    Path(window): Path<ReportWindow>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    authorize(&user, &[Role::Admin])?;

    let reporting = AppointmentReportingService::for_request(&state, auth.token());
    let count = reporting.count_completed(window).await?;

    Ok(Json(json!({ "window": window, "completedCount": count })))
}

async fn legacy_count(
    state: &AppConfig,
    token: &str,
    user: &User,
    window: ReportWindow,
) -> Result<Json<Value>, AppointmentError> {
    authorize(user, &[Role::Admin])?;

    let reporting = AppointmentReportingService::for_request(state, token);
    let count = reporting.count_completed(window).await?;

    Ok(Json(json!({ (window.legacy_key()): count })))
}

#[axum::debug_handler]
pub async fn get_daily_registrations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    legacy_count(&state, auth.token(), &user, ReportWindow::Daily).await
}

#[axum::debug_handler]
pub async fn get_weekly_registrations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    legacy_count(&state, auth.token(), &user, ReportWindow::Weekly).await
}

#[axum::debug_handler]
pub async fn get_monthly_registrations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppointmentError> {
    legacy_count(&state, auth.token(), &user, ReportWindow::Monthly).await
}

// libs/appointment-cell/src/models.rs
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "calendar_date")]
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_sent: bool,
    pub date_created: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Whether this appointment still holds its slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[serde(alias = "requested")]
    Requested,
    #[serde(alias = "scheduled")]
    Scheduled,
    #[serde(alias = "rescheduled")]
    Rescheduled,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "cancelled", alias = "canceled")]
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses listed by the pending-requests report.
    pub const PENDING: [AppointmentStatus; 2] =
        [AppointmentStatus::Requested, AppointmentStatus::Rescheduled];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "Requested",
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Rescheduled => "Rescheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Only confirmed appointments can be cancelled by request.
    pub fn can_request_cancellation(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Rescheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields written when a new appointment row is inserted.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "calendar_date")]
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
}

/// Partial update; `None` fields are left untouched in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none", with = "calendar_date::option")]
    pub appointment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_requested_at: Option<DateTime<Utc>>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn status(status: AppointmentStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    /// Applies the change set to an in-memory record.
    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(time) = &self.appointment_time {
            appointment.appointment_time = time.clone();
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(flag) = self.reminder_sent {
            appointment.reminder_sent = flag;
        }
        if let Some(reason) = &self.cancellation_reason {
            appointment.cancellation_reason = Some(reason.clone());
        }
        if let Some(at) = self.cancellation_requested_at {
            appointment.cancellation_requested_at = Some(at);
        }
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "calendar_date")]
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, with = "calendar_date::option")]
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub reminder_sent: Option<bool>,
}

impl UpdateAppointmentRequest {
    pub fn touches_slot(&self) -> bool {
        self.appointment_date.is_some() || self.appointment_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub appointment_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub appointment: Appointment,
    pub refund_processed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub doctor_id: Uuid,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_number")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<u32>,
}

/// Values that are not a non-negative integer are treated as absent.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Some(value),
        Raw::Text(raw) => raw.trim().parse().ok(),
        Raw::Other(_) => None,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPage {
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub appointments: Vec<Appointment>,
}

/// Rolling windows for the completed-appointment counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportWindow {
    Daily,
    Weekly,
    Monthly,
}

impl ReportWindow {
    pub fn duration(&self) -> chrono::Duration {
        match self {
            ReportWindow::Daily => chrono::Duration::hours(24),
            ReportWindow::Weekly => chrono::Duration::days(7),
            ReportWindow::Monthly => chrono::Duration::days(30),
        }
    }

    /// Response key used by the legacy `*-registrations` endpoints.
    pub fn legacy_key(&self) -> &'static str {
        match self {
            ReportWindow::Daily => "dailyCount",
            ReportWindow::Weekly => "weeklyCount",
            ReportWindow::Monthly => "monthlyCount",
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor is not available for appointments")]
    DoctorUnavailable,

    #[error("{message}")]
    SlotConflict {
        message: String,
        available_slots: Vec<String>,
        suggested_date: NaiveDate,
    },

    #[error("Appointment cannot be changed from status {0}")]
    InvalidStateTransition(AppointmentStatus),

    #[error("Invalid shift: {0}")]
    InvalidShift(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn slot_conflict(available_slots: Vec<String>, date: NaiveDate) -> Self {
        AppointmentError::SlotConflict {
            message: "Selected time slot is not available.".to_string(),
            available_slots,
            suggested_date: date,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => StatusCode::NOT_FOUND,
            AppointmentError::DoctorUnavailable
            | AppointmentError::SlotConflict { .. }
            | AppointmentError::InvalidStateTransition(_)
            | AppointmentError::InvalidShift(_) => StatusCode::BAD_REQUEST,
            AppointmentError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppointmentError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppointmentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!("Error: {}: {}", status, self);

        let body = match self {
            AppointmentError::SlotConflict { message, available_slots, suggested_date } => json!({
                "message": message,
                "availableSlots": available_slots,
                "suggestedDate": suggested_date.format("%Y-%m-%d").to_string(),
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

// ==============================================================================
// CALENDAR DATE (DE)SERIALIZATION
// ==============================================================================

/// Appointment dates are calendar days. Input may be `2024-06-01` or a full
/// timestamp, in which case the date part in the timestamp's own offset is kept.
pub mod calendar_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|dt| dt.date())
            })
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid calendar date: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid calendar date: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

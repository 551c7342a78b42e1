// libs/appointment-cell/src/services/collaborators.rs
//! Capabilities the scheduling core consumes. Production wiring lives in
//! `services::supabase`; tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use billing_cell::{BillingError, Invoice, Refund};
use doctor_cell::{Doctor, Shift};

use crate::models::{Appointment, AppointmentChanges, AppointmentError, AppointmentStatus, NewAppointment};

/// What scheduling needs to know about a doctor.
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub shift: Shift,
    pub available: bool,
}

impl From<Doctor> for DoctorProfile {
    fn from(doctor: Doctor) -> Self {
        Self {
            id: doctor.id,
            shift: doctor.shift,
            available: doctor.is_bookable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Another non-cancelled appointment already holds (doctor, date, time).
    #[error("Slot already booked")]
    SlotTaken,

    #[error("Appointment not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Backend(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppointmentError::NotFound,
            StoreError::SlotTaken => AppointmentError::DatabaseError(err.to_string()),
            StoreError::Backend(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, AppointmentError>;
}

#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Applies a partial update and returns the stored row.
    async fn update(&self, id: Uuid, changes: AppointmentChanges) -> Result<Appointment, StoreError>;

    /// Non-cancelled appointments of `doctor_id` on `date`.
    async fn find_active_on(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, StoreError>;

    /// Every appointment, newest first.
    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError>;

    async fn count_with_status_since(
        &self,
        statuses: &[AppointmentStatus],
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// One page of appointments in the given statuses plus the total match count.
    async fn page_with_status(
        &self,
        statuses: &[AppointmentStatus],
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<Appointment>, u64), StoreError>;
}

#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn find_invoice_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, BillingError>;

    async fn refund(&self, payment_intent_id: &str) -> Result<Refund, BillingError>;

    async fn mark_refunded(
        &self,
        invoice_id: Uuid,
        refund_id: &str,
        refunded_at: DateTime<Utc>,
    ) -> Result<Invoice, BillingError>;
}

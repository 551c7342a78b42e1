// libs/appointment-cell/src/services/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use billing_cell::{BillingError, Invoice, InvoiceService, Refund, StripeRefundClient};
use doctor_cell::{DoctorError, DoctorService};
use patient_cell::PatientService;
use shared_config::AppConfig;
use shared_database::supabase::{is_conflict, SupabaseClient};

use crate::models::{Appointment, AppointmentChanges, AppointmentError, AppointmentStatus, NewAppointment};
use crate::services::collaborators::{
    AppointmentStore, BillingGateway, DoctorDirectory, DoctorProfile, PatientDirectory, StoreError,
};

/// Supabase-backed collaborators for one request, all sharing the caller's token.
pub struct SupabaseCollaborators {
    pub doctors: Arc<dyn DoctorDirectory>,
    pub patients: Arc<dyn PatientDirectory>,
    pub store: Arc<dyn AppointmentStore>,
    pub billing: Arc<dyn BillingGateway>,
}

impl SupabaseCollaborators {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let auth_token = auth_token.to_string();

        Self {
            doctors: Arc::new(SupabaseDoctorDirectory {
                service: DoctorService::with_client(Arc::clone(&supabase)),
                auth_token: auth_token.clone(),
            }),
            patients: Arc::new(SupabasePatientDirectory {
                service: PatientService::with_client(Arc::clone(&supabase)),
                auth_token: auth_token.clone(),
            }),
            billing: Arc::new(SupabaseBillingGateway {
                invoices: InvoiceService::with_client(Arc::clone(&supabase)),
                stripe: StripeRefundClient::new(config),
                auth_token: auth_token.clone(),
            }),
            store: Arc::new(SupabaseAppointmentStore::new(supabase, auth_token)),
        }
    }
}

// ==============================================================================
// DIRECTORIES
// ==============================================================================

pub struct SupabaseDoctorDirectory {
    service: DoctorService,
    auth_token: String,
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, AppointmentError> {
        let doctor = self.service
            .find_doctor(doctor_id, &self.auth_token)
            .await
            .map_err(|e| match e.downcast_ref::<DoctorError>() {
                Some(DoctorError::InvalidShift(raw)) => AppointmentError::InvalidShift(raw.clone()),
                _ => AppointmentError::DatabaseError(e.to_string()),
            })?;

        Ok(doctor.map(DoctorProfile::from))
    }
}

pub struct SupabasePatientDirectory {
    service: PatientService,
    auth_token: String,
}

#[async_trait]
impl PatientDirectory for SupabasePatientDirectory {
    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        self.service
            .patient_exists(patient_id, &self.auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }
}

// ==============================================================================
// APPOINTMENT STORE
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: String) -> Self {
        Self { supabase, auth_token }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, StoreError> {
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, path, Some(&self.auth_token), None)
            .await
            .map_err(store_error)?;

        parse_rows(rows)
    }

    async fn write(&self, method: Method, path: &str, body: Value) -> Result<Vec<Appointment>, StoreError> {
        let rows: Vec<Value> = self.supabase
            .request_with_headers(
                method,
                path,
                Some(&self.auth_token),
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(store_error)?;

        parse_rows(rows)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        debug!("Inserting appointment for doctor {} at {} {}",
               appointment.doctor_id, appointment.appointment_date, appointment.appointment_time);

        let body = serde_json::to_value(&appointment)
            .map_err(|e| StoreError::Backend(format!("Failed to encode appointment: {}", e)))?;

        self.write(Method::POST, "/rest/v1/appointments", body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no row".to_string()))
    }

    async fn update(&self, id: Uuid, changes: AppointmentChanges) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(&changes)
            .map_err(|e| StoreError::Backend(format!("Failed to encode changes: {}", e)))?;

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        self.write(Method::PATCH, &path, body)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn find_active_on(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=neq.{}",
            doctor_id,
            date.format("%Y-%m-%d"),
            AppointmentStatus::Cancelled,
        );
        self.fetch(&path).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        self.fetch("/rest/v1/appointments?order=date_created.desc").await
    }

    async fn count_with_status_since(
        &self,
        statuses: &[AppointmentStatus],
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let path = format!(
            "/rest/v1/appointments?select=id&status={}&date_created=gte.{}",
            status_filter(statuses),
            urlencoding::encode(&since),
        );

        self.supabase
            .count(&path, Some(&self.auth_token))
            .await
            .map_err(store_error)
    }

    async fn page_with_status(
        &self,
        statuses: &[AppointmentStatus],
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<Appointment>, u64), StoreError> {
        let filter = status_filter(statuses);

        let page_path = format!(
            "/rest/v1/appointments?status={}&order=date_created.asc,id.asc&offset={}&limit={}",
            filter, offset, limit,
        );
        let items = self.fetch(&page_path).await?;

        let count_path = format!("/rest/v1/appointments?select=id&status={}", filter);
        let total = self.supabase
            .count(&count_path, Some(&self.auth_token))
            .await
            .map_err(store_error)?;

        Ok((items, total))
    }
}

/// PostgREST `in.(...)` filter for a status set.
fn status_filter(statuses: &[AppointmentStatus]) -> String {
    let names = statuses.iter().map(AppointmentStatus::as_str).collect::<Vec<_>>().join(",");
    format!("in.({})", names)
}

fn store_error(err: anyhow::Error) -> StoreError {
    if is_conflict(&err) {
        warn!("Unique slot constraint rejected write: {}", err);
        StoreError::SlotTaken
    } else {
        StoreError::Backend(err.to_string())
    }
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, StoreError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| StoreError::Backend(format!("Failed to parse appointment: {}", e)))
}

// ==============================================================================
// BILLING
// ==============================================================================

pub struct SupabaseBillingGateway {
    invoices: InvoiceService,
    stripe: StripeRefundClient,
    auth_token: String,
}

#[async_trait]
impl BillingGateway for SupabaseBillingGateway {
    async fn find_invoice_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, BillingError> {
        self.invoices.find_by_appointment(appointment_id, &self.auth_token).await
    }

    async fn refund(&self, payment_intent_id: &str) -> Result<Refund, BillingError> {
        self.stripe.refund_payment_intent(payment_intent_id).await
    }

    async fn mark_refunded(
        &self,
        invoice_id: Uuid,
        refund_id: &str,
        refunded_at: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        self.invoices
            .mark_refunded(invoice_id, refund_id, refunded_at, &self.auth_token)
            .await
    }
}

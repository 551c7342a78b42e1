// In-memory collaborators for exercising the scheduling core without HTTP.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentStatus, NewAppointment,
};
use appointment_cell::services::collaborators::{
    AppointmentStore, BillingGateway, DoctorDirectory, DoctorProfile, PatientDirectory, StoreError,
};
use appointment_cell::services::{AppointmentLifecycleManager, AppointmentReportingService};
use billing_cell::{BillingError, Invoice, PaymentStatus, Refund};
use doctor_cell::Shift;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn slots(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

// ==============================================================================
// DIRECTORIES
// ==============================================================================

#[derive(Default)]
pub struct FakeDoctors {
    doctors: Mutex<HashMap<Uuid, DoctorProfile>>,
}

impl FakeDoctors {
    pub fn add(&self, shift: Shift, available: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.doctors
            .lock()
            .unwrap()
            .insert(id, DoctorProfile { id, shift, available });
        id
    }

    pub fn set_available(&self, id: Uuid, available: bool) {
        if let Some(doctor) = self.doctors.lock().unwrap().get_mut(&id) {
            doctor.available = available;
        }
    }
}

#[async_trait]
impl DoctorDirectory for FakeDoctors {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, AppointmentError> {
        Ok(self.doctors.lock().unwrap().get(&doctor_id).cloned())
    }
}

#[derive(Default)]
pub struct FakePatients {
    patients: Mutex<HashSet<Uuid>>,
}

impl FakePatients {
    pub fn add(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.patients.lock().unwrap().insert(id);
        id
    }
}

#[async_trait]
impl PatientDirectory for FakePatients {
    async fn patient_exists(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.patients.lock().unwrap().contains(&patient_id))
    }
}

// ==============================================================================
// APPOINTMENT STORE
// ==============================================================================

/// Enforces the same (doctor, date, time) uniqueness over non-cancelled rows
/// as the partial index in `migrations/`.
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<Appointment>>,
    rival: Mutex<Option<Appointment>>,
}

impl InMemoryStore {
    pub fn seed(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        status: AppointmentStatus,
        created_at: DateTime<Utc>,
    ) -> Appointment {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            appointment_date: date,
            appointment_time: time.to_string(),
            status,
            cancellation_reason: None,
            cancellation_requested_at: None,
            reminder_sent: false,
            date_created: Some(created_at),
            updated_at: None,
        };
        self.rows.lock().unwrap().push(appointment.clone());
        appointment
    }

    /// The next insert finds this booking already committed, as if a
    /// concurrent request won the race after the availability check.
    pub fn commit_rival_before_next_insert(&self, rival: Appointment) {
        *self.rival.lock().unwrap() = Some(rival);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Appointment> {
        self.rows.lock().unwrap().iter().find(|row| row.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn violates_slot_index(rows: &[Appointment], candidate: &Appointment) -> bool {
        candidate.occupies_slot()
            && rows.iter().any(|row| {
                row.id != candidate.id
                    && row.occupies_slot()
                    && row.doctor_id == candidate.doctor_id
                    && row.appointment_date == candidate.appointment_date
                    && row.appointment_time == candidate.appointment_time
            })
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(rival) = self.rival.lock().unwrap().take() {
            rows.push(rival);
        }

        let created = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            status: appointment.status,
            cancellation_reason: None,
            cancellation_requested_at: None,
            reminder_sent: false,
            date_created: Some(Utc::now()),
            updated_at: None,
        };

        if Self::violates_slot_index(&rows, &created) {
            return Err(StoreError::SlotTaken);
        }

        rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, changes: AppointmentChanges) -> Result<Appointment, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let index = rows.iter().position(|row| row.id == id).ok_or(StoreError::NotFound)?;

        let mut updated = rows[index].clone();
        changes.apply_to(&mut updated);
        updated.updated_at = Some(Utc::now());

        if Self::violates_slot_index(&rows, &updated) {
            return Err(StoreError::SlotTaken);
        }

        rows[index] = updated.clone();
        Ok(updated)
    }

    async fn find_active_on(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, StoreError> {
        Ok(self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.doctor_id == doctor_id && row.appointment_date == date && row.occupies_slot())
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(rows)
    }

    async fn count_with_status_since(
        &self,
        statuses: &[AppointmentStatus],
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| statuses.contains(&row.status))
            .filter(|row| row.date_created.map_or(false, |created| created >= since))
            .count() as u64)
    }

    async fn page_with_status(
        &self,
        statuses: &[AppointmentStatus],
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<Appointment>, u64), StoreError> {
        let mut matching: Vec<Appointment> = self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| statuses.contains(&row.status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.date_created.cmp(&b.date_created));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }
}

// ==============================================================================
// BILLING
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefundBehaviour {
    Succeed,
    Fail,
}

pub struct FakeBilling {
    invoices: Mutex<HashMap<Uuid, Invoice>>,
    refund_behaviour: Mutex<RefundBehaviour>,
    fail_invoice_update: Mutex<bool>,
    refund_calls: Mutex<Vec<String>>,
}

impl Default for FakeBilling {
    fn default() -> Self {
        Self {
            invoices: Mutex::new(HashMap::new()),
            refund_behaviour: Mutex::new(RefundBehaviour::Succeed),
            fail_invoice_update: Mutex::new(false),
            refund_calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBilling {
    pub fn add_invoice(&self, appointment_id: Uuid, status: PaymentStatus, refunded: bool) -> Uuid {
        let invoice = Invoice {
            id: Uuid::new_v4(),
            appointment_id: Some(appointment_id),
            patient_id: None,
            total_amount: 2500.0,
            payment_status: status,
            payment_intent_id: Some(format!("pi_{}", appointment_id.simple())),
            refunded,
            refund_id: None,
            refund_date: None,
        };
        let id = invoice.id;
        self.invoices.lock().unwrap().insert(appointment_id, invoice);
        id
    }

    pub fn set_refund_behaviour(&self, behaviour: RefundBehaviour) {
        *self.refund_behaviour.lock().unwrap() = behaviour;
    }

    pub fn fail_invoice_updates(&self) {
        *self.fail_invoice_update.lock().unwrap() = true;
    }

    pub fn invoice_for(&self, appointment_id: Uuid) -> Option<Invoice> {
        self.invoices.lock().unwrap().get(&appointment_id).cloned()
    }

    pub fn refund_calls(&self) -> usize {
        self.refund_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BillingGateway for FakeBilling {
    async fn find_invoice_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, BillingError> {
        Ok(self.invoice_for(appointment_id))
    }

    async fn refund(&self, payment_intent_id: &str) -> Result<Refund, BillingError> {
        self.refund_calls.lock().unwrap().push(payment_intent_id.to_string());

        match *self.refund_behaviour.lock().unwrap() {
            RefundBehaviour::Succeed => Ok(Refund {
                id: format!("re_{}", self.refund_calls()),
                status: Some("succeeded".to_string()),
                payment_intent: Some(payment_intent_id.to_string()),
            }),
            RefundBehaviour::Fail => Err(BillingError::Provider("card_declined".to_string())),
        }
    }

    async fn mark_refunded(
        &self,
        invoice_id: Uuid,
        refund_id: &str,
        refunded_at: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        if *self.fail_invoice_update.lock().unwrap() {
            return Err(BillingError::Database("connection reset".to_string()));
        }

        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .values_mut()
            .find(|invoice| invoice.id == invoice_id)
            .ok_or(BillingError::InvoiceNotFound)?;

        invoice.payment_status = PaymentStatus::Refunded;
        invoice.refunded = true;
        invoice.refund_id = Some(refund_id.to_string());
        invoice.refund_date = Some(refunded_at);
        Ok(invoice.clone())
    }
}

// ==============================================================================
// HARNESS
// ==============================================================================

#[derive(Default)]
pub struct Clinic {
    pub doctors: Arc<FakeDoctors>,
    pub patients: Arc<FakePatients>,
    pub store: Arc<InMemoryStore>,
    pub billing: Arc<FakeBilling>,
}

impl Clinic {
    pub fn manager(&self) -> AppointmentLifecycleManager {
        AppointmentLifecycleManager::new(
            self.doctors.clone(),
            self.patients.clone(),
            self.store.clone(),
            self.billing.clone(),
        )
    }

    pub fn reporting(&self, default_page_size: u32) -> AppointmentReportingService {
        AppointmentReportingService::new(self.store.clone(), default_page_size)
    }

    /// Seeds a booking for a new patient, created the day before `reference_now`.
    pub fn seed(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        status: AppointmentStatus,
    ) -> Appointment {
        let patient_id = self.patients.add();
        self.store.seed(patient_id, doctor_id, date, time, status, reference_now() - Duration::days(1))
    }
}

/// Fixed "now" used by reporting tests.
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use billing_cell::BillingError;
use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentStatus, CancellationOutcome,
    CancellationRequest, CreateAppointmentRequest, NewAppointment, UpdateAppointmentRequest,
};
use crate::services::availability::SlotAvailabilityResolver;
use crate::services::collaborators::{
    AppointmentStore, BillingGateway, DoctorDirectory, PatientDirectory, StoreError,
};
use crate::services::supabase::SupabaseCollaborators;

/// Creates, moves, cancels and advances appointments.
pub struct AppointmentLifecycleManager {
    doctors: Arc<dyn DoctorDirectory>,
    patients: Arc<dyn PatientDirectory>,
    store: Arc<dyn AppointmentStore>,
    billing: Arc<dyn BillingGateway>,
    resolver: SlotAvailabilityResolver,
}

impl AppointmentLifecycleManager {
    pub fn new(
        doctors: Arc<dyn DoctorDirectory>,
        patients: Arc<dyn PatientDirectory>,
        store: Arc<dyn AppointmentStore>,
        billing: Arc<dyn BillingGateway>,
    ) -> Self {
        let resolver = SlotAvailabilityResolver::new(Arc::clone(&doctors), Arc::clone(&store));
        Self { doctors, patients, store, billing, resolver }
    }

    /// Wires the Supabase and Stripe backed collaborators for one request.
    pub fn for_request(config: &AppConfig, auth_token: &str) -> Self {
        let collaborators = SupabaseCollaborators::new(config, auth_token);
        Self::new(
            collaborators.doctors,
            collaborators.patients,
            collaborators.store,
            collaborators.billing,
        )
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        self.resolver.available_slots(doctor_id, date).await
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store.get(appointment_id).await?.ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.store.list_all().await?)
    }

    /// Direct booking. The slot must be free on the doctor's shift.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking doctor {} on {} at {}",
               request.doctor_id, request.appointment_date, request.appointment_time);

        match self.doctors.get_doctor(request.doctor_id).await? {
            None => return Err(AppointmentError::DoctorNotFound),
            Some(doctor) if !doctor.available => return Err(AppointmentError::DoctorUnavailable),
            Some(_) => {}
        }

        if !self.patients.patient_exists(request.patient_id).await? {
            return Err(AppointmentError::PatientNotFound);
        }

        let available = self.resolver
            .available_slots(request.doctor_id, request.appointment_date)
            .await?;

        if !available.contains(&request.appointment_time) {
            warn!("Slot {} on {} not available for doctor {}",
                  request.appointment_time, request.appointment_date, request.doctor_id);
            return Err(AppointmentError::slot_conflict(available, request.appointment_date));
        }

        let new_appointment = NewAppointment {
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            status: AppointmentStatus::Scheduled,
        };

        let appointment = self.insert(new_appointment).await?;
        info!("Appointment {} scheduled", appointment.id);
        Ok(appointment)
    }

    /// Patient-originated request; confirmed later by an administrator.
    pub async fn request_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if !self.patients.patient_exists(request.patient_id).await? {
            return Err(AppointmentError::PatientNotFound);
        }

        if self.doctors.get_doctor(request.doctor_id).await?.is_none() {
            return Err(AppointmentError::DoctorNotFound);
        }

        let new_appointment = NewAppointment {
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            status: AppointmentStatus::Requested,
        };

        let appointment = self.insert(new_appointment).await?;
        info!("Appointment {} requested by patient {}", appointment.id, appointment.patient_id);
        Ok(appointment)
    }

    /// Partial update. A date or time change is validated against the target
    /// day's free slots, with the appointment's own slot counted as free.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        let target_date = request.appointment_date.unwrap_or(current.appointment_date);
        if request.touches_slot() {
            let target_time = request
                .appointment_time
                .as_deref()
                .unwrap_or(current.appointment_time.as_str());

            let candidates = self.resolver.reschedule_candidates(&current, target_date).await?;
            if !candidates.iter().any(|slot| slot == target_time) {
                warn!("Reschedule of {} to {} {} rejected", appointment_id, target_date, target_time);
                return Err(AppointmentError::slot_conflict(candidates, target_date));
            }
        }

        let changes = AppointmentChanges {
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            status: request.status,
            reminder_sent: request.reminder_sent,
            ..AppointmentChanges::default()
        };

        if changes.is_empty() {
            return Ok(current);
        }

        match self.store.update(appointment_id, changes).await {
            Ok(updated) => {
                info!("Appointment {} updated", appointment_id);
                Ok(updated)
            }
            Err(StoreError::SlotTaken) => {
                let candidates = self.resolver.reschedule_candidates(&current, target_date).await?;
                Err(AppointmentError::slot_conflict(candidates, target_date))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancels a confirmed appointment, refunding a paid invoice first.
    ///
    /// When `patient_scope` is set the appointment must belong to that patient.
    /// Billing failures are logged and reported as `refund_processed: false`;
    /// they never block the cancellation itself.
    pub async fn request_cancellation(
        &self,
        request: CancellationRequest,
        patient_scope: Option<Uuid>,
    ) -> Result<CancellationOutcome, AppointmentError> {
        let appointment = self.get_appointment(request.appointment_id).await?;

        if let Some(patient_id) = patient_scope {
            if appointment.patient_id != patient_id {
                return Err(AppointmentError::Forbidden(
                    "Not authorized to cancel this appointment".to_string(),
                ));
            }
        }

        if !appointment.status.can_request_cancellation() {
            warn!("Cancellation of {} rejected in status {}", appointment.id, appointment.status);
            return Err(AppointmentError::InvalidStateTransition(appointment.status));
        }

        let refund_processed = self.refund_paid_invoice(appointment.id).await;

        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Cancelled),
            cancellation_reason: request.reason,
            cancellation_requested_at: Some(Utc::now()),
            ..AppointmentChanges::default()
        };
        let appointment = self.store.update(appointment.id, changes).await?;

        info!("Appointment {} cancelled (refund processed: {})", appointment.id, refund_processed);
        Ok(CancellationOutcome { appointment, refund_processed })
    }

    /// Status change without slot revalidation. Terminal statuses stay terminal.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;

        if current.status.is_terminal() && current.status != status {
            warn!("Status change {} -> {} rejected for {}", current.status, status, appointment_id);
            return Err(AppointmentError::InvalidStateTransition(current.status));
        }

        let updated = self.store
            .update(appointment_id, AppointmentChanges::status(status))
            .await?;

        info!("Appointment {} status set to {}", appointment_id, status);
        Ok(updated)
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let doctor_id = appointment.doctor_id;
        let date = appointment.appointment_date;

        match self.store.insert(appointment).await {
            Ok(created) => Ok(created),
            Err(StoreError::SlotTaken) => {
                let available = self.resolver.available_slots(doctor_id, date).await?;
                Err(AppointmentError::slot_conflict(available, date))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns true only when a refund was issued by this call.
    async fn refund_paid_invoice(&self, appointment_id: Uuid) -> bool {
        let invoice = match self.billing.find_invoice_by_appointment(appointment_id).await {
            Ok(Some(invoice)) => invoice,
            Ok(None) => return false,
            Err(e) => {
                error!("Invoice lookup failed for appointment {}: {}", appointment_id, e);
                return false;
            }
        };

        if !invoice.is_refundable() {
            return false;
        }

        let Some(payment_intent_id) = invoice.payment_intent_id.as_deref() else {
            error!("{}", BillingError::MissingPaymentIntent(invoice.id));
            return false;
        };

        let refund = match self.billing.refund(payment_intent_id).await {
            Ok(refund) => refund,
            Err(e) => {
                error!("Refund processing error for invoice {}: {}", invoice.id, e);
                return false;
            }
        };

        if let Err(e) = self.billing.mark_refunded(invoice.id, &refund.id, Utc::now()).await {
            error!("Refund {} issued but invoice {} was not updated: {}", refund.id, invoice.id, e);
        }

        true
    }
}

// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::Shift;

use crate::models::{Appointment, AppointmentError};
use crate::services::collaborators::{AppointmentStore, DoctorDirectory};
use crate::services::shift_calendar::{is_slot_in_shift, slot_position, slots_for};

/// Free slots for a doctor on a day, derived from the shift and the
/// non-cancelled bookings already on record.
#[derive(Clone)]
pub struct SlotAvailabilityResolver {
    doctors: Arc<dyn DoctorDirectory>,
    store: Arc<dyn AppointmentStore>,
}

impl SlotAvailabilityResolver {
    pub fn new(doctors: Arc<dyn DoctorDirectory>, store: Arc<dyn AppointmentStore>) -> Self {
        Self { doctors, store }
    }

    /// Returns an empty list for unknown or unavailable doctors.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        let Some(shift) = self.bookable_shift(doctor_id).await? else {
            debug!("Doctor {} missing or unavailable, no slots on {}", doctor_id, date);
            return Ok(Vec::new());
        };

        let slots = self.free_slots_on(doctor_id, shift, date).await?;
        debug!("Doctor {} has {} free slots on {}", doctor_id, slots.len(), date);
        Ok(slots)
    }

    /// Candidate slots for moving `current` to `target_date`, counting the
    /// appointment's own slot as free when it stays on the same day.
    ///
    /// The own slot is kept even when the doctor has since been marked
    /// unavailable or removed; only other slots depend on availability.
    pub async fn reschedule_candidates(
        &self,
        current: &Appointment,
        target_date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        let Some(doctor) = self.doctors.get_doctor(current.doctor_id).await? else {
            debug!("Doctor {} missing, only the booked slot remains", current.doctor_id);
            return Ok(own_slot_only(current, target_date));
        };

        let slots = if doctor.available {
            self.free_slots_on(current.doctor_id, doctor.shift, target_date).await?
        } else {
            Vec::new()
        };
        Ok(with_self_inclusion(slots, doctor.shift, current, target_date))
    }

    async fn bookable_shift(&self, doctor_id: Uuid) -> Result<Option<Shift>, AppointmentError> {
        Ok(self.doctors
            .get_doctor(doctor_id)
            .await?
            .filter(|doctor| doctor.available)
            .map(|doctor| doctor.shift))
    }

    async fn free_slots_on(
        &self,
        doctor_id: Uuid,
        shift: Shift,
        date: NaiveDate,
    ) -> Result<Vec<String>, AppointmentError> {
        let booked = self.store.find_active_on(doctor_id, date).await?;
        Ok(free_slots(shift, &booked))
    }
}

/// Shift slots minus the times held by `booked`, in shift order.
pub fn free_slots(shift: Shift, booked: &[Appointment]) -> Vec<String> {
    let taken: HashSet<&str> = booked
        .iter()
        .filter(|appointment| appointment.occupies_slot())
        .map(|appointment| appointment.appointment_time.as_str())
        .collect();

    slots_for(shift)
        .iter()
        .filter(|slot| !taken.contains(*slot))
        .map(|slot| slot.to_string())
        .collect()
}

/// Adds an appointment's own slot back into the candidate list when it is
/// being moved within the same day, keeping shift order.
pub fn with_self_inclusion(
    mut slots: Vec<String>,
    shift: Shift,
    current: &Appointment,
    target_date: NaiveDate,
) -> Vec<String> {
    let own = current.appointment_time.as_str();

    if target_date != current.appointment_date
        || !current.occupies_slot()
        || !is_slot_in_shift(shift, own)
        || slots.iter().any(|slot| slot == own)
    {
        return slots;
    }

    let own_position = slot_position(shift, own);
    let index = slots
        .iter()
        .position(|slot| slot_position(shift, slot) > own_position)
        .unwrap_or(slots.len());

    slots.insert(index, own.to_string());
    slots
}

/// Without a shift to check against, the booked slot is the only candidate.
fn own_slot_only(current: &Appointment, target_date: NaiveDate) -> Vec<String> {
    if target_date == current.appointment_date && current.occupies_slot() {
        vec![current.appointment_time.clone()]
    } else {
        Vec::new()
    }
}

// libs/appointment-cell/src/services/shift_calendar.rs
use doctor_cell::Shift;

const MORNING_SLOTS: [&str; 4] = ["09:00", "10:00", "11:00", "12:00"];
const EVENING_SLOTS: [&str; 4] = ["14:00", "15:00", "16:00", "17:00"];
const NIGHT_SLOTS: [&str; 4] = ["18:00", "19:00", "20:00", "21:00"];

/// Hourly slot labels for a shift, in chronological order.
pub fn slots_for(shift: Shift) -> &'static [&'static str] {
    match shift {
        Shift::Morning => &MORNING_SLOTS,
        Shift::Evening => &EVENING_SLOTS,
        Shift::Night => &NIGHT_SLOTS,
    }
}

pub fn is_slot_in_shift(shift: Shift, label: &str) -> bool {
    slots_for(shift).contains(&label)
}

/// Position of `label` within the shift, used to keep slot lists ordered.
pub fn slot_position(shift: Shift, label: &str) -> Option<usize> {
    slots_for(shift).iter().position(|slot| *slot == label)
}

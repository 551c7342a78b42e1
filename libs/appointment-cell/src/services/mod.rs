pub mod availability;
pub mod collaborators;
pub mod lifecycle;
pub mod reporting;
pub mod shift_calendar;
pub mod supabase;

pub use availability::SlotAvailabilityResolver;
pub use lifecycle::AppointmentLifecycleManager;
pub use reporting::AppointmentReportingService;

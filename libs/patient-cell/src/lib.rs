pub mod models;
pub mod services;

pub use models::Patient;
pub use services::PatientService;

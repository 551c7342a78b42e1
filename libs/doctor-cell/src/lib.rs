pub mod models;
pub mod services;

pub use models::{Doctor, DoctorError, Shift};
pub use services::DoctorService;

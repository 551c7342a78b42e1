use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};

/// Patient row as far as scheduling is concerned. Registration and profile
/// management are handled by the patient administration screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    /// Same value as the patient's auth user id.
    pub id: Uuid,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Working shift a doctor is rostered on. Unknown categories are rejected
/// when a doctor row is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    #[serde(alias = "morning")]
    Morning,
    #[serde(alias = "evening")]
    Evening,
    #[serde(alias = "night")]
    Night,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Morning, Shift::Evening, Shift::Night];
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shift::Morning => write!(f, "Morning"),
            Shift::Evening => write!(f, "Evening"),
            Shift::Night => write!(f, "Night"),
        }
    }
}

impl FromStr for Shift {
    type Err = DoctorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Shift::Morning),
            "evening" => Ok(Shift::Evening),
            "night" => Ok(Shift::Night),
            _ => Err(DoctorError::InvalidShift(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub department_id: Option<Uuid>,
    pub shift: Shift,
    pub working_hours: Option<String>,
    pub availability_status: bool,
    #[serde(default)]
    pub rating: f32,
    pub created_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn is_bookable(&self) -> bool {
        self.availability_status
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Invalid shift: {0}")]
    InvalidShift(String),
}

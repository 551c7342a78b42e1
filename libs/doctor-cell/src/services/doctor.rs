use std::sync::Arc;

use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, Shift};

/// Read-only access to the doctors table. Doctor CRUD lives elsewhere;
/// scheduling only needs the shift and availability flag.
pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Returns `Ok(None)` when no doctor has this id. A row whose shift is not
    /// a known category fails with [`DoctorError::InvalidShift`](crate::DoctorError).
    pub async fn find_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Doctor>> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let Some(row) = result.into_iter().next() else {
            return Ok(None);
        };

        if let Some(raw) = row.get("shift").and_then(Value::as_str) {
            raw.parse::<Shift>()?;
        }

        Ok(Some(serde_json::from_value(row)?))
    }
}

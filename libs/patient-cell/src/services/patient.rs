use std::sync::Arc;

use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::Patient;

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Patient>> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub async fn patient_exists(&self, patient_id: Uuid, auth_token: &str) -> Result<bool> {
        Ok(self.find_patient(patient_id, auth_token).await?.is_some())
    }
}

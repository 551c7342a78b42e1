use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BillingError, Invoice, PaymentStatus};

pub struct InvoiceService {
    supabase: Arc<SupabaseClient>,
}

impl InvoiceService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_by_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Invoice>, BillingError> {
        debug!("Looking up invoice for appointment {}", appointment_id);

        let path = format!("/rest/v1/invoices?appointment_id=eq.{}&limit=1", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BillingError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| BillingError::Database(format!("Failed to parse invoice: {}", e)))
    }

    pub async fn mark_refunded(
        &self,
        invoice_id: Uuid,
        refund_id: &str,
        refunded_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Invoice, BillingError> {
        let update = json!({
            "payment_status": PaymentStatus::Refunded,
            "refunded": true,
            "refund_id": refund_id,
            "refund_date": refunded_at.to_rfc3339(),
        });

        let path = format!("/rest/v1/invoices?id=eq.{}", invoice_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| BillingError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(BillingError::InvoiceNotFound)?;
        let invoice: Invoice = serde_json::from_value(row)
            .map_err(|e| BillingError::Database(format!("Failed to parse invoice: {}", e)))?;

        info!("Invoice {} marked refunded ({})", invoice.id, refund_id);
        Ok(invoice)
    }
}

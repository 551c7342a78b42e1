use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{BillingError, Refund};

/// Minimal Stripe REST client; only refunds are issued from this service.
pub struct StripeRefundClient {
    client: Client,
    base_url: String,
    secret_key: String,
    configured: bool,
}

impl StripeRefundClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.stripe_api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
            configured: config.is_billing_configured(),
        }
    }

    /// Refunds the full amount captured on `payment_intent_id`.
    pub async fn refund_payment_intent(&self, payment_intent_id: &str) -> Result<Refund, BillingError> {
        if !self.configured {
            return Err(BillingError::NotConfigured);
        }

        let url = format!("{}/refunds", self.base_url);
        debug!("Requesting refund for payment intent {}", payment_intent_id);

        let body = format!("payment_intent={}", urlencoding::encode(payment_intent_id));

        let response = self.client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("Idempotency-Key", format!("refund-{}", payment_intent_id))
            .body(body)
            .send()
            .await
            .map_err(|e| BillingError::Provider(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| BillingError::Provider(format!("Unreadable refund response: {}", e)))?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown provider error")
                .to_string();
            error!("Stripe refund failed ({}): {}", status, message);
            return Err(BillingError::Provider(message));
        }

        let refund: Refund = serde_json::from_value(payload)
            .map_err(|e| BillingError::Provider(format!("Unexpected refund payload: {}", e)))?;

        info!("Stripe refund {} created for {}", refund.id, payment_intent_id);
        Ok(refund)
    }
}

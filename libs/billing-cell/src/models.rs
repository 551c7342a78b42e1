use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(alias = "unpaid")]
    Unpaid,
    #[serde(alias = "paid")]
    Paid,
    #[serde(alias = "refunded")]
    Refunded,
    #[serde(alias = "overdue")]
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub refunded: bool,
    pub refund_id: Option<String>,
    pub refund_date: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Paid and not yet refunded.
    pub fn is_refundable(&self) -> bool {
        self.payment_status == PaymentStatus::Paid && !self.refunded
    }
}

/// Subset of the Stripe refund object we keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: Option<String>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Invoice {0} has no payment intent to refund")]
    MissingPaymentIntent(Uuid),

    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Payment provider rejected the request: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice(status: &str, refunded: bool) -> Invoice {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "appointment_id": Uuid::new_v4(),
            "payment_status": status,
            "payment_intent_id": "pi_1",
            "refunded": refunded
        }))
        .unwrap()
    }

    #[test]
    fn only_paid_unrefunded_invoices_are_refundable() {
        assert!(invoice("Paid", false).is_refundable());
        assert!(invoice("paid", false).is_refundable());
        assert!(!invoice("Paid", true).is_refundable());
        assert!(!invoice("Unpaid", false).is_refundable());
        assert!(!invoice("Refunded", true).is_refundable());
    }
}

pub mod models;
pub mod services;

pub use models::{BillingError, Invoice, PaymentStatus, Refund};
pub use services::{InvoiceService, StripeRefundClient};

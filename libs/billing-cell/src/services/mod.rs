pub mod invoice;
pub mod stripe;

pub use invoice::InvoiceService;
pub use stripe::StripeRefundClient;

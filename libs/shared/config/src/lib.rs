use std::env;
use tracing::warn;

pub const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 7;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_api_base_url: String,
    pub server_port: u16,
    pub default_page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .unwrap_or_else(|_| {
                    warn!("STRIPE_SECRET_KEY not set, refunds will be skipped");
                    String::new()
                }),
            stripe_api_base_url: env::var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE_URL.to_string()),
            server_port: parse_or_default("PORT", DEFAULT_PORT),
            default_page_size: parse_or_default("APPOINTMENTS_PAGE_SIZE", DEFAULT_PAGE_SIZE),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_billing_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty() && !self.stripe_api_base_url.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_requires_secret_key() {
        let config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            stripe_secret_key: String::new(),
            stripe_api_base_url: DEFAULT_STRIPE_API_BASE_URL.to_string(),
            server_port: DEFAULT_PORT,
            default_page_size: DEFAULT_PAGE_SIZE,
        };

        assert!(config.is_configured());
        assert!(!config.is_billing_configured());
    }

    #[test]
    fn unparsable_values_fall_back() {
        std::env::set_var("CLINIC_TEST_BAD_PORT", "not-a-port");
        assert_eq!(parse_or_default("CLINIC_TEST_BAD_PORT", 3000u16), 3000);
        std::env::remove_var("CLINIC_TEST_BAD_PORT");
        assert_eq!(parse_or_default("CLINIC_TEST_MISSING", 7u32), 7);
    }
}

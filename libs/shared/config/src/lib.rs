use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub session_jwt_secret: String,
    pub session_ttl_hours: i64,
    pub storage_bucket: String,
    pub employee_email_domain: Option<String>,
    pub clinic_opening_hour: u32,
    pub clinic_closing_hour: u32,
    pub clinic_utc_offset_minutes: i32,
    pub alert_expiry_window_days: i64,
    pub alert_low_stock_threshold: u32,
    pub alert_sweep_interval_secs: u64,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
            session_jwt_secret: String::new(),
            session_ttl_hours: 12,
            storage_bucket: "clinic-files".to_string(),
            employee_email_domain: None,
            clinic_opening_hour: 8,
            clinic_closing_hour: 18,
            clinic_utc_offset_minutes: 0,
            alert_expiry_window_days: 30,
            alert_low_stock_threshold: 5,
            alert_sweep_interval_secs: 0,
            server_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

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
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, falling back to the anon key");
                    String::new()
                }),
            session_jwt_secret: env::var("SESSION_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SESSION_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", defaults.session_ttl_hours),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or(defaults.storage_bucket),
            employee_email_domain: env::var("EMPLOYEE_EMAIL_DOMAIN")
                .ok()
                .filter(|domain| !domain.trim().is_empty()),
            clinic_opening_hour: parse_or("CLINIC_OPENING_HOUR", defaults.clinic_opening_hour),
            clinic_closing_hour: parse_or("CLINIC_CLOSING_HOUR", defaults.clinic_closing_hour),
            clinic_utc_offset_minutes: parse_or(
                "CLINIC_UTC_OFFSET_MINUTES",
                defaults.clinic_utc_offset_minutes,
            ),
            alert_expiry_window_days: parse_or(
                "ALERT_EXPIRY_WINDOW_DAYS",
                defaults.alert_expiry_window_days,
            ),
            alert_low_stock_threshold: parse_or(
                "ALERT_LOW_STOCK_THRESHOLD",
                defaults.alert_low_stock_threshold,
            ),
            alert_sweep_interval_secs: parse_or(
                "ALERT_SWEEP_INTERVAL_SECS",
                defaults.alert_sweep_interval_secs,
            ),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.clinic_opening_hour >= config.clinic_closing_hour {
            warn!(
                "Clinic opening hour {} is not before closing hour {}",
                config.clinic_opening_hour, config.clinic_closing_hour
            );
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.session_jwt_secret.is_empty()
    }

    /// Key used for store calls made on behalf of the back-office itself.
    pub fn store_key(&self) -> &str {
        if self.supabase_service_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_key
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

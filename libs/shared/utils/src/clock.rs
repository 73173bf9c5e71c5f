use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};

use shared_config::AppConfig;

/// Wall-clock time at the clinic, from the configured UTC offset.
pub fn clinic_now(config: &AppConfig) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::minutes(config.clinic_utc_offset_minutes as i64)
}

pub fn clinic_today(config: &AppConfig) -> NaiveDate {
    clinic_now(config).date()
}

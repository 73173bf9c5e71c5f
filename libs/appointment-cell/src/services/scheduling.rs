use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::models::ClinicHours;

/// Collects every reason the slot cannot be booked, given the clinic's local `now`.
pub fn validate_schedule(
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveDateTime,
    hours: ClinicHours,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if date.and_time(time) < now {
        errors.push("The appointment cannot be in the past.".to_string());
    }

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        errors.push("Appointments can only be booked Monday to Friday.".to_string());
    }

    if time.hour() < hours.opening_hour || time.hour() >= hours.closing_hour {
        errors.push(format!(
            "The appointment time must be between {:02}:00 and {:02}:00.",
            hours.opening_hour, hours.closing_hour
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2030-03-04 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 4).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 3, 1).unwrap().and_time(at(12, 0))
    }

    #[test]
    fn test_weekday_in_hours_is_accepted() {
        assert!(validate_schedule(monday(), at(8, 0), now(), ClinicHours::default()).is_ok());
        assert!(validate_schedule(monday(), at(17, 59), now(), ClinicHours::default()).is_ok());
    }

    #[test]
    fn test_closing_hour_is_exclusive() {
        let errors = validate_schedule(monday(), at(18, 0), now(), ClinicHours::default()).unwrap_err();
        assert_eq!(errors, vec!["The appointment time must be between 08:00 and 18:00.".to_string()]);
        assert!(validate_schedule(monday(), at(7, 59), now(), ClinicHours::default()).is_err());
    }

    #[test]
    fn test_weekend_is_rejected() {
        let saturday = monday() - chrono::Duration::days(2);
        let errors = validate_schedule(saturday, at(10, 0), now(), ClinicHours::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Monday to Friday"));
    }

    #[test]
    fn test_past_slot_is_rejected() {
        let late = monday().and_time(at(11, 0));
        let errors = validate_schedule(monday(), at(10, 0), late, ClinicHours::default()).unwrap_err();
        assert!(errors[0].contains("past"));
    }

    #[test]
    fn test_reports_every_violation() {
        let sunday = monday() - chrono::Duration::days(1);
        let late = monday().and_time(at(9, 0));
        let errors = validate_schedule(sunday, at(20, 0), late, ClinicHours::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_custom_window() {
        let hours = ClinicHours { opening_hour: 9, closing_hour: 12 };
        assert!(validate_schedule(monday(), at(8, 30), now(), hours).is_err());
        assert!(validate_schedule(monday(), at(11, 45), now(), hours).is_ok());
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::upload::FileUpload;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    /// Public URL of the uploaded medical record, if any
    pub record_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    pub fn age(&self, today: NaiveDate) -> u32 {
        today.years_since(self.birth_date).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRequest {
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub record: Option<FileUpload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
    pub sex: Option<Sex>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Invalid patient data: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Invalid record file: {0}")]
    InvalidRecord(String),

    #[error("Record upload failed: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PatientError {
    fn from(err: anyhow::Error) -> Self {
        PatientError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for PatientError {
    fn from(err: serde_json::Error) -> Self {
        PatientError::DatabaseError(format!("Malformed patient row: {}", err))
    }
}

const MAX_NAME_LEN: usize = 100;

fn check_name(label: &str, value: &str, errors: &mut Vec<String>) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(format!("{} is required", label));
    } else if value.chars().count() > MAX_NAME_LEN {
        errors.push(format!("{} must be at most {} characters", label, MAX_NAME_LEN));
    }
}

pub fn validate_create(request: &CreatePatientRequest, today: NaiveDate) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check_name("Last name", &request.last_name, &mut errors);
    check_name("First name", &request.first_name, &mut errors);
    if request.birth_date > today {
        errors.push("Birth date cannot be in the future".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_update(request: &UpdatePatientRequest, today: NaiveDate) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if let Some(last_name) = &request.last_name {
        check_name("Last name", last_name, &mut errors);
    }
    if let Some(first_name) = &request.first_name {
        check_name("First name", first_name, &mut errors);
    }
    if request.birth_date.is_some_and(|d| d > today) {
        errors.push("Birth date cannot be in the future".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn request(last_name: &str, birth_date: NaiveDate) -> CreatePatientRequest {
        CreatePatientRequest {
            last_name: last_name.to_string(),
            first_name: "Paul".to_string(),
            birth_date,
            sex: Sex::Male,
            record: None,
        }
    }

    #[test]
    fn test_validate_create() {
        let born = NaiveDate::from_ymd_opt(1980, 6, 15).unwrap();
        assert!(validate_create(&request("Durand", born), today()).is_ok());

        let errors = validate_create(&request("  ", today().succ_opt().unwrap()), today()).unwrap_err();
        assert_eq!(errors.len(), 2);

        let long = "x".repeat(101);
        assert!(validate_create(&request(&long, born), today()).is_err());
    }

    #[test]
    fn test_validate_update_only_checks_given_fields() {
        assert!(validate_update(&UpdatePatientRequest::default(), today()).is_ok());

        let update = UpdatePatientRequest {
            first_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(validate_update(&update, today()).unwrap_err(), vec!["First name is required"]);
    }

    #[test]
    fn test_age() {
        let patient = Patient {
            id: Uuid::new_v4(),
            last_name: "Durand".to_string(),
            first_name: "Paul".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1980, 6, 15).unwrap(),
            sex: Sex::Male,
            record_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(patient.age(today()), 43);
        assert_eq!(patient.full_name(), "Durand Paul");
    }
}

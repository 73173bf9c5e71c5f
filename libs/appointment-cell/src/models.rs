use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_at(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.appointment_date == date && self.appointment_time == time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// CONFLICTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DoctorBooked,
    PatientBooked,
    DuplicateBooking,
}

impl ConflictKind {
    pub fn message(&self) -> &'static str {
        match self {
            ConflictKind::DoctorBooked => "The doctor already has an appointment at this date and time.",
            ConflictKind::PatientBooked => "The patient already has an appointment at this date and time.",
            ConflictKind::DuplicateBooking => {
                "The patient already has an appointment with this doctor at this date and time."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub conflicts: Vec<ConflictKind>,
    pub messages: Vec<String>,
}

impl ConflictReport {
    pub fn from_kinds(conflicts: Vec<ConflictKind>) -> Self {
        Self {
            has_conflict: !conflicts.is_empty(),
            messages: conflicts.iter().map(|c| c.message().to_string()).collect(),
            conflicts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckQuery {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub exclude_id: Option<Uuid>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}

/// The patient of an existing appointment cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// Working-hour window and weekday rule applied to new slots.
#[derive(Debug, Clone, Copy)]
pub struct ClinicHours {
    pub opening_hour: u32,
    pub closing_hour: u32,
}

impl Default for ClinicHours {
    fn default() -> Self {
        Self {
            opening_hour: 8,
            closing_hour: 18,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment conflicts with existing bookings: {}", .0.join("; "))]
    Conflicts(Vec<String>),

    #[error("Invalid appointment: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Only scheduled appointments can be cancelled (current status: {0})")]
    CannotCancel(AppointmentStatus),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppointmentError {
    fn from(err: serde_json::Error) -> Self {
        AppointmentError::DatabaseError(format!("Malformed appointment row: {}", err))
    }
}

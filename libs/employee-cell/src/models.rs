use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::upload::FileUpload;

pub use shared_models::auth::Role;

// ==============================================================================
// CORE EMPLOYEE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub role: Role,
    pub login: String,
    /// argon2 PHC string, or plaintext for rows imported from the legacy system
    #[serde(default, skip_serializing)]
    pub password: String,
    pub email: String,
    pub phone: Option<String>,
    pub hire_date: NaiveDate,
    pub service: String,
    pub state: EmployeeState,
    pub photo_url: Option<String>,
    #[serde(default = "default_notification_enabled")]
    pub notification_enabled: bool,
    #[serde(default = "default_notification_interval")]
    pub notification_interval_hours: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_notification_enabled() -> bool {
    true
}

fn default_notification_interval() -> u32 {
    24
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Doctors and nurses carry task notifications and collaborate on tasks.
    pub fn is_care_staff(&self) -> bool {
        matches!(self.role, Role::Doctor | Role::Nurse)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeState {
    #[default]
    Active,
    Inactive,
    OnLeave,
    Suspended,
}

impl EmployeeState {
    pub fn all() -> [EmployeeState; 4] {
        [
            EmployeeState::Active,
            EmployeeState::Inactive,
            EmployeeState::OnLeave,
            EmployeeState::Suspended,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            EmployeeState::Active => "Active",
            EmployeeState::Inactive => "Inactive",
            EmployeeState::OnLeave => "On leave",
            EmployeeState::Suspended => "Suspended",
        }
    }
}

impl fmt::Display for EmployeeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmployeeState::Active => write!(f, "active"),
            EmployeeState::Inactive => write!(f, "inactive"),
            EmployeeState::OnLeave => write!(f, "on_leave"),
            EmployeeState::Suspended => write!(f, "suspended"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmployeeRequest {
    pub last_name: String,
    pub first_name: String,
    pub role: Role,
    pub login: String,
    pub password: String,
    pub email: String,
    pub phone: Option<String>,
    pub hire_date: NaiveDate,
    pub service: String,
    pub state: Option<EmployeeState>,
    /// Base64 image; the row keeps its public URL
    pub photo: Option<FileUpload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub role: Option<Role>,
    pub login: Option<String>,
    /// Empty or absent keeps the current password
    pub password: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub service: Option<String>,
    pub state: Option<EmployeeState>,
    /// Replaces the stored photo when present
    pub photo: Option<FileUpload>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeSort {
    NameAsc,
    NameDesc,
    HireDateAsc,
    HireDateDesc,
    #[default]
    Newest,
}

impl EmployeeSort {
    /// PostgREST `order` clause
    pub fn order_clause(&self) -> &'static str {
        match self {
            EmployeeSort::NameAsc => "last_name.asc,first_name.asc",
            EmployeeSort::NameDesc => "last_name.desc,first_name.desc",
            EmployeeSort::HireDateAsc => "hire_date.asc",
            EmployeeSort::HireDateDesc => "hire_date.desc",
            EmployeeSort::Newest => "created_at.desc",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeSearchQuery {
    pub q: Option<String>,
    pub role: Option<Role>,
    pub state: Option<EmployeeState>,
    pub sort: Option<EmployeeSort>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferencesRequest {
    pub notification_enabled: bool,
    pub notification_interval_hours: u32,
}

// ==============================================================================
// DASHBOARD MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleCount {
    pub role: Role,
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyHires {
    /// `YYYY-MM`
    pub month: String,
    /// `Jan 2024`
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeeStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub on_leave: usize,
    pub suspended: usize,
    pub active_percent: f64,
    pub roles: Vec<RoleCount>,
    pub hires_by_month: Vec<MonthlyHires>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum EmployeeError {
    #[error("Employee not found")]
    NotFound,

    #[error("Login {login} is already taken")]
    LoginTaken { login: String },

    #[error("Email {email} is already registered")]
    EmailTaken { email: String },

    #[error("Invalid employee data: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Password is required")]
    MissingPassword,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Invalid photo: {0}")]
    InvalidPhoto(String),

    #[error("Photo storage failed: {0}")]
    Storage(String),

    #[error("Notification preferences are only available to doctors and nurses")]
    NotificationsUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for EmployeeError {
    fn from(err: anyhow::Error) -> Self {
        EmployeeError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for EmployeeError {
    fn from(err: serde_json::Error) -> Self {
        EmployeeError::DatabaseError(format!("Failed to parse employee: {}", err))
    }
}

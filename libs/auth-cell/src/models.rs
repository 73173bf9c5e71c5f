use serde::{Deserialize, Serialize};

use shared_models::auth::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub employee_id: String,
    pub role: Role,
    pub full_name: String,
}

/// A back-office area shown on the caller's landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSection {
    pub key: &'static str,
    pub label: &'static str,
    pub path: &'static str,
    /// Whether the caller may create and edit entries, or only consult them
    pub can_manage: bool,
}

const fn section(key: &'static str, label: &'static str, path: &'static str, can_manage: bool) -> DashboardSection {
    DashboardSection { key, label, path, can_manage }
}

pub fn sections_for(role: Role) -> Vec<DashboardSection> {
    match role {
        Role::Doctor => vec![
            section("tasks", "Tasks", "/tasks", true),
            section("appointments", "Appointments", "/appointments", true),
            section("patients", "Patients", "/patients", true),
        ],
        Role::Nurse => vec![
            section("tasks", "Tasks", "/tasks", false),
            section("appointments", "Appointments", "/appointments", true),
            section("patients", "Patients", "/patients", true),
        ],
        Role::MaterialManager => vec![
            section("materials", "Medical materials", "/materials", true),
        ],
        Role::Admin => vec![
            section("employees", "Employees", "/employees", true),
            section("materials", "Medical materials", "/materials", true),
            section("appointments", "Appointments", "/appointments", true),
            section("patients", "Patients", "/patients", true),
        ],
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use employee_cell::Employee;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub owner_id: Uuid,
    /// Manual position in the owner's list, starting at 1
    pub sort_order: u32,
    pub notify_interval_hours: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCollaborator {
    pub task_id: Uuid,
    pub employee_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDocument {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub uploader_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNote {
    pub id: Uuid,
    pub task_id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub collaborators: Vec<Employee>,
    pub documents: Vec<TaskDocument>,
    pub notes: Vec<TaskNote>,
}

/// What a care-staff member sees on their task page.
#[derive(Debug, Clone, Serialize)]
pub struct TaskBoard {
    pub tasks: Vec<Task>,
    pub shared_tasks: Vec<Task>,
    pub upcoming: Vec<Task>,
    pub notifications_enabled: bool,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

fn default_interval() -> u32 {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(default = "default_interval")]
    pub notify_interval_hours: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub notify_interval_hours: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationIntervalRequest {
    pub notify_interval_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorsRequest {
    pub collaborator_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,

    #[error("Only the owner of the task can do this")]
    NotOwner,

    #[error("You are not allowed to access this task")]
    NoAccess,

    #[error("Invalid task order: {0}")]
    InvalidOrder(String),

    #[error("Invalid task data: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document upload failed: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        TaskError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::DatabaseError(format!("Malformed task row: {}", err))
    }
}

const MAX_DESCRIPTION_LEN: usize = 1000;

fn check_description(description: &str, errors: &mut Vec<String>) {
    let description = description.trim();
    if description.is_empty() {
        errors.push("Description is required".to_string());
    } else if description.chars().count() > MAX_DESCRIPTION_LEN {
        errors.push(format!("Description must be at most {} characters", MAX_DESCRIPTION_LEN));
    }
}

fn check_interval(hours: u32, errors: &mut Vec<String>) {
    if hours < 1 {
        errors.push("Notification interval must be at least 1 hour".to_string());
    }
}

pub fn validate_create(request: &CreateTaskRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check_description(&request.description, &mut errors);
    check_interval(request.notify_interval_hours, &mut errors);

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_update(request: &UpdateTaskRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if let Some(description) = &request.description {
        check_description(description, &mut errors);
    }
    if let Some(hours) = request.notify_interval_hours {
        check_interval(hours, &mut errors);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

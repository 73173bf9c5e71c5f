use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// MATERIAL MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalMaterial {
    pub id: Uuid,
    pub name: String,
    pub material_type: String,
    pub reference: String,
    pub state: MaterialState,
    pub quantity: u32,
    pub initial_quantity: Option<u32>,
    pub purchase_price: f64,
    pub acquisition_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub supplier_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalMaterial {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date < today
    }

    pub fn expires_soon(&self, today: NaiveDate) -> bool {
        self.expiration_date <= today + Duration::days(30)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialState {
    #[default]
    InService,
    Maintenance,
    OutOfService,
    Loaned,
}

impl MaterialState {
    pub fn label(&self) -> &'static str {
        match self {
            MaterialState::InService => "In service",
            MaterialState::Maintenance => "In maintenance",
            MaterialState::OutOfService => "Out of service",
            MaterialState::Loaned => "On loan",
        }
    }
}

impl fmt::Display for MaterialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialState::InService => write!(f, "in_service"),
            MaterialState::Maintenance => write!(f, "maintenance"),
            MaterialState::OutOfService => write!(f, "out_of_service"),
            MaterialState::Loaned => write!(f, "loaned"),
        }
    }
}

/// Named state changes a material manager can apply outside a plain edit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateTransition {
    Maintenance,
    BackInService,
    Repair,
}

impl StateTransition {
    /// Source state the transition requires and the state it leads to.
    pub fn endpoints(&self) -> (MaterialState, MaterialState) {
        match self {
            StateTransition::Maintenance => (MaterialState::InService, MaterialState::Maintenance),
            StateTransition::BackInService => (MaterialState::Maintenance, MaterialState::InService),
            StateTransition::Repair => (MaterialState::OutOfService, MaterialState::InService),
        }
    }

    pub fn history_action(&self) -> HistoryAction {
        match self {
            StateTransition::Maintenance => HistoryAction::Maintenance,
            StateTransition::BackInService => HistoryAction::BackInService,
            StateTransition::Repair => HistoryAction::Repair,
        }
    }
}

impl fmt::Display for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateTransition::Maintenance => write!(f, "maintenance"),
            StateTransition::BackInService => write!(f, "back_in_service"),
            StateTransition::Repair => write!(f, "repair"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub building: String,
    #[serde(default)]
    pub floor: String,
    pub room: String,
    #[serde(default)]
    pub description: String,
}

impl Location {
    pub fn label(&self) -> String {
        format!("{} - {} - {}", self.building, self.floor, self.room)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Creation,
    Modification,
    Maintenance,
    Loan,
    Return,
    Repair,
    BackInService,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialHistory {
    pub id: Uuid,
    pub material_id: Uuid,
    pub action: HistoryAction,
    #[serde(default)]
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterialDetail {
    #[serde(flatten)]
    pub material: MedicalMaterial,
    pub supplier: Option<Supplier>,
    pub location: Option<Location>,
    pub location_label: Option<String>,
    pub history: Vec<MaterialHistory>,
}

// ==============================================================================
// LOANS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Ongoing,
    Returned,
    Overdue,
}

impl LoanStatus {
    /// Status follows from the dates alone.
    pub fn derive(due_date: NaiveDate, returned_on: Option<NaiveDate>, today: NaiveDate) -> Self {
        if returned_on.is_some() {
            LoanStatus::Returned
        } else if due_date < today {
            LoanStatus::Overdue
        } else {
            LoanStatus::Ongoing
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Ongoing => "Ongoing",
            LoanStatus::Returned => "Returned",
            LoanStatus::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Ongoing => write!(f, "ongoing"),
            LoanStatus::Returned => write!(f, "returned"),
            LoanStatus::Overdue => write!(f, "overdue"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub material_id: Uuid,
    pub borrower: String,
    pub service: String,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned_on: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    pub status: LoanStatus,
}

impl Loan {
    pub fn is_returned(&self) -> bool {
        self.returned_on.is_some()
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        if self.is_returned() || self.due_date < today {
            return 0;
        }
        (self.due_date - today).num_days()
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_returned() || self.due_date >= today {
            return 0;
        }
        (today - self.due_date).num_days()
    }

    pub fn duration_days(&self) -> i64 {
        self.returned_on
            .map(|returned| (returned - self.loan_date).num_days())
            .unwrap_or(0)
    }
}

/// A loan with its material and the day-count figures shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub material_name: Option<String>,
    pub days_remaining: i64,
    pub days_overdue: i64,
    pub duration_days: i64,
}

impl LoanView {
    pub fn new(loan: Loan, material_name: Option<String>, today: NaiveDate) -> Self {
        Self {
            days_remaining: loan.days_remaining(today),
            days_overdue: loan.days_overdue(today),
            duration_days: loan.duration_days(),
            material_name,
            loan,
        }
    }
}

// ==============================================================================
// ALERTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Expiry,
    Stock,
    Overdue,
    Maintenance,
    Breakdown,
    Other,
}

impl AlertType {
    /// Types owned by the sweep; anything else is entered by hand and survives it.
    pub fn automatic() -> [AlertType; 5] {
        [
            AlertType::Expiry,
            AlertType::Stock,
            AlertType::Overdue,
            AlertType::Maintenance,
            AlertType::Breakdown,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertType::Expiry => "Expiry",
            AlertType::Stock => "Low stock",
            AlertType::Overdue => "Overdue loan",
            AlertType::Maintenance => "Maintenance required",
            AlertType::Breakdown => "Breakdown",
            AlertType::Other => "Other",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            AlertType::Expiry => "expiry",
            AlertType::Stock => "stock",
            AlertType::Overdue => "overdue",
            AlertType::Maintenance => "maintenance",
            AlertType::Breakdown => "breakdown",
            AlertType::Other => "other",
        };
        write!(f, "{}", value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

impl AlertPriority {
    pub fn label(&self) -> &'static str {
        match self {
            AlertPriority::High => "High",
            AlertPriority::Medium => "Medium",
            AlertPriority::Low => "Low",
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertPriority::High => write!(f, "high"),
            AlertPriority::Medium => write!(f, "medium"),
            AlertPriority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    InProgress,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub material_id: Uuid,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub status: AlertStatus,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Alert produced by the rules, before the store assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NewAlert {
    pub material_id: Uuid,
    pub alert_type: AlertType,
    pub priority: AlertPriority,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub expiry_window_days: i64,
    pub low_stock: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            expiry_window_days: 30,
            low_stock: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepSummary {
    pub deleted: usize,
    pub created: usize,
    pub active: usize,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMaterialRequest {
    pub name: String,
    pub material_type: String,
    pub reference: String,
    pub state: Option<MaterialState>,
    pub quantity: u32,
    pub initial_quantity: Option<u32>,
    pub purchase_price: f64,
    pub acquisition_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub supplier_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMaterialRequest {
    pub name: Option<String>,
    pub material_type: Option<String>,
    pub reference: Option<String>,
    pub state: Option<MaterialState>,
    pub quantity: Option<u32>,
    pub purchase_price: Option<f64>,
    pub acquisition_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialSearchQuery {
    pub q: Option<String>,
    pub state: Option<MaterialState>,
    pub material_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub material_id: Uuid,
    pub borrower: String,
    pub service: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendLoanRequest {
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanQuery {
    pub status: Option<LoanStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertQuery {
    pub alert_type: Option<AlertType>,
    pub priority: Option<AlertPriority>,
    pub resolved: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierRequest {
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRequest {
    pub building: String,
    #[serde(default)]
    pub floor: String,
    pub room: String,
    #[serde(default)]
    pub description: String,
}

// ==============================================================================
// DASHBOARD
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaterialStats {
    pub total_materials: usize,
    pub in_service: usize,
    pub maintenance: usize,
    pub loaned: usize,
    pub out_of_service: usize,
    pub expired: usize,
    pub expiring_soon: usize,
    pub active_alerts: usize,
    pub ongoing_loans: usize,
    pub overdue_loans: usize,
    pub total_cost: f64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum MaterialError {
    #[error("Material not found")]
    NotFound,

    #[error("Loan not found")]
    LoanNotFound,

    #[error("Alert not found")]
    AlertNotFound,

    #[error("Supplier not found")]
    SupplierNotFound,

    #[error("Location not found")]
    LocationNotFound,

    #[error("Cannot apply {transition} to a material that is {from}")]
    InvalidTransition { transition: StateTransition, from: MaterialState },

    #[error("Material is not available for loan (state {state}, quantity {quantity})")]
    NotAvailable { state: MaterialState, quantity: u32 },

    #[error("Loan was already returned")]
    AlreadyReturned,

    #[error("Material quantity is at its maximum")]
    QuantityOverflow,

    #[error("New due date must be after {current}")]
    InvalidDueDate { current: NaiveDate },

    #[error("Invalid material data: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for MaterialError {
    fn from(err: anyhow::Error) -> Self {
        MaterialError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for MaterialError {
    fn from(err: serde_json::Error) -> Self {
        MaterialError::DatabaseError(format!("Failed to parse row: {}", err))
    }
}

pub mod appointment;
pub mod conflict;
pub mod scheduling;

pub use appointment::AppointmentService;
pub use conflict::{evaluate_conflicts, ConflictDetectionService, SlotRequest};

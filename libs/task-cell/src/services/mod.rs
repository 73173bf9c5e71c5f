pub mod ordering;
pub mod task;

pub use ordering::{notification_window, reorder_plan, retain_collaborators};
pub use task::TaskService;

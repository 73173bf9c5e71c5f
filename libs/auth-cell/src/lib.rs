pub mod handlers;
pub mod models;
pub mod router;

pub use models::{sections_for, DashboardSection, LoginRequest, LoginResponse};
pub use router::auth_routes;

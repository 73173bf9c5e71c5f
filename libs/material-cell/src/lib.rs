pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::material_routes;
pub use services::{AlertService, DirectoryService, LoanService, MaterialService};

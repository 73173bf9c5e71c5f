pub mod alerts;
pub mod directory;
pub mod loan;
pub mod material;
pub mod rules;
pub mod stats;

pub use alerts::AlertService;
pub use directory::DirectoryService;
pub use loan::LoanService;
pub use material::MaterialService;

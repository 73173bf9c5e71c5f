pub mod employee;
pub mod password;
pub mod stats;
pub mod validation;

pub use employee::EmployeeService;
pub use password::PasswordService;

pub mod admin_service;
pub mod file_service;
pub mod order_service;
pub mod quote_service;
pub mod submission_service;

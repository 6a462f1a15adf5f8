pub mod files;
pub mod orders;
pub mod quotes;

pub mod extract;
pub mod types;

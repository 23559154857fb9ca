pub mod context;
pub mod persist;
pub mod reconcile;
pub mod store;
pub mod types;
pub mod zep;

pub mod api;
pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod sandbox;
pub mod validation;

pub use context::AppContext;

//! HTTP surface for the validation service.

pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use state::AppState;

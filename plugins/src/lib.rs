//! Built-in trust metrics for trustd.

pub mod factory;
pub mod metrics;

pub use factory::build_registry;

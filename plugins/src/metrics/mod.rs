//! Trust metric heuristics over package metadata.

mod bus_factor;
mod cli_presence;
mod code_quality;
mod dataset_and_code;
mod dataset_quality;
mod dependencies;
mod license;
mod logging_env;
mod performance;
mod pr_hygiene;
mod ramp_up;
mod reproducibility;
mod reviewedness;
mod size;
mod text;
mod tree;

pub use bus_factor::BusFactorMetric;
pub use cli_presence::CliPresenceMetric;
pub use code_quality::CodeQualityMetric;
pub use dataset_and_code::DatasetAndCodeMetric;
pub use dataset_quality::DatasetQualityMetric;
pub use dependencies::DependencyCountMetric;
pub use license::LicenseMetric;
pub use logging_env::LoggingEnvHygieneMetric;
pub use performance::PerformanceClaimsMetric;
pub use pr_hygiene::PullRequestHygieneMetric;
pub use ramp_up::RampUpMetric;
pub use reproducibility::ReproducibilityMetric;
pub use reviewedness::{is_code_file, is_reviewed, ReviewednessMetric};
pub use size::{SizeMetric, DEVICE_CLASSES};
pub use tree::TreeScoreMetric;

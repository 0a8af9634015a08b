use std::sync::Arc;

use trustd_core::api as core_api;

use crate::metrics::{
    BusFactorMetric, CliPresenceMetric, CodeQualityMetric, DatasetAndCodeMetric,
    DatasetQualityMetric, DependencyCountMetric, LicenseMetric, LoggingEnvHygieneMetric,
    PerformanceClaimsMetric, PullRequestHygieneMetric, RampUpMetric, ReproducibilityMetric,
    ReviewednessMetric, SizeMetric, TreeScoreMetric,
};

/// Every built-in metric, in reporting order.
pub fn build_registry() -> core_api::MetricRegistry {
    let mut reg = core_api::MetricRegistry::new();
    reg.register(Arc::new(LicenseMetric))
        .register(Arc::new(BusFactorMetric))
        .register(Arc::new(RampUpMetric))
        .register(Arc::new(CodeQualityMetric))
        .register(Arc::new(DatasetAndCodeMetric))
        .register(Arc::new(DatasetQualityMetric))
        .register(Arc::new(ReproducibilityMetric))
        .register(Arc::new(ReviewednessMetric))
        .register(Arc::new(PerformanceClaimsMetric))
        .register(Arc::new(SizeMetric))
        .register(Arc::new(DependencyCountMetric))
        .register(Arc::new(PullRequestHygieneMetric))
        .register(Arc::new(TreeScoreMetric))
        .register(Arc::new(CliPresenceMetric))
        .register(Arc::new(LoggingEnvHygieneMetric));
    tracing::debug!(metrics = reg.len(), "metric registry built");
    reg
}

/// Scores one package with the built-in registry and the configured weights.
pub fn score(
    cfg: &core_api::ScoringConfig,
    metadata: &core_api::PackageMetadata,
) -> core_api::NetScoreReport {
    core_api::score_package(metadata, &build_registry(), &cfg.weights)
}

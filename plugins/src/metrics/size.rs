use std::collections::BTreeMap;

use trustd_core::api as core_api;

use super::text::has_any;

/// Memory budget per deployment target, in bytes.
pub const DEVICE_CLASSES: &[(&str, f64)] = &[
    ("raspberry_pi", 2.0 * GIB),
    ("jetson_nano", 4.0 * GIB),
    ("desktop_pc", 16.0 * GIB),
    ("aws_server", 64.0 * GIB),
];

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const NEUTRAL: f64 = 0.5;
const EFFICIENT: &[&str] = &["lightweight", "efficient", "quantized", "distilled"];
const HEAVY: &[&str] = &["heavy", "resource-intensive", "resource intensive"];

/// Affordability of the package on each device class.
///
/// A known positive size scores `capacity / (capacity + size)`. A size of
/// zero is treated as unknown and scores 0.5. Efficiency keywords close 10%
/// of the remaining headroom; heavy keywords take 10% off. The value is the
/// mean over device classes and `breakdown` carries each class.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeMetric;

impl SizeMetric {
    pub fn device_scores(md: &core_api::PackageMetadata) -> BTreeMap<String, f64> {
        let size = md.f64("size").or_else(|| md.f64("size_bytes"));
        let doc = md.doc_text();
        if size.is_none() && doc.is_empty() {
            return DEVICE_CLASSES
                .iter()
                .map(|(name, _)| (name.to_string(), 0.0))
                .collect();
        }

        let efficient = has_any(&doc, EFFICIENT);
        let heavy = has_any(&doc, HEAVY);
        DEVICE_CLASSES
            .iter()
            .map(|(name, capacity)| {
                let mut s = match size {
                    Some(bytes) if bytes > 0.0 => capacity / (capacity + bytes),
                    _ => NEUTRAL,
                };
                if efficient {
                    s += 0.1 * (1.0 - s);
                }
                if heavy {
                    s *= 0.9;
                }
                (name.to_string(), s)
            })
            .collect()
    }
}

impl core_api::Metric for SizeMetric {
    fn name(&self) -> &'static str {
        "size_score"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let breakdown = Self::device_scores(md);
        let value = breakdown.values().sum::<f64>() / breakdown.len().max(1) as f64;
        core_api::MetricScore { value, breakdown }
    }
}

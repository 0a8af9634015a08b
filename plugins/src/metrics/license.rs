use lazy_static::lazy_static;
use regex::Regex;
use trustd_core::api as core_api;

use super::text::section;

lazy_static! {
    static ref AGPL: Regex = Regex::new(r"\bagpl|affero").unwrap();
    static ref LGPL: Regex = Regex::new(r"\blgpl|lesser general public").unwrap();
    static ref GPL: Regex = Regex::new(r"\bgpl|general public license").unwrap();
    static ref PERMISSIVE: Regex =
        Regex::new(r"\bmit\b|apache|\bbsd\b|bsd-[0-9]|\bisc\b|unlicense|\bcc0\b|\bzlib\b").unwrap();
    static ref MPL: Regex = Regex::new(r"\bmpl\b|mozilla public").unwrap();
}

/// Compatibility of the declared license with permissive redistribution.
///
/// Permissive (MIT, Apache-2.0, BSD, ISC, Unlicense) and LGPL score at least
/// 0.8, GPL/AGPL land in `[0.3, 0.6)`, an unrecognised license 0.2, none 0.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct LicenseMetric;

impl LicenseMetric {
    pub fn classify(text: &str) -> f64 {
        let t = text.to_lowercase();
        if AGPL.is_match(&t) {
            0.3
        } else if LGPL.is_match(&t) {
            0.8
        } else if GPL.is_match(&t) {
            0.5
        } else if PERMISSIVE.is_match(&t) {
            1.0
        } else if MPL.is_match(&t) {
            0.7
        } else {
            0.2
        }
    }
}

impl core_api::Metric for LicenseMetric {
    fn name(&self) -> &'static str {
        "license"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        if let Some(declared) = md.str("license") {
            return Self::classify(declared).into();
        }
        let doc = md.doc_text();
        if let Some(body) = section(&doc, &["license", "licence"]) {
            if !body.trim().is_empty() {
                return Self::classify(body).into();
            }
        }
        if doc.contains("license") || doc.contains("licence") {
            return Self::classify(&doc).into();
        }
        0.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn score(md: PackageMetadata) -> f64 {
        LicenseMetric.score(&md).value
    }

    #[test]
    fn declared_licenses() {
        let with = |l: &str| PackageMetadata::new().with("license", json!(l));
        assert_eq!(score(with("MIT")), 1.0);
        assert_eq!(score(with("Apache-2.0")), 1.0);
        assert_eq!(score(with("BSD-3-Clause")), 1.0);
        assert_eq!(score(with("LGPL-2.1")), 0.8);
        assert_eq!(score(with("GPL-3.0")), 0.5);
        assert_eq!(score(with("AGPL-3.0")), 0.3);
        assert_eq!(score(with("proprietary-eula")), 0.2);
    }

    #[test]
    fn copyleft_stays_in_band() {
        for l in ["GPL-3.0-only", "AGPL-3.0", "GNU General Public License v3"] {
            let v = score(PackageMetadata::new().with("license", json!(l)));
            assert!((0.3..0.6).contains(&v), "{l} -> {v}");
        }
    }

    #[test]
    fn falls_back_to_readme_section() {
        let md = PackageMetadata::new().with(
            "readme",
            json!("# tool\nsome intro\n## License\nReleased under the MIT license.\n"),
        );
        assert_eq!(score(md), 1.0);
    }

    #[test]
    fn mention_without_identifier() {
        let md = PackageMetadata::new().with("readme", json!("See the license file for terms."));
        assert_eq!(score(md), 0.2);
    }

    #[test]
    fn nothing_is_zero() {
        assert_eq!(score(PackageMetadata::new()), 0.0);
        assert_eq!(
            score(PackageMetadata::new().with("readme", json!("just a model"))),
            0.0
        );
    }
}

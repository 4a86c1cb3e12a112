//! Settings for one analysis run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnrichmentError, Result};
use crate::geneset::Normalization;
use crate::geneset::loader::LoadPolicy;
use crate::testing::{CorrectionMethod, TestMethod};

/// Analysis settings, all optional in the JSON form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Test used to score each term.
    pub method: TestMethod,
    /// Correction applied across the terms of each library.
    pub correction: CorrectionMethod,
    /// How gene tokens are normalized in every input.
    pub normalization: Normalization,
    /// Handling of malformed GMT lines.
    pub load_policy: LoadPolicy,
    /// Intersect term genes with the background before building tables.
    pub restrict_terms_to_background: bool,
    /// Number of rows shown per library; exports always contain every term.
    pub display_count: usize,
    /// Separator for the overlapping genes column in tabular output.
    pub overlap_delimiter: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            method: TestMethod::default(),
            correction: CorrectionMethod::default(),
            normalization: Normalization::default(),
            load_policy: LoadPolicy::default(),
            restrict_terms_to_background: true,
            display_count: 10,
            overlap_delimiter: String::from(";"),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EnrichmentError::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EnrichmentError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(AnalysisConfig::from_json("{}").unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = AnalysisConfig::from_json(
            r#"{"method": "chi_squared", "correction": "bonferroni", "display_count": 25}"#,
        )
        .unwrap();
        assert_eq!(config.method, TestMethod::ChiSquared);
        assert_eq!(config.correction, CorrectionMethod::Bonferroni);
        assert_eq!(config.display_count, 25);
        assert_eq!(config.overlap_delimiter, ";");
        assert!(config.restrict_terms_to_background);
    }

    #[test]
    fn unknown_method_is_a_config_error() {
        let err = AnalysisConfig::from_json(r#"{"method": "t_test"}"#).unwrap_err();
        assert!(matches!(err, EnrichmentError::Config(_)));
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainWarning;

pub mod contingency;
pub mod correction;
pub mod effect;
pub mod inference;

pub mod utils;

pub use contingency::{ContingencyTable, build_table};
pub use correction::{CorrectionMethod, correct};
pub use inference::score;

/// Test used to score each contingency table.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TestMethod {
    /// One-sided Fisher's exact test, P(X >= a) summed over the exact hypergeometric pmf.
    #[default]
    #[serde(alias = "fishers_exact")]
    #[strum(to_string = "fisher_exact", serialize = "fishers_exact")]
    #[value(alias = "fishers_exact")]
    FisherExact,
    /// Hypergeometric survival function at `a - 1`; the same tail as `FisherExact`.
    #[strum(to_string = "hypergeometric")]
    Hypergeometric,
    /// Pearson's chi-squared test with 1 df, Yates corrected for small expected counts.
    #[serde(alias = "chi2")]
    #[strum(to_string = "chi_squared", serialize = "chi2")]
    #[value(alias = "chi2")]
    ChiSquared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    TwoSided,
    Less,
    Greater,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// The test statistic value (odds ratio, observed overlap or chi-squared statistic)
    pub statistic: f64,
    /// The p-value of the test
    pub p_value: f64,
    /// Non-fatal warning about the reliability of the p-value
    pub warning: Option<DomainWarning>,
}

impl TestResult {
    /// Create a new test result with minimal information
    pub fn new(statistic: f64, p_value: f64) -> Self {
        TestResult {
            statistic,
            p_value: utils::clamp_probability(p_value),
            warning: None,
        }
    }

    /// Attach a non-fatal warning
    pub fn with_warning(mut self, warning: DomainWarning) -> Self {
        self.warning = Some(warning);
        self
    }
}

#[derive(Debug, Clone)]
pub struct MultipleTestResults {
    /// Test statistics for each term
    pub statistics: Vec<f64>,
    /// Raw (unadjusted) p-values
    pub p_values: Vec<f64>,
    /// Adjusted p-values (after multiple testing correction)
    pub adjusted_p_values: Option<Vec<f64>>,
    /// Per-term warnings
    pub warnings: Vec<Option<DomainWarning>>,
    /// Global metadata about the test
    pub global_metadata: HashMap<String, String>,
}

impl MultipleTestResults {
    /// Collect per-term results into one object
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let mut statistics = Vec::with_capacity(results.len());
        let mut p_values = Vec::with_capacity(results.len());
        let mut warnings = Vec::with_capacity(results.len());
        for r in results {
            statistics.push(r.statistic);
            p_values.push(r.p_value);
            warnings.push(r.warning);
        }
        MultipleTestResults {
            statistics,
            p_values,
            adjusted_p_values: None,
            warnings,
            global_metadata: HashMap::new(),
        }
    }

    /// Add adjusted p-values to the results
    pub fn with_adjusted_p_values(mut self, adjusted_p_values: Vec<f64>) -> Self {
        self.adjusted_p_values = Some(adjusted_p_values);
        self
    }

    /// Add global metadata about the test
    pub fn with_global_metadata(mut self, key: &str, value: &str) -> Self {
        self.global_metadata
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Get indices of significant terms at the given threshold
    pub fn significant_indices(&self, alpha: f64) -> Vec<usize> {
        let p_values = self.adjusted_p_values.as_ref().unwrap_or(&self.p_values);
        p_values
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| if p < alpha { Some(i) } else { None })
            .collect()
    }

    /// Get the number of significant terms at the given threshold
    pub fn num_significant(&self, alpha: f64) -> usize {
        self.significant_indices(alpha).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn method_names_parse() {
        assert_eq!(TestMethod::from_str("fisher_exact").unwrap(), TestMethod::FisherExact);
        assert_eq!(TestMethod::from_str("fishers_exact").unwrap(), TestMethod::FisherExact);
        assert_eq!(TestMethod::from_str("hypergeometric").unwrap(), TestMethod::Hypergeometric);
        assert_eq!(TestMethod::from_str("chi2").unwrap(), TestMethod::ChiSquared);
        assert_eq!(TestMethod::ChiSquared.to_string(), "chi_squared");
        assert!(TestMethod::from_str("t_test").is_err());
    }

    #[test]
    fn adjusted_values_drive_significance() {
        let results = MultipleTestResults::from_results(vec![
            TestResult::new(1.0, 0.01),
            TestResult::new(1.0, 0.04),
            TestResult::new(1.0, 0.5),
        ]);
        assert_eq!(results.num_significant(0.05), 2);
        let results = results.with_adjusted_p_values(vec![0.03, 0.06, 0.5]);
        assert_eq!(results.significant_indices(0.05), vec![0]);
    }

    #[test]
    fn p_values_are_clamped() {
        assert_eq!(TestResult::new(0.0, 1.0000000002).p_value, 1.0);
        assert_eq!(TestResult::new(0.0, -1e-18).p_value, 0.0);
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{EnrichmentError, Result};
use crate::testing::utils::ascending_order;

/// Multiple testing correction methods to control for false positives
/// when performing many statistical tests simultaneously.
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
pub enum CorrectionMethod {
    /// Benjamini-Hochberg false discovery rate
    #[default]
    #[serde(alias = "fdr_bh")]
    #[strum(to_string = "benjamini_hochberg", serialize = "fdr_bh", serialize = "bh")]
    #[value(alias = "fdr_bh", alias = "bh")]
    BenjaminiHochberg,
    /// Benjamini-Yekutieli false discovery rate under arbitrary dependence
    #[serde(alias = "fdr_by")]
    #[strum(to_string = "benjamini_yekutieli", serialize = "fdr_by", serialize = "by")]
    #[value(alias = "fdr_by", alias = "by")]
    BenjaminiYekutieli,
    /// Bonferroni family-wise error rate
    #[strum(to_string = "bonferroni")]
    Bonferroni,
    /// Holm step-down family-wise error rate
    #[strum(to_string = "holm")]
    Holm,
    /// Report raw p-values unchanged
    #[serde(rename = "none")]
    #[strum(to_string = "none")]
    #[value(name = "none")]
    NoCorrection,
}

/// Apply the selected correction to all p-values of one library in a single pass.
pub fn correct(p_values: &[f64], method: CorrectionMethod) -> Result<Vec<f64>> {
    match method {
        CorrectionMethod::BenjaminiHochberg => benjamini_hochberg_correction(p_values),
        CorrectionMethod::BenjaminiYekutieli => benjamini_yekutieli_correction(p_values),
        CorrectionMethod::Bonferroni => bonferroni_correction(p_values),
        CorrectionMethod::Holm => holm_bonferroni_correction(p_values),
        CorrectionMethod::NoCorrection => {
            validate_p_values(p_values)?;
            Ok(p_values.to_vec())
        }
    }
}

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(EnrichmentError::Domain(String::from("Empty p-value array")));
    }
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(EnrichmentError::Domain(format!(
                "Invalid p-value at index {}: {}",
                i, p
            )));
        }
    }
    Ok(())
}

/// Apply Bonferroni correction to p-values
///
/// Bonferroni correction is a simple but conservative method that multiplies
/// each p-value by the number of tests.
pub fn bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;

    // Multiply each p-value by n, capping at 1.0
    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Apply Benjamini-Hochberg (BH) procedure for controlling false discovery rate
///
/// The BH procedure controls the false discovery rate (FDR), which is the expected
/// proportion of false positives among all rejected null hypotheses.
pub fn benjamini_hochberg_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    Ok(step_up(p_values, 1.0))
}

/// Apply Benjamini-Yekutieli (BY) procedure for controlling false discovery rate under dependence
///
/// The BY procedure is a more conservative variant of the BH procedure that is valid
/// under arbitrary dependence structures among the tests.
pub fn benjamini_yekutieli_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let c_n: f64 = (1..=p_values.len()).map(|i| 1.0 / i as f64).sum();
    Ok(step_up(p_values, c_n))
}

/// Step-up adjustment `min_{j >= i} (factor * n * p_(j) / j)`, capped at 1.
fn step_up(p_values: &[f64], factor: f64) -> Vec<f64> {
    let n = p_values.len();
    let order = ascending_order(p_values);

    let mut adjusted_p_values = vec![0.0; n];
    let mut current_min = 1.0f64;

    // Process from largest to smallest p-value
    for (i, &orig_idx) in order.iter().enumerate().rev() {
        let rank = (i + 1) as f64;
        let adjustment = (p_values[orig_idx] * factor * n as f64 / rank).min(1.0);
        current_min = adjustment.min(current_min);
        adjusted_p_values[orig_idx] = current_min;
    }

    adjusted_p_values
}

/// Apply Holm-Bonferroni (step-down) method for controlling family-wise error rate
///
/// The Holm procedure is a step-down method that controls the family-wise error rate (FWER)
/// and is uniformly more powerful than the standard Bonferroni correction.
pub fn holm_bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    let order = ascending_order(p_values);

    let mut adjusted_p_values = vec![0.0; n];
    let mut current_max = 0.0f64;

    for (i, &orig_idx) in order.iter().enumerate() {
        let adjustment = (p_values[orig_idx] * (n - i) as f64).min(1.0);
        current_max = adjustment.max(current_max);
        adjusted_p_values[orig_idx] = current_max;
    }

    Ok(adjusted_p_values)
}

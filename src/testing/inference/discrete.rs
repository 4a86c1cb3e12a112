use statrs::distribution::{ChiSquared, ContinuousCDF, DiscreteCDF, Hypergeometric};
use statrs::function::factorial::ln_binomial;
use tracing::debug;

use crate::error::{DomainWarning, EnrichmentError, Result};
use crate::testing::effect::odds_ratio;
use crate::testing::utils::log_sum_exp;
use crate::testing::{Alternative, ContingencyTable, TestResult};

/// Relative tolerance used to decide which tables are "as extreme" in the two-sided test.
const TWO_SIDED_RELATIVE_TOLERANCE: f64 = 1e-7;

/// Performs Fisher's exact test on a 2x2 contingency table.
///
/// The p-value is summed directly over the hypergeometric pmf with margins `(a + b, c + d,
/// a + c)`, in log space. `Alternative::Greater` is the over-representation tail P(X >= a).
/// The statistic is the (Haldane-Anscombe corrected) sample odds ratio.
pub fn fisher_exact(table: &ContingencyTable, alternative: Alternative) -> TestResult {
    let population = table.background_size();
    let successes = table.term_size();
    let draws = table.input_size();
    let statistic = odds_ratio(table);

    if population == 0 {
        return TestResult::new(statistic, 1.0);
    }

    let ln_denominator = ln_binomial(population, draws);
    let ln_pmf = |x: u64| {
        ln_binomial(successes, x) + ln_binomial(population - successes, draws - x) - ln_denominator
    };

    let lower = (draws + successes).saturating_sub(population);
    let upper = draws.min(successes);
    let observed = table.a;

    // the tail covers the whole support
    let full_support = match alternative {
        Alternative::Greater => observed <= lower,
        Alternative::Less => observed >= upper,
        Alternative::TwoSided => false,
    };
    if full_support {
        return TestResult::new(statistic, 1.0);
    }

    let log_terms: Vec<f64> = match alternative {
        Alternative::Greater => (observed..=upper).map(ln_pmf).collect(),
        Alternative::Less => (lower..=observed).map(ln_pmf).collect(),
        Alternative::TwoSided => {
            let cutoff = ln_pmf(observed) + TWO_SIDED_RELATIVE_TOLERANCE.ln_1p();
            (lower..=upper)
                .map(ln_pmf)
                .filter(|&l| l <= cutoff)
                .collect()
        }
    };

    TestResult::new(statistic, log_sum_exp(&log_terms).exp())
}

/// Performs the one-sided hypergeometric test, P(X >= a) via the survival function.
///
/// Population is the background size, successes the term size and draws the input size. This
/// is the same tail probability as [`fisher_exact`] with `Alternative::Greater`, computed by
/// `statrs`. The statistic is the observed overlap.
pub fn hypergeometric_test(table: &ContingencyTable) -> Result<TestResult> {
    let observed = table.a;
    if observed == 0 {
        return Ok(TestResult::new(0.0, 1.0));
    }

    let dist = Hypergeometric::new(
        table.background_size(),
        table.term_size(),
        table.input_size(),
    )
    .map_err(|e| EnrichmentError::Domain(format!("invalid hypergeometric parameters: {}", e)))?;

    // sf(k) is P(X > k), so k = a - 1 gives P(X >= a)
    Ok(TestResult::new(observed as f64, dist.sf(observed - 1)))
}

/// Performs Pearson's chi-square test on a 2x2 contingency table, one-sided towards
/// over-representation.
///
/// The statistic is the usual 1 df Pearson statistic. Its upper tail is split by the sign of
/// `a - E[a]`: an overlap above expectation gets half the tail, an overlap at or below it gets
/// one minus half the tail, so depleted terms end up near 1. Yates' continuity correction is
/// applied when any expected count is below 5. A warning is attached when any expected count
/// is below 1 or when a margin is empty.
pub fn chi_square_test(table: &ContingencyTable) -> TestResult {
    let observed = table.observed();
    let expected = table.expected();

    let min_expected = expected.iter().copied().fold(f64::INFINITY, f64::min);
    if min_expected.is_nan() || min_expected <= 0.0 {
        return TestResult::new(0.0, 1.0).with_warning(DomainWarning::EmptyMargin);
    }

    let continuity = if min_expected < 5.0 { 0.5 } else { 0.0 };
    let chi_square: f64 = observed
        .iter()
        .zip(expected.iter())
        .map(|(&o, &e)| {
            let deviation = ((o - e).abs() - continuity).max(0.0);
            deviation * deviation / e
        })
        .sum();

    let two_sided = match ChiSquared::new(1.0) {
        Ok(dist) => dist.sf(chi_square),
        Err(_) => 1.0,
    };
    let p_value = if observed[0] > expected[0] {
        two_sided / 2.0
    } else {
        1.0 - two_sided / 2.0
    };

    let result = TestResult::new(chi_square, p_value);
    if min_expected < 1.0 {
        debug!(
            "chi-squared unreliable for table {:?}, min expected count {:.3}",
            table, min_expected
        );
        result.with_warning(DomainWarning::UnreliableApproximation { min_expected })
    } else {
        result
    }
}

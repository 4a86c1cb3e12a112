/// Clamp a probability into `[0, 1]`; NaN maps to 1.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 1.0 } else { p.clamp(0.0, 1.0) }
}

/// `ln(sum(exp(x)))` without overflow.
pub fn log_sum_exp(log_values: &[f64]) -> f64 {
    let max = log_values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = log_values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Sort `0..values.len()` ascending by value, NaN last.
pub fn ascending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn log_sum_exp_matches_direct_sum() {
        let values = [0.1f64, 0.2, 0.3];
        let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
        assert_relative_eq!(log_sum_exp(&logs).exp(), 0.6, epsilon = 1e-12);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn ascending_order_is_stable_for_ties() {
        assert_eq!(ascending_order(&[0.3, 0.1, 0.3, 0.2]), vec![1, 3, 0, 2]);
    }
}

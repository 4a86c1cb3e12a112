//! Ordering of enrichment results for display and export.

use std::cmp::Ordering;

use crate::enrichment::EnrichmentResult;

/// Adjusted p-value ascending, then overlap descending, then term name.
pub fn compare(a: &EnrichmentResult, b: &EnrichmentResult) -> Ordering {
    a.adjusted_p_value
        .total_cmp(&b.adjusted_p_value)
        .then_with(|| b.overlap.cmp(&a.overlap))
        .then_with(|| a.term.cmp(&b.term))
}

/// Sort results into their final order.
pub fn rank(mut results: Vec<EnrichmentResult>) -> Vec<EnrichmentResult> {
    results.sort_by(compare);
    results
}

/// The first `k` ranked results, or all of them if there are fewer.
pub fn top(results: &[EnrichmentResult], k: usize) -> &[EnrichmentResult] {
    &results[..k.min(results.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(term: &str, adjusted_p_value: f64, overlap: usize) -> EnrichmentResult {
        EnrichmentResult {
            library: String::from("lib"),
            term: term.to_owned(),
            description: String::new(),
            position: 0,
            overlap,
            term_size: 10,
            input_size: 5,
            background_size: 100,
            p_value: adjusted_p_value,
            adjusted_p_value,
            fold_enrichment: 1.0,
            odds_ratio: 1.0,
            overlap_genes: Vec::new(),
            warning: None,
        }
    }

    fn names(results: &[EnrichmentResult]) -> Vec<&str> {
        results.iter().map(|r| r.term.as_str()).collect()
    }

    #[test]
    fn ties_break_on_overlap_then_name() {
        let ranked = rank(vec![
            result("c", 0.01, 2),
            result("b", 0.01, 3),
            result("a", 0.01, 2),
            result("z", 0.001, 1),
        ]);
        assert_eq!(names(&ranked), vec!["z", "b", "a", "c"]);
    }

    #[test]
    fn ranking_ignores_input_order() {
        let items = vec![
            result("t1", 0.2, 1),
            result("t2", 0.05, 4),
            result("t3", 0.05, 4),
            result("t4", 1.0, 0),
            result("t5", 0.001, 2),
        ];
        let expected = names(&rank(items.clone()))
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let mut reversed = items.clone();
        reversed.reverse();
        let mut rotated = items;
        rotated.rotate_left(2);

        for permutation in [reversed, rotated] {
            assert_eq!(names(&rank(permutation)), expected);
        }
    }

    #[test]
    fn top_is_bounded() {
        let ranked = rank(vec![result("a", 0.1, 1), result("b", 0.2, 1)]);
        assert_eq!(top(&ranked, 1).len(), 1);
        assert_eq!(top(&ranked, 10).len(), 2);
        assert!(top(&[], 3).is_empty());
    }
}

use crate::testing::ContingencyTable;

/// Calculate fold enrichment: observed overlap fraction of the input over the term's share of
/// the background, `(a / n) / (K / N)`.
///
/// Returns 0 when the term or the input is empty.
pub fn fold_enrichment(table: &ContingencyTable) -> f64 {
    let input_size = table.input_size();
    let term_size = table.term_size();
    if input_size == 0 || term_size == 0 {
        return 0.0;
    }
    let observed = table.a as f64 / input_size as f64;
    let expected = term_size as f64 / table.background_size() as f64;
    observed / expected
}

/// Calculate the sample odds ratio `(a * d) / (b * c)`.
///
/// Tables with a zero cell get the Haldane-Anscombe correction (0.5 added to every cell), so
/// the result is always finite.
pub fn odds_ratio(table: &ContingencyTable) -> f64 {
    let [a, b, c, d] = table.observed();
    if a == 0.0 || b == 0.0 || c == 0.0 || d == 0.0 {
        ((a + 0.5) * (d + 0.5)) / ((b + 0.5) * (c + 0.5))
    } else {
        (a * d) / (b * c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fold_enrichment_of_full_overlap() {
        // 2 of 2 input genes in a term covering 4 of 10 background genes
        let table = ContingencyTable { a: 2, b: 0, c: 2, d: 6 };
        assert_relative_eq!(fold_enrichment(&table), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn fold_enrichment_of_empty_term_is_zero() {
        let table = ContingencyTable { a: 0, b: 3, c: 0, d: 7 };
        assert_eq!(fold_enrichment(&table), 0.0);
    }

    #[test]
    fn odds_ratio_plain_and_corrected() {
        let table = ContingencyTable { a: 4, b: 2, c: 1, d: 8 };
        assert_relative_eq!(odds_ratio(&table), 16.0, epsilon = 1e-12);

        let zero_cell = ContingencyTable { a: 2, b: 0, c: 2, d: 6 };
        assert_relative_eq!(odds_ratio(&zero_cell), (2.5 * 6.5) / (0.5 * 2.5), epsilon = 1e-12);
        assert!(odds_ratio(&zero_cell).is_finite());
    }
}

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::Result;
use crate::testing::{Alternative, ContingencyTable, MultipleTestResults, TestMethod, TestResult};

pub mod discrete;

/// Score one contingency table with the selected over-representation test.
pub fn score(table: &ContingencyTable, method: TestMethod) -> Result<TestResult> {
    match method {
        TestMethod::FisherExact => Ok(discrete::fisher_exact(table, Alternative::Greater)),
        TestMethod::Hypergeometric => discrete::hypergeometric_test(table),
        TestMethod::ChiSquared => Ok(discrete::chi_square_test(table)),
    }
}

/// Score many tables in parallel, keeping the input order.
pub fn score_all(tables: &[ContingencyTable], method: TestMethod) -> Result<MultipleTestResults> {
    let results = tables
        .par_iter()
        .map(|table| score(table, method))
        .collect::<Result<Vec<_>>>()?;

    Ok(MultipleTestResults::from_results(results)
        .with_global_metadata("test_type", &method.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fisher_and_hypergeometric_dispatch_to_same_tail() {
        let table = ContingencyTable { a: 3, b: 7, c: 17, d: 973 };
        let fisher = score(&table, TestMethod::FisherExact).unwrap();
        let hyper = score(&table, TestMethod::Hypergeometric).unwrap();
        assert_relative_eq!(fisher.p_value, hyper.p_value, epsilon = 1e-12, max_relative = 1e-9);
    }

    #[test]
    fn score_all_keeps_order() {
        let tables = vec![
            ContingencyTable { a: 0, b: 2, c: 2, d: 6 },
            ContingencyTable { a: 2, b: 0, c: 2, d: 6 },
        ];
        let results = score_all(&tables, TestMethod::FisherExact).unwrap();
        assert_eq!(results.p_values.len(), 2);
        assert!(results.p_values[0] > results.p_values[1]);
        assert_eq!(results.global_metadata["test_type"], "fisher_exact");
    }
}

//! 2x2 contingency tables for over-representation tests.
//!
//! ```text
//!                 in term   not in term
//! in input           a           b        | a + b = input size
//! not in input       c           d        | c + d
//!                 a + c        b + d       | N = background size
//! ```

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{EnrichmentError, Result};
use crate::geneset::Gene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    /// Build a table from the overlap and the three set sizes.
    pub fn from_counts(
        overlap: usize,
        input_size: usize,
        term_size: usize,
        background_size: usize,
    ) -> Result<Self> {
        if term_size > background_size {
            return Err(EnrichmentError::Domain(format!(
                "term size {} exceeds background size {}",
                term_size, background_size
            )));
        }
        if input_size > background_size {
            return Err(EnrichmentError::Domain(format!(
                "input size {} exceeds background size {}",
                input_size, background_size
            )));
        }
        if overlap > input_size.min(term_size) {
            return Err(EnrichmentError::Domain(format!(
                "overlap {} exceeds min(input size {}, term size {})",
                overlap, input_size, term_size
            )));
        }
        // d = N - n - K + a, computed without going negative
        let d = (background_size + overlap)
            .checked_sub(input_size + term_size)
            .ok_or_else(|| {
                EnrichmentError::Domain(format!(
                    "input ({}) and term ({}) sharing {} genes do not fit into a background of {}",
                    input_size, term_size, overlap, background_size
                ))
            })?;

        Ok(ContingencyTable {
            a: overlap as u64,
            b: (input_size - overlap) as u64,
            c: (term_size - overlap) as u64,
            d: d as u64,
        })
    }

    pub fn overlap(&self) -> u64 {
        self.a
    }

    pub fn input_size(&self) -> u64 {
        self.a + self.b
    }

    pub fn term_size(&self) -> u64 {
        self.a + self.c
    }

    pub fn background_size(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// Expected counts under independence, in `[a, b, c, d]` order.
    pub fn expected(&self) -> [f64; 4] {
        let n = self.background_size() as f64;
        if n == 0.0 {
            return [0.0; 4];
        }
        let row1 = (self.a + self.b) as f64;
        let row2 = (self.c + self.d) as f64;
        let col1 = (self.a + self.c) as f64;
        let col2 = (self.b + self.d) as f64;
        [
            row1 * col1 / n,
            row1 * col2 / n,
            row2 * col1 / n,
            row2 * col2 / n,
        ]
    }

    pub fn observed(&self) -> [f64; 4] {
        [self.a as f64, self.b as f64, self.c as f64, self.d as f64]
    }
}

/// Genes shared by a term and the input, in sorted order.
pub fn overlapping_genes<'a>(term: &'a BTreeSet<Gene>, input: &BTreeSet<Gene>) -> Vec<&'a Gene> {
    term.iter().filter(|g| input.contains(*g)).collect()
}

/// Build the table for one term against the (already validated) input.
pub fn build_table(
    term_genes: &BTreeSet<Gene>,
    input_genes: &BTreeSet<Gene>,
    background_size: usize,
) -> Result<ContingencyTable> {
    let overlap = overlapping_genes(term_genes, input_genes).len();
    ContingencyTable::from_counts(
        overlap,
        input_genes.len(),
        term_genes.len(),
        background_size,
    )
}

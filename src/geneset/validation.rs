use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EnrichmentError, Result};
use crate::geneset::{Background, Gene, GeneSet, InputSet, Normalization};

/// What happened to the raw input while it was cleaned.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Non-empty tokens seen in the raw text.
    pub total_tokens: usize,
    /// Number of repeated tokens dropped.
    pub duplicates_removed: usize,
    /// Genes that appeared more than once.
    pub duplicates: BTreeSet<Gene>,
    /// Number of unique genes found in the background.
    pub present_in_background: usize,
    /// Unique genes missing from the background, excluded from the analysis.
    pub absent_from_background: BTreeSet<Gene>,
}

impl Diagnostics {
    /// One-line summary for display, e.g. `34 genes, 2 duplicates, 1 not in background`.
    pub fn summary(&self) -> String {
        let mut out = format!("{} genes", self.present_in_background);
        if self.duplicates_removed > 0 {
            out.push_str(&format!(", {} duplicates", self.duplicates_removed));
        }
        if !self.absent_from_background.is_empty() {
            out.push_str(&format!(
                ", {} not in background",
                self.absent_from_background.len()
            ));
        }
        out
    }
}

/// Clean a raw whitespace/newline separated gene list against a background.
///
/// Duplicates collapse and genes outside the background are dropped from the returned set;
/// both are reported in the [`Diagnostics`]. Fails only if no gene survives.
pub fn validate(
    raw_input: &str,
    background: &Background,
    normalization: Normalization,
) -> Result<(InputSet, Diagnostics)> {
    let mut diagnostics = Diagnostics::default();
    let mut seen = BTreeSet::new();

    for gene in raw_input
        .split_whitespace()
        .filter_map(|t| Gene::normalize(t, normalization))
    {
        diagnostics.total_tokens += 1;
        if seen.contains(&gene) {
            diagnostics.duplicates_removed += 1;
            diagnostics.duplicates.insert(gene);
        } else {
            seen.insert(gene);
        }
    }

    let mut cleaned = GeneSet::new("input");
    for gene in seen {
        if background.has_gene(gene.as_str()) {
            cleaned.insert(gene);
        } else {
            diagnostics.absent_from_background.insert(gene);
        }
    }
    diagnostics.present_in_background = cleaned.len();

    if !diagnostics.absent_from_background.is_empty() {
        warn!(
            "{} input genes are not in background {}",
            diagnostics.absent_from_background.len(),
            background.name()
        );
    }
    debug!("input validation: {}", diagnostics.summary());

    if cleaned.is_empty() {
        return Err(EnrichmentError::Validation(format!(
            "no genes left after cleaning ({} tokens, {} not in background {})",
            diagnostics.total_tokens,
            diagnostics.absent_from_background.len(),
            background.name()
        )));
    }

    Ok((cleaned, diagnostics))
}

//! Over-representation analysis of an input gene set against GMT libraries.
//!
//! Each library is processed independently: every term gets a contingency table and a raw
//! p-value, then the library's p-values are corrected together and the results ranked.
//! Libraries are processed in parallel, and so are the terms within a library; correction
//! only starts once every raw p-value of that library is available.
//!
//! ## Quick Example
//!
//! ```rust
//! use single_enrichment::config::AnalysisConfig;
//! use single_enrichment::enrichment::analyze;
//! use single_enrichment::geneset::{load_background, load_library, loader::LoadPolicy, Normalization};
//!
//! let background = load_background("A\nB\nC\nD\nE\nF\nG\nH\nI\nJ\n".as_bytes(), "bg", Normalization::Uppercase).unwrap();
//! let library = load_library("TERM\tdesc\tA\tB\tC\tD\n".as_bytes(), "lib", Normalization::Uppercase, LoadPolicy::Strict).unwrap();
//!
//! let run = analyze("a\nb\nx\ny\n", "input", &background, &[library], &AnalysisConfig::default()).unwrap();
//! assert_eq!(run.libraries[0].results[0].overlap, 2);
//! ```

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::error::{DomainWarning, EnrichmentError, Result};
use crate::geneset::{Background, Diagnostics, Gene, InputSet, Library, Term, validate};
use crate::testing::contingency::overlapping_genes;
use crate::testing::effect::{fold_enrichment, odds_ratio};
use crate::testing::inference::score_all;
use crate::testing::{ContingencyTable, CorrectionMethod, TestMethod, correct};

pub mod ranking;

pub use ranking::{rank, top};

/// Significance threshold used for the per-library log summary.
const SUMMARY_ALPHA: f64 = 0.05;

/// Result for one (library, term) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentResult {
    pub library: String,
    pub term: String,
    pub description: String,
    /// Zero-based position of the term in its library.
    pub position: usize,
    pub overlap: usize,
    pub term_size: usize,
    pub input_size: usize,
    pub background_size: usize,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub fold_enrichment: f64,
    pub odds_ratio: f64,
    /// Genes shared by the input and the term, sorted.
    pub overlap_genes: Vec<Gene>,
    pub warning: Option<DomainWarning>,
}

/// Ranked results of one library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryEnrichment {
    pub library: String,
    pub organism: String,
    pub method: TestMethod,
    pub correction: CorrectionMethod,
    pub results: Vec<EnrichmentResult>,
}

impl LibraryEnrichment {
    /// The first `k` results for display.
    pub fn top(&self, k: usize) -> &[EnrichmentResult] {
        top(&self.results, k)
    }

    pub fn num_significant(&self, alpha: f64) -> usize {
        self.results
            .iter()
            .filter(|r| r.adjusted_p_value < alpha)
            .count()
    }
}

/// A complete analysis: one validated input against one background and several libraries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input: InputSet,
    pub diagnostics: Diagnostics,
    pub background: String,
    pub background_size: usize,
    pub method: TestMethod,
    pub correction: CorrectionMethod,
    pub libraries: Vec<LibraryEnrichment>,
}

impl AnalysisRun {
    /// Total number of results over all libraries.
    pub fn num_results(&self) -> usize {
        self.libraries.iter().map(|l| l.results.len()).sum()
    }
}

/// Validate raw input text and run the analysis over all libraries.
pub fn analyze(
    raw_input: &str,
    input_name: &str,
    background: &Background,
    libraries: &[Library],
    config: &AnalysisConfig,
) -> Result<AnalysisRun> {
    let (mut input, diagnostics) = validate(raw_input, background, config.normalization)?;
    input.name = input_name.to_owned();
    run_analysis(input, diagnostics, background, libraries, config)
}

/// Run the analysis for an already validated input.
pub fn run_analysis(
    input: InputSet,
    diagnostics: Diagnostics,
    background: &Background,
    libraries: &[Library],
    config: &AnalysisConfig,
) -> Result<AnalysisRun> {
    if input.is_empty() {
        return Err(EnrichmentError::Validation(String::from("input gene set is empty")));
    }
    if let Some(gene) = input.iter().find(|g| !background.has_gene(g.as_str())) {
        return Err(EnrichmentError::Validation(format!(
            "gene {} is not in background {}, validate the input first",
            gene,
            background.name()
        )));
    }

    let before = Instant::now();
    let results = libraries
        .par_iter()
        .map(|library| enrich_library(&input, background, library, config))
        .collect::<Result<Vec<_>>>()?;

    let run = AnalysisRun {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        input,
        diagnostics,
        background: background.name().to_owned(),
        background_size: background.size(),
        method: config.method,
        correction: config.correction,
        libraries: results,
    };
    info!(
        "analysis {} done: {} libraries, {} terms in {:?}",
        run.id,
        run.libraries.len(),
        run.num_results(),
        before.elapsed()
    );
    Ok(run)
}

/// Score, correct and rank every term of one library.
pub fn enrich_library(
    input: &InputSet,
    background: &Background,
    library: &Library,
    config: &AnalysisConfig,
) -> Result<LibraryEnrichment> {
    let before = Instant::now();
    let background_size = background.size();

    let tables = library
        .terms()
        .par_iter()
        .map(|term| {
            let genes = term_genes(term, background, config.restrict_terms_to_background);
            let overlap: Vec<Gene> = overlapping_genes(&genes, input.genes())
                .into_iter()
                .cloned()
                .collect();
            ContingencyTable::from_counts(overlap.len(), input.len(), genes.len(), background_size)
                .map(|table| (table, overlap))
                .map_err(|e| match e {
                    EnrichmentError::Domain(msg) => EnrichmentError::Domain(format!(
                        "library {}, term {}: {}",
                        library.name, term.name, msg
                    )),
                    other => other,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let (tables, overlaps): (Vec<ContingencyTable>, Vec<Vec<Gene>>) = tables.into_iter().unzip();

    let scores = score_all(&tables, config.method)?;
    // all raw p-values are in, correct them in one pass
    let adjusted = correct(&scores.p_values, config.correction)?;
    let scores = scores
        .with_adjusted_p_values(adjusted)
        .with_global_metadata("correction", &config.correction.to_string());

    let adjusted = scores.adjusted_p_values.as_deref().unwrap_or(&scores.p_values);
    let results: Vec<EnrichmentResult> = library
        .terms()
        .iter()
        .zip(tables.iter())
        .zip(overlaps)
        .enumerate()
        .map(|(position, ((term, table), overlap_genes))| EnrichmentResult {
            library: library.name.clone(),
            term: term.name.clone(),
            description: term.description.clone(),
            position,
            overlap: table.a as usize,
            term_size: table.term_size() as usize,
            input_size: table.input_size() as usize,
            background_size,
            p_value: scores.p_values[position],
            adjusted_p_value: adjusted[position].max(scores.p_values[position]),
            fold_enrichment: fold_enrichment(table),
            odds_ratio: odds_ratio(table),
            overlap_genes,
            warning: scores.warnings[position],
        })
        .collect();

    let warned = results.iter().filter(|r| r.warning.is_some()).count();
    if warned > 0 {
        debug!(
            "library {}: {} terms carry statistical warnings",
            library.name, warned
        );
    }
    info!(
        "library {}: {} terms, {} with adjusted p < {} ({} / {}) in {:?}",
        library.name,
        results.len(),
        scores.num_significant(SUMMARY_ALPHA),
        SUMMARY_ALPHA,
        config.method,
        config.correction,
        before.elapsed()
    );

    Ok(LibraryEnrichment {
        library: library.name.clone(),
        organism: library.organism.clone(),
        method: config.method,
        correction: config.correction,
        results: rank(results),
    })
}

fn term_genes<'a>(term: &'a Term, background: &Background, restrict: bool) -> Cow<'a, BTreeSet<Gene>> {
    if restrict {
        Cow::Owned(
            term.genes
                .iter()
                .filter(|g| background.has_gene(g.as_str()))
                .cloned()
                .collect(),
        )
    } else {
        Cow::Borrowed(&term.genes)
    }
}

//! # single-enrichment
//!
//! Gene set over-representation analysis (ORA), part of the single-rust ecosystem.
//!
//! Given a list of genes of interest, a background universe and one or more GMT term libraries,
//! this crate tests every term for over-representation of the input genes with a 2x2
//! contingency table, corrects the p-values per library and ranks the results.
//!
//! ## Core Features
//!
//! - **Loading**: background lists, GMT libraries (strict or lenient) and alias maps
//! - **Validation**: normalization, duplicate collapsing and background filtering with diagnostics
//! - **Statistical Tests**: Fisher's exact test, hypergeometric tail and Pearson's chi-squared
//! - **Multiple Testing Correction**: Benjamini-Hochberg, Benjamini-Yekutieli, Bonferroni and Holm
//! - **Export**: per-library TSV/JSON and a consolidated TSV
//!
//! ## Quick Start
//!
//! Load a background and libraries with [`geneset::loader`], then call
//! [`enrichment::analyze`] with the raw input text. The returned [`enrichment::AnalysisRun`]
//! holds ranked results for each library and can be written out with [`export::write_run`].
//!
//! ## Module Organization
//!
//! - **[`geneset`]**: genes, gene sets, backgrounds, libraries, loading and validation
//! - **[`testing`]**: contingency tables, statistical tests, effect sizes and correction
//! - **[`enrichment`]**: the analysis driver and result ranking
//! - **[`export`]**: TSV and JSON serialization
//! - **[`config`]**: analysis settings

pub mod config;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod geneset;
pub mod testing;

pub use config::AnalysisConfig;
pub use enrichment::{AnalysisRun, EnrichmentResult, LibraryEnrichment, analyze, run_analysis};
pub use error::{DomainWarning, EnrichmentError, Result};
pub use geneset::{AliasMap, Background, Gene, GeneSet, InputSet, Library, Normalization, Term};
pub use testing::{CorrectionMethod, TestMethod};

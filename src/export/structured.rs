use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::enrichment::{AnalysisRun, EnrichmentResult, LibraryEnrichment};
use crate::error::Result;
use crate::export::ExportOptions;
use crate::geneset::Diagnostics;
use crate::testing::{CorrectionMethod, TestMethod};

#[derive(Serialize)]
struct LibraryDocument<'a> {
    run_id: Uuid,
    created_at: DateTime<Utc>,
    method: TestMethod,
    correction: CorrectionMethod,
    background: &'a str,
    background_size: usize,
    library: &'a str,
    organism: &'a str,
    input: &'a str,
    diagnostics: &'a Diagnostics,
    results: Vec<ResultEntry<'a>>,
}

#[derive(Serialize)]
struct ResultEntry<'a> {
    rank: usize,
    #[serde(flatten)]
    result: &'a EnrichmentResult,
    /// Display labels of the overlapping genes, only with an alias map.
    #[serde(skip_serializing_if = "Option::is_none")]
    overlap_labels: Option<Vec<&'a str>>,
}

/// One library as a pretty printed JSON document carrying the run metadata.
pub fn library_json(
    run: &AnalysisRun,
    library: &LibraryEnrichment,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let results = library
        .results
        .iter()
        .enumerate()
        .map(|(i, result)| ResultEntry {
            rank: i + 1,
            result,
            overlap_labels: options.aliases.map(|_| options.overlap_labels(result)),
        })
        .collect();

    let document = LibraryDocument {
        run_id: run.id,
        created_at: run.created_at,
        method: library.method,
        correction: library.correction,
        background: &run.background,
        background_size: run.background_size,
        library: &library.library,
        organism: &library.organism,
        input: &run.input.name,
        diagnostics: &run.diagnostics,
        results,
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

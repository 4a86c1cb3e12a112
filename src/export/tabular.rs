use csv::{QuoteStyle, WriterBuilder};

use crate::enrichment::{AnalysisRun, EnrichmentResult, LibraryEnrichment};
use crate::error::{EnrichmentError, Result};
use crate::export::ExportOptions;

const HEADER: [&str; 13] = [
    "rank",
    "term",
    "description",
    "overlap",
    "term_size",
    "input_size",
    "background_size",
    "p_value",
    "adjusted_p_value",
    "fold_enrichment",
    "odds_ratio",
    "overlap_genes",
    "warning",
];

/// One library as TSV, in ranked order.
pub fn library_tsv(library: &LibraryEnrichment, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut writer = tsv_writer();
    writer.write_record(HEADER)?;
    for (i, result) in library.results.iter().enumerate() {
        writer.write_record(fields(i + 1, result, options))?;
    }
    finish(writer)
}

/// Every library of a run in one TSV with a leading `library` column.
pub fn consolidated_tsv(run: &AnalysisRun, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut writer = tsv_writer();
    writer.write_record(std::iter::once("library").chain(HEADER))?;
    for library in &run.libraries {
        for (i, result) in library.results.iter().enumerate() {
            let mut record = vec![library.library.clone()];
            record.extend(fields(i + 1, result, options));
            writer.write_record(&record)?;
        }
    }
    finish(writer)
}

fn tsv_writer() -> csv::Writer<Vec<u8>> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| EnrichmentError::Serialize(e.to_string()))
}

fn fields(rank: usize, result: &EnrichmentResult, options: &ExportOptions) -> Vec<String> {
    vec![
        rank.to_string(),
        result.term.clone(),
        result.description.clone(),
        result.overlap.to_string(),
        result.term_size.to_string(),
        result.input_size.to_string(),
        result.background_size.to_string(),
        result.p_value.to_string(),
        result.adjusted_p_value.to_string(),
        result.fold_enrichment.to_string(),
        result.odds_ratio.to_string(),
        options.overlap_labels(result).join(options.overlap_delimiter),
        result
            .warning
            .map(|w| w.to_string())
            .unwrap_or_default(),
    ]
}

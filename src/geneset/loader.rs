use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EnrichmentError, Result};
use crate::geneset::{AliasMap, Background, Gene, GeneSet, Library, Normalization, RejectedLine, Term};

/// What to do with a malformed GMT line.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadPolicy {
    /// Record the line as rejected and keep loading the other terms.
    #[default]
    Lenient,
    /// Abort the whole load on the first malformed line.
    Strict,
}

/// Load a background universe, one gene per line.
pub fn load_background<R: Read>(
    reader: R,
    name: &str,
    normalization: Normalization,
) -> Result<Background> {
    let content = read_text(reader, name)?;
    let genes = GeneSet::from_tokens(name, content.lines(), normalization);

    if genes.duplicates() > 0 {
        warn!(
            "background {}: collapsed {} duplicate genes",
            name,
            genes.duplicates()
        );
    }
    if genes.is_empty() {
        warn!("background {} is empty", name);
    }
    info!("loaded background {} with {} genes", name, genes.len());

    Ok(Background::new(genes))
}

/// Load a background from disk, naming it after the file stem.
pub fn load_background_file(path: &Path, normalization: Normalization) -> Result<Background> {
    let file = std::fs::File::open(path)?;
    load_background(file, &stem_of(path), normalization)
}

/// Load a GMT library: `term <TAB> description <TAB> gene1 <TAB> gene2 ...`.
pub fn load_library<R: Read>(
    reader: R,
    name: &str,
    normalization: Normalization,
    policy: LoadPolicy,
) -> Result<Library> {
    let content = read_text(reader, name)?;

    let mut terms = Vec::new();
    let mut rejected = Vec::new();
    let mut seen_names = HashSet::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_gmt_line(line, line_no, name, normalization) {
            Ok(term) => {
                if !seen_names.insert(term.name.clone()) {
                    warn!("{}:{} repeated term name {}", name, line_no, term.name);
                }
                terms.push(term);
            }
            Err(err) => match policy {
                LoadPolicy::Strict => return Err(err),
                LoadPolicy::Lenient => {
                    warn!("skipping GMT line: {}", err);
                    let reason = match err {
                        EnrichmentError::Format { message, .. } => message,
                        other => other.to_string(),
                    };
                    rejected.push(RejectedLine {
                        line: line_no,
                        reason,
                    });
                }
            },
        }
    }

    if terms.is_empty() {
        let (line, message) = match rejected.first() {
            Some(r) => (r.line, format!("no valid terms ({})", r.reason)),
            None => (0, String::from("no terms found")),
        };
        return Err(EnrichmentError::format(name, line, message));
    }

    info!(
        "loaded library {} with {} terms ({} rejected lines)",
        name,
        terms.len(),
        rejected.len()
    );
    Ok(Library::new(name, terms).with_rejected(rejected))
}

/// Load a GMT library from disk, naming it after the file stem.
pub fn load_library_file(
    path: &Path,
    normalization: Normalization,
    policy: LoadPolicy,
) -> Result<Library> {
    let file = std::fs::File::open(path)?;
    load_library(file, &stem_of(path), normalization, policy)
}

/// Load an alias mapping stored as a flat JSON object.
pub fn load_aliases<R: Read>(reader: R, source_name: &str) -> Result<AliasMap> {
    let aliases: AliasMap = serde_json::from_reader(reader).map_err(|e| {
        EnrichmentError::format(source_name, e.line(), format!("invalid alias JSON: {}", e))
    })?;
    debug!("loaded {} aliases from {}", aliases.len(), source_name);
    Ok(aliases)
}

fn parse_gmt_line(
    line: &str,
    line_no: usize,
    source: &str,
    normalization: Normalization,
) -> Result<Term> {
    let mut fields = line.split('\t');
    let name = fields.next().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(EnrichmentError::format(source, line_no, "empty term name"));
    }
    let description = fields
        .next()
        .ok_or_else(|| EnrichmentError::format(source, line_no, "missing description field"))?
        .trim();

    let mut genes = BTreeSet::new();
    let mut repeated = 0usize;
    for gene in fields.filter_map(|f| Gene::normalize(f, normalization)) {
        if !genes.insert(gene) {
            repeated += 1;
        }
    }
    if genes.is_empty() {
        return Err(EnrichmentError::format(
            source,
            line_no,
            format!("term {} lists no genes", name),
        ));
    }
    if repeated > 0 {
        debug!("{}:{} term {} collapsed {} repeated genes", source, line_no, name, repeated);
    }

    Ok(Term {
        name: name.to_owned(),
        description: description.to_owned(),
        genes,
    })
}

fn read_text<R: Read>(mut reader: R, source: &str) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| {
        let valid = e.utf8_error().valid_up_to();
        let line = e.as_bytes()[..valid].iter().filter(|&&b| b == b'\n').count() + 1;
        EnrichmentError::format(source, line, "input is not valid UTF-8 text")
    })
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

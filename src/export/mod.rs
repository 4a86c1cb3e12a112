//! Serialization of ranked results to TSV and JSON.
//!
//! Export never touches the in-memory run. [`write_run`] refuses to overwrite existing files.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::enrichment::{AnalysisRun, EnrichmentResult, LibraryEnrichment};
use crate::error::{EnrichmentError, Result};
use crate::geneset::AliasMap;

pub mod structured;
pub mod tabular;

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

/// Presentation settings shared by all exporters.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions<'a> {
    pub overlap_delimiter: &'a str,
    pub aliases: Option<&'a AliasMap>,
}

impl<'a> ExportOptions<'a> {
    pub fn new(config: &'a AnalysisConfig, aliases: Option<&'a AliasMap>) -> Self {
        ExportOptions {
            overlap_delimiter: &config.overlap_delimiter,
            aliases,
        }
    }

    /// Overlapping genes of a result, resolved through the alias map if there is one.
    pub fn overlap_labels<'r>(&self, result: &'r EnrichmentResult) -> Vec<&'r str>
    where
        'a: 'r,
    {
        result
            .overlap_genes
            .iter()
            .map(|g| match self.aliases {
                Some(aliases) => aliases.resolve(g.as_str()),
                None => g.as_str(),
            })
            .collect()
    }
}

impl Default for ExportOptions<'_> {
    fn default() -> Self {
        ExportOptions {
            overlap_delimiter: ";",
            aliases: None,
        }
    }
}

/// Serialize the results of one library.
pub fn export_library(
    run: &AnalysisRun,
    library: &LibraryEnrichment,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Tsv => tabular::library_tsv(library, options),
        ExportFormat::Json => structured::library_json(run, library, options),
    }
}

/// All libraries of a run in one TSV.
pub fn export_consolidated(run: &AnalysisRun, options: &ExportOptions) -> Result<Vec<u8>> {
    tabular::consolidated_tsv(run, options)
}

/// Write every library as TSV and JSON plus the consolidated TSV into `out_dir`.
///
/// Files are named `<run id>_<library>.<ext>` and `<run id>_consolidated.tsv`. Library names
/// that repeat within the run, or clash after being made file safe, get a `_2`, `_3`, ...
/// suffix. Everything is serialized before the first file is created, and if any write fails
/// the files already written for this run are removed again. Returns the written paths in the
/// order they were created.
pub fn write_run(run: &AnalysisRun, out_dir: &Path, options: &ExportOptions) -> Result<Vec<PathBuf>> {
    let mut used = HashSet::from([String::from("consolidated")]);
    let mut files = Vec::with_capacity(2 * run.libraries.len() + 1);
    for library in &run.libraries {
        let stem = unique_stem(&library.library, &mut used);
        for format in [ExportFormat::Tsv, ExportFormat::Json] {
            let path = out_dir.join(format!("{}_{}.{}", run.id, stem, format.extension()));
            files.push((path, export_library(run, library, format, options)?));
        }
    }
    files.push((
        out_dir.join(format!("{}_consolidated.tsv", run.id)),
        export_consolidated(run, options)?,
    ));

    std::fs::create_dir_all(out_dir).map_err(|source| EnrichmentError::Export {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        if let Err(err) = write_new(&path, &bytes) {
            warn!(
                "export of run {} failed, removing {} files already written",
                run.id,
                written.len()
            );
            for done in &written {
                remove_quietly(done);
            }
            return Err(err);
        }
        written.push(path);
    }

    info!("wrote {} files to {}", written.len(), out_dir.display());
    Ok(written)
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let export_error = |source: std::io::Error| EnrichmentError::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(export_error)?;
    if let Err(source) = file.write_all(bytes).and_then(|_| file.flush()) {
        drop(file);
        remove_quietly(path);
        return Err(export_error(source));
    }
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("could not remove partial export {}: {}", path.display(), e);
    }
}

fn unique_stem(name: &str, used: &mut HashSet<String>) -> String {
    let base = file_safe(name);
    let mut stem = base.clone();
    let mut n = 2;
    while !used.insert(stem.clone()) {
        stem = format!("{}_{}", base, n);
        n += 1;
    }
    stem
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::analyze;
    use crate::geneset::loader::{LoadPolicy, load_background, load_library};
    use crate::geneset::{Library, Normalization};
    use pretty_assertions::assert_eq;

    fn run_with(libraries: &[(&str, &str)]) -> AnalysisRun {
        let bg = load_background(
            "A\nB\nC\nD\nE\nF\nG\nH\nI\nJ\n".as_bytes(),
            "bg",
            Normalization::Uppercase,
        )
        .unwrap();
        let libraries: Vec<Library> = libraries
            .iter()
            .map(|(name, gmt)| {
                load_library(gmt.as_bytes(), name, Normalization::Uppercase, LoadPolicy::Strict)
                    .unwrap()
            })
            .collect();
        analyze("A\nB\n", "input", &bg, &libraries, &AnalysisConfig::default()).unwrap()
    }

    fn run() -> AnalysisRun {
        run_with(&[
            ("lib_one", "T1\tfirst\tA\tB\tC\tD\nT2\tsecond\tE\tF\n"),
            ("lib/two", "T3\tthird\tA\tJ\n"),
        ])
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn library_tsv_has_header_and_ranked_rows() {
        let run = run();
        let bytes = export_library(
            &run,
            &run.libraries[0],
            ExportFormat::Tsv,
            &ExportOptions::default(),
        )
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rank\tterm\tdescription\toverlap"));
        let first: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(first[0], "1");
        assert_eq!(first[1], "T1");
        assert_eq!(first[11], "A;B");
    }

    #[test]
    fn aliases_apply_to_overlap_column() {
        let run = run();
        let mut aliases = AliasMap::new();
        aliases.insert("A", "alpha");
        let options = ExportOptions {
            overlap_delimiter: ",",
            aliases: Some(&aliases),
        };
        let text =
            String::from_utf8(tabular::library_tsv(&run.libraries[0], &options).unwrap()).unwrap();
        assert!(text.contains("\talpha,B\t"));
    }

    #[test]
    fn json_carries_run_metadata() {
        let run = run();
        let bytes = export_library(
            &run,
            &run.libraries[0],
            ExportFormat::Json,
            &ExportOptions::default(),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["run_id"], run.id.to_string());
        assert_eq!(value["library"], "lib_one");
        assert_eq!(value["method"], "fisher_exact");
        assert_eq!(value["correction"], "benjamini_hochberg");
        assert_eq!(value["results"][0]["rank"], 1);
        assert_eq!(value["results"][0]["term"], "T1");
        assert!(value["results"][0].get("overlap_labels").is_none());
    }

    #[test]
    fn consolidated_rows_sum_over_libraries() {
        let run = run();
        let text =
            String::from_utf8(export_consolidated(&run, &ExportOptions::default()).unwrap())
                .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len() - 1, run.num_results());
        assert!(lines[0].starts_with("library\trank\tterm"));
        assert!(lines.iter().skip(1).any(|l| l.starts_with("lib/two\t")));
    }

    #[test]
    fn write_run_never_overwrites() {
        let run = run();
        let dir = tempfile::tempdir().unwrap();

        let written = write_run(&run, dir.path(), &ExportOptions::default()).unwrap();
        assert_eq!(written.len(), 5);
        assert!(written.iter().all(|p| p.exists()));
        assert!(
            written
                .iter()
                .any(|p| p.ends_with(format!("{}_lib_two.json", run.id)))
        );

        let err = write_run(&run, dir.path(), &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, EnrichmentError::Export { .. }));
        // the first run's files are still there, untouched
        assert_eq!(file_names(dir.path()).len(), 5);
    }

    #[test]
    fn repeated_library_names_get_distinct_files() {
        let run = run_with(&[
            ("go", "T1\tfirst\tA\tB\n"),
            ("go", "T2\tsecond\tA\tC\n"),
            ("lib/two", "T3\tthird\tB\tC\n"),
            ("lib_two", "T4\tfourth\tA\tD\n"),
            ("consolidated", "T5\tfifth\tB\tD\n"),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let written = write_run(&run, dir.path(), &ExportOptions::default()).unwrap();
        assert_eq!(written.len(), 11);

        let id = run.id;
        let expected: Vec<String> = {
            let mut names = vec![format!("{}_consolidated.tsv", id)];
            for stem in ["go", "go_2", "lib_two", "lib_two_2", "consolidated_2"] {
                names.push(format!("{}_{}.tsv", id, stem));
                names.push(format!("{}_{}.json", id, stem));
            }
            names.sort();
            names
        };
        assert_eq!(file_names(dir.path()), expected);
    }

    #[test]
    fn failed_export_leaves_no_partial_run() {
        let run = run();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join(format!("{}_consolidated.tsv", run.id));
        std::fs::write(&blocker, "keep me").unwrap();

        let err = write_run(&run, dir.path(), &ExportOptions::default()).unwrap_err();
        match err {
            EnrichmentError::Export { path, .. } => assert_eq!(path, blocker),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(
            file_names(dir.path()),
            vec![format!("{}_consolidated.tsv", run.id)]
        );
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "keep me");
    }
}

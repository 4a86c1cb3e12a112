//! Gene, gene set, background and library types.
//!
//! Everything in here is immutable once loaded. Backgrounds and libraries are plain owned
//! data, so a single loaded copy can be shared by reference across concurrent analysis runs.
//!
//! ## Submodules
//!
//! - **[`loader`]**: parsing of background lists, GMT libraries and alias files
//! - **[`validation`]**: cleaning of user supplied gene lists against a background

use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod loader;
pub mod validation;

pub use loader::{
    load_aliases, load_background, load_background_file, load_library, load_library_file,
};
pub use validation::{Diagnostics, validate};

/// How raw gene tokens are normalized before comparison.
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
pub enum Normalization {
    /// Trim and upper-case every token (HGNC style symbols).
    #[default]
    Uppercase,
    /// Trim only, keep the case as given.
    Preserve,
}

/// A normalized gene identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gene(String);

impl Gene {
    /// Normalize a raw token, returns `None` for tokens that are empty after trimming.
    pub fn normalize(raw: &str, normalization: Normalization) -> Option<Gene> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let id = match normalization {
            Normalization::Uppercase => trimmed.to_uppercase(),
            Normalization::Preserve => trimmed.to_owned(),
        };
        Some(Gene(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Gene {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named set of unique genes.
///
/// Repeated tokens collapse into one member; the number of collapsed repeats is kept in
/// `duplicates` so callers can report it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GeneSet {
    pub name: String,
    genes: BTreeSet<Gene>,
    duplicates: usize,
}

impl GeneSet {
    pub fn new(name: &str) -> Self {
        GeneSet {
            name: name.to_owned(),
            genes: BTreeSet::new(),
            duplicates: 0,
        }
    }

    /// Build a set from raw tokens, normalizing each one.
    pub fn from_tokens<'a, I>(name: &str, tokens: I, normalization: Normalization) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = GeneSet::new(name);
        for token in tokens {
            if let Some(gene) = Gene::normalize(token, normalization) {
                set.insert(gene);
            }
        }
        set
    }

    /// Insert a gene, returns `false` (and counts a duplicate) if it was already present.
    pub fn insert(&mut self, gene: Gene) -> bool {
        let inserted = self.genes.insert(gene);
        if !inserted {
            self.duplicates += 1;
        }
        inserted
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains(gene)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Number of repeated tokens that collapsed on insertion.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter()
    }

    pub fn genes(&self) -> &BTreeSet<Gene> {
        &self.genes
    }
}

impl FromIterator<Gene> for GeneSet {
    fn from_iter<T: IntoIterator<Item = Gene>>(iter: T) -> Self {
        let mut set = GeneSet::default();
        for gene in iter {
            set.insert(gene);
        }
        set
    }
}

/// A user supplied gene set, cleaned against one background.
pub type InputSet = GeneSet;

/// The universe of genes an analysis is measured against.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Background {
    genes: GeneSet,
}

impl Background {
    pub fn new(genes: GeneSet) -> Self {
        Background { genes }
    }

    pub fn name(&self) -> &str {
        &self.genes.name
    }

    /// Cardinality `N` used in every contingency table.
    pub fn size(&self) -> usize {
        self.genes.len()
    }

    pub fn has_gene(&self, gene: &str) -> bool {
        self.genes.contains(gene)
    }

    pub fn genes(&self) -> &GeneSet {
        &self.genes
    }
}

/// One GMT line: a named reference gene set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Term {
    pub name: String,
    pub description: String,
    pub genes: BTreeSet<Gene>,
}

impl Term {
    pub fn size(&self) -> usize {
        self.genes.len()
    }
}

/// A GMT line that could not be turned into a term.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedLine {
    pub line: usize,
    pub reason: String,
}

/// An ordered collection of terms loaded from one GMT source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Library {
    pub name: String,
    pub organism: String,
    terms: Vec<Term>,
    unique_genes: BTreeSet<Gene>,
    rejected: Vec<RejectedLine>,
}

impl Library {
    pub fn new(name: &str, terms: Vec<Term>) -> Self {
        let unique_genes = terms
            .iter()
            .flat_map(|t| t.genes.iter().cloned())
            .collect();
        Library {
            name: name.to_owned(),
            organism: String::from("Homo sapiens"),
            terms,
            unique_genes,
            rejected: Vec::new(),
        }
    }

    pub fn with_organism(mut self, organism: &str) -> Self {
        self.organism = organism.to_owned();
        self
    }

    pub(crate) fn with_rejected(mut self, rejected: Vec<RejectedLine>) -> Self {
        self.rejected = rejected;
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Union of all genes over all terms.
    pub fn unique_genes(&self) -> &BTreeSet<Gene> {
        &self.unique_genes
    }

    pub fn has_gene(&self, gene: &str) -> bool {
        self.unique_genes.contains(gene)
    }

    /// Lines skipped during a lenient load.
    pub fn rejected(&self) -> &[RejectedLine] {
        &self.rejected
    }
}

/// Mapping from raw identifiers to display labels.
///
/// Only consulted at presentation and export boundaries; a missing alias resolves to the raw
/// identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap {
    labels: HashMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        AliasMap::default()
    }

    pub fn insert(&mut self, id: &str, label: &str) {
        self.labels.insert(id.to_owned(), label.to_owned());
    }

    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.labels.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_and_uppercases() {
        let gene = Gene::normalize("  celf2-as1\t", Normalization::Uppercase).unwrap();
        assert_eq!(gene.as_str(), "CELF2-AS1");
        let kept = Gene::normalize(" A1bg ", Normalization::Preserve).unwrap();
        assert_eq!(kept.as_str(), "A1bg");
        assert!(Gene::normalize("   ", Normalization::Uppercase).is_none());
    }

    #[test]
    fn gene_set_collapses_and_counts_duplicates() {
        let set = GeneSet::from_tokens(
            "bg",
            ["A1BG", "BGN", "a1bg"],
            Normalization::Uppercase,
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.duplicates(), 1);
        assert!(set.contains("A1BG"));
        assert!(set.contains("BGN"));
    }

    #[test]
    fn empty_background_has_nothing() {
        let bg = Background::new(GeneSet::new("empty"));
        assert_eq!(bg.size(), 0);
        assert!(!bg.has_gene("A1BG"));
    }

    #[test]
    fn library_tracks_unique_genes() {
        let term = |name: &str, genes: &[&str]| Term {
            name: name.to_owned(),
            description: String::new(),
            genes: genes
                .iter()
                .filter_map(|g| Gene::normalize(g, Normalization::Uppercase))
                .collect(),
        };
        let lib = Library::new("lib", vec![term("t1", &["A", "B"]), term("t2", &["B", "C"])]);
        assert_eq!(lib.num_terms(), 2);
        assert_eq!(lib.unique_genes().len(), 3);
        assert!(lib.has_gene("C"));
        assert!(!lib.has_gene("D"));
        assert_eq!(lib.organism, "Homo sapiens");
    }

    #[test]
    fn alias_falls_back_to_identifier() {
        let mut aliases = AliasMap::new();
        aliases.insert("GO:0008150", "biological_process");
        assert_eq!(aliases.resolve("GO:0008150"), "biological_process");
        assert_eq!(aliases.resolve("GO:0003674"), "GO:0003674");
    }
}

//! Gene set over-representation analysis from the command line.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use single_enrichment::config::AnalysisConfig;
use single_enrichment::enrichment::{AnalysisRun, run_analysis};
use single_enrichment::export::{ExportOptions, write_run};
use single_enrichment::geneset::loader::LoadPolicy;
use single_enrichment::geneset::{
    AliasMap, Normalization, load_aliases, load_background_file, load_library_file, validate,
};
use single_enrichment::testing::{CorrectionMethod, TestMethod};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Gene set over-representation analysis",
    long_about = "Tests an input gene list against GMT term libraries relative to a background universe"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: CommonArgs,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by all sub commands.
#[derive(Debug, Args)]
struct CommonArgs {
    /// Verbosity of the program
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an enrichment analysis.
    Run(RunArgs),
}

/// Arguments of `run`.
#[derive(Debug, Args)]
struct RunArgs {
    /// Input gene list, whitespace or newline separated; `-` reads stdin. May be given
    /// several times, each list is analyzed as its own run.
    #[arg(long = "genes", required = true)]
    genes: Vec<PathBuf>,
    /// Background universe, one gene per line.
    #[arg(long)]
    background: PathBuf,
    /// GMT library, may be given several times.
    #[arg(long = "library", required = true)]
    libraries: Vec<PathBuf>,
    /// JSON configuration; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Test used to score each term.
    #[arg(long, value_enum)]
    method: Option<TestMethod>,
    /// Multiple testing correction applied per library.
    #[arg(long, value_enum)]
    correction: Option<CorrectionMethod>,
    /// Gene token normalization.
    #[arg(long, value_enum)]
    normalization: Option<Normalization>,
    /// Handling of malformed GMT lines.
    #[arg(long, value_enum)]
    load_policy: Option<LoadPolicy>,
    /// JSON object mapping gene identifiers to display labels.
    #[arg(long)]
    aliases: Option<PathBuf>,
    /// Number of results printed per library.
    #[arg(long)]
    top: Option<usize>,
    /// Directory to write TSV and JSON results to.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl RunArgs {
    fn config(&self) -> Result<AnalysisConfig, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_path(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(correction) = self.correction {
            config.correction = correction;
        }
        if let Some(normalization) = self.normalization {
            config.normalization = normalization;
        }
        if let Some(load_policy) = self.load_policy {
            config.load_policy = load_policy;
        }
        if let Some(top) = self.top {
            config.display_count = top;
        }
        Ok(config)
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::ERROR,
        })
        .compact()
        .finish();

    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Run(args) => run(&cli.common, args)?,
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn run(_common: &CommonArgs, args: &RunArgs) -> Result<(), anyhow::Error> {
    let config = args.config()?;
    tracing::debug!("configuration: {:?}", &config);

    let background = load_background_file(&args.background, config.normalization)
        .with_context(|| format!("loading background {}", args.background.display()))?;
    let libraries = args
        .libraries
        .iter()
        .map(|path| {
            load_library_file(path, config.normalization, config.load_policy)
                .with_context(|| format!("loading library {}", path.display()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    for library in &libraries {
        for rejected in library.rejected() {
            tracing::warn!(
                "{}:{} skipped: {}",
                library.name,
                rejected.line,
                rejected.reason
            );
        }
    }
    let aliases = match &args.aliases {
        Some(path) => Some(read_aliases(path)?),
        None => None,
    };

    if args.genes.iter().filter(|p| p.as_path() == Path::new("-")).count() > 1 {
        anyhow::bail!("stdin (`-`) can be given as --genes only once");
    }

    for genes in &args.genes {
        let raw = read_genes(genes)?;
        let (mut input, diagnostics) = validate(&raw, &background, config.normalization)
            .with_context(|| format!("validating gene list {}", genes.display()))?;
        input.name = input_name(genes);
        tracing::info!("input {}: {}", input.name, diagnostics.summary());

        let analysis = run_analysis(input, diagnostics, &background, &libraries, &config)?;
        print_top(&analysis, config.display_count, aliases.as_ref());

        if let Some(out_dir) = &args.out_dir {
            let options = ExportOptions::new(&config, aliases.as_ref());
            let written = write_run(&analysis, out_dir, &options)?;
            for path in written {
                println!("wrote {}", path.display());
            }
        }
    }

    Ok(())
}

fn read_genes(path: &Path) -> Result<String, anyhow::Error> {
    let mut raw = String::new();
    if path == Path::new("-") {
        std::io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading gene list {}", path.display()))?;
    }
    Ok(raw)
}

fn read_aliases(path: &Path) -> Result<AliasMap, anyhow::Error> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening alias file {}", path.display()))?;
    Ok(load_aliases(file, &path.display().to_string())?)
}

fn input_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty() && s != "-")
        .unwrap_or_else(|| String::from("input"))
}

fn print_top(analysis: &AnalysisRun, k: usize, aliases: Option<&AliasMap>) {
    println!(
        "# run {} ({} / {}), {} input genes vs background {} ({} genes)",
        analysis.id,
        analysis.method,
        analysis.correction,
        analysis.input.len(),
        analysis.background,
        analysis.background_size
    );
    for library in &analysis.libraries {
        println!("## {} ({})", library.library, library.organism);
        println!("rank\tterm\toverlap\tp_value\tadjusted_p_value\tgenes");
        for (i, result) in library.top(k).iter().enumerate() {
            let genes = result
                .overlap_genes
                .iter()
                .map(|g| match aliases {
                    Some(aliases) => aliases.resolve(g.as_str()),
                    None => g.as_str(),
                })
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "{}\t{}\t{}/{}\t{:.3e}\t{:.3e}\t{}",
                i + 1,
                result.term,
                result.overlap,
                result.term_size,
                result.p_value,
                result.adjusted_p_value,
                genes
            );
        }
    }
}

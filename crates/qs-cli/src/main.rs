//! qcdstack CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qs_hist::{
    AnalysisConfig, BinSpec, BinningRegistry, HistogramProducer, HistogramStore, ProduceReport,
    compose_plot, produce_all,
};
use qs_viz::{PlotStyle, StackPlotArtifact, render_stack};

#[derive(Parser)]
#[command(name = "qcdstack")]
#[command(about = "qcdstack - histogram production and QCD-estimated stack plots")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill every configured variable for every process in both sign regions
    Histograms {
        /// Analysis configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Histogram store to write (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Fill one ad-hoc variable that need not be listed in the configuration
    Shapes {
        /// Analysis configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Column or expression to histogram
        #[arg(long)]
        variable: String,

        /// Number of bins
        #[arg(long)]
        bins: usize,

        /// Lower edge of the first bin
        #[arg(long, allow_negative_numbers = true)]
        lower: f64,

        /// Upper edge of the last bin
        #[arg(long, allow_negative_numbers = true)]
        upper: f64,

        /// Histogram store to write (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Compose the stacked plot of one variable from a store
    Plot {
        /// Analysis configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Histogram store (JSON) written by `histograms` or `shapes`
        #[arg(long)]
        store: PathBuf,

        /// Variable to draw
        #[arg(long)]
        variable: String,

        /// Directory receiving `{variable}.json` and `{variable}.svg`
        #[arg(long)]
        out_dir: PathBuf,

        /// Plot style overrides (YAML)
        #[arg(long)]
        style: Option<PathBuf>,
    },

    /// Redraw a plot artifact written by `plot`, e.g. with another style
    Render {
        /// Plot artifact (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Plot style overrides (YAML)
        #[arg(long)]
        style: Option<PathBuf>,

        /// SVG file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the histograms and cut-flows held by a store
    Inspect {
        /// Histogram store (JSON)
        #[arg(long)]
        store: PathBuf,

        /// Print the store summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Histograms { config, output, threads } => {
            cmd_histograms(&config, &output, threads)
        }
        Commands::Shapes { config, variable, bins, lower, upper, output, threads } => {
            cmd_shapes(&config, &variable, bins, lower, upper, &output, threads)
        }
        Commands::Plot { config, store, variable, out_dir, style } => {
            cmd_plot(&config, &store, &variable, &out_dir, style.as_deref())
        }
        Commands::Render { input, style, output } => {
            cmd_render(&input, style.as_deref(), &output)
        }
        Commands::Inspect { store, json } => cmd_inspect(&store, json),
    }
}

fn setup_threads(threads: usize) {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

fn load_config(path: &Path) -> Result<AnalysisConfig> {
    tracing::info!(path = %path.display(), "loading analysis config");
    AnalysisConfig::from_path(path)
        .with_context(|| format!("failed to load analysis config {}", path.display()))
}

fn cmd_histograms(config: &Path, output: &Path, threads: usize) -> Result<()> {
    setup_threads(threads);
    let cfg = load_config(config)?;
    let registry = cfg.registry()?;
    let report = produce(&cfg, &registry)?;
    save_store(&report, output)
}

fn cmd_shapes(
    config: &Path,
    variable: &str,
    bins: usize,
    lower: f64,
    upper: f64,
    output: &Path,
    threads: usize,
) -> Result<()> {
    if variable.trim().is_empty() {
        bail!("--variable must not be empty");
    }
    setup_threads(threads);
    let cfg = load_config(config)?;
    let mut registry = BinningRegistry::new();
    registry.register(variable, BinSpec::new(bins, lower, upper)?)?;
    let report = produce(&cfg, &registry)?;
    save_store(&report, output)
}

fn produce(cfg: &AnalysisConfig, registry: &BinningRegistry) -> Result<ProduceReport> {
    let selector = cfg.selector();
    let baseline = cfg.baseline();
    let catalog = cfg.catalog();
    let producer = HistogramProducer::new(registry, &selector, &baseline, &catalog)
        .luminosity(cfg.luminosity)
        .weight_column(cfg.weight_column.as_str());
    Ok(produce_all(&producer, &cfg.processes, &cfg.control_suffix)?)
}

fn save_store(report: &ProduceReport, output: &Path) -> Result<()> {
    if report.store.is_empty() {
        bail!("no histograms produced: every event source was unavailable");
    }
    for failure in &report.failures {
        eprintln!("warning: skipped process '{}': {}", failure.process, failure.reason);
    }
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    report.store.save(output)?;
    tracing::info!(path = %output.display(), histograms = report.store.len(), "store written");
    Ok(())
}

fn cmd_plot(
    config: &Path,
    store: &Path,
    variable: &str,
    out_dir: &Path,
    style: Option<&Path>,
) -> Result<()> {
    let cfg = load_config(config)?;
    let style = load_style(style)?;
    let store = HistogramStore::load(store)
        .with_context(|| format!("failed to load histogram store {}", store.display()))?;

    let composition = compose_plot(&cfg, &store, variable)?;
    let artifact = StackPlotArtifact::from_composition(&composition);
    let svg = render_stack(&artifact, &style)?;

    std::fs::create_dir_all(out_dir)?;
    let json_path = out_dir.join(format!("{variable}.json"));
    let svg_path = out_dir.join(format!("{variable}.svg"));
    std::fs::write(&json_path, artifact.to_json_pretty()?)?;
    std::fs::write(&svg_path, svg)?;
    tracing::info!(
        variable,
        artifact = %json_path.display(),
        svg = %svg_path.display(),
        "plot written"
    );
    Ok(())
}

fn load_style(path: Option<&Path>) -> Result<PlotStyle> {
    match path {
        Some(path) => PlotStyle::from_yaml_path(path)
            .with_context(|| format!("failed to load plot style {}", path.display())),
        None => Ok(PlotStyle::default()),
    }
}

fn cmd_render(input: &Path, style: Option<&Path>, output: &Path) -> Result<()> {
    let style = load_style(style)?;
    let artifact = StackPlotArtifact::from_json_path(input)
        .with_context(|| format!("failed to load plot artifact {}", input.display()))?;
    let svg = render_stack(&artifact, &style)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, svg)?;
    tracing::info!(variable = %artifact.variable, svg = %output.display(), "plot rendered");
    Ok(())
}

fn cmd_inspect(store: &Path, json: bool) -> Result<()> {
    let store = HistogramStore::load(store)
        .with_context(|| format!("failed to load histogram store {}", store.display()))?;

    if json {
        let histograms: Vec<_> = store
            .histograms()
            .map(|h| {
                serde_json::json!({
                    "name": store.name_of(&h.key),
                    "bins": h.n_bins(),
                    "integral": h.integral(),
                    "entries": h.entries,
                })
            })
            .collect();
        let cutflows: Vec<_> = store
            .cutflows()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "process": c.process,
                    "region": c.sign.as_str(),
                    "total": c.total,
                    "selected": c.selected(),
                })
            })
            .collect();
        let summary = serde_json::json!({
            "control_suffix": store.control_suffix(),
            "histograms": histograms,
            "cutflows": cutflows,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let width = store.names().iter().map(String::len).max().unwrap_or(4).max(4);
    println!("{:<width$}  {:>5}  {:>14}  {:>9}", "name", "bins", "integral", "entries");
    for h in store.histograms() {
        println!(
            "{:<width$}  {:>5}  {:>14.4}  {:>9}",
            store.name_of(&h.key),
            h.n_bins(),
            h.integral(),
            h.entries
        );
    }
    if !store.cutflows().is_empty() {
        println!();
        for c in store.cutflows() {
            println!("{} [{}]: {} / {} events selected", c.process, c.sign, c.selected(), c.total);
        }
    }
    Ok(())
}

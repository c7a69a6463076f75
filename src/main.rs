use anyhow::{bail, Context, Result};
use clap::Parser;
use datadive::{
    clean::Collapse,
    export::write_table,
    resolve::{Resolver, SearchRoots},
    summary::SummaryOptions,
    table::CsvLoader,
    Analysis, AnalysisOptions, Outcome,
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Locate a CSV file, clean its column labels and duplicate rows, and print an exploratory summary"
)]
struct Args {
    /// File name to search for under datasets/, notebooks/, the working dir and /
    file: String,
    /// Keep column labels as they appear in the header
    #[arg(long)]
    no_normalize: bool,
    /// Keep duplicate rows
    #[arg(long)]
    no_dedup: bool,
    /// Skip the summary report
    #[arg(long)]
    no_summary: bool,
    /// Collapse doubled underscores with a single pass
    #[arg(long)]
    legacy_collapse: bool,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// Rows shown by each preview
    #[arg(long, default_value_t = 5)]
    rows: usize,
    #[arg(long, default_value_t = 15)]
    bins: usize,
    /// Seed for the random row sample
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 20)]
    max_categories: usize,
    /// Directory for SVG charts
    #[arg(long, default_value = "figures", conflicts_with = "no_charts")]
    charts: PathBuf,
    #[arg(long)]
    no_charts: bool,
    #[arg(long)]
    report_json: Option<PathBuf>,
    /// Write the cleaned table here (.parquet for Parquet, CSV otherwise)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Search from this directory instead of the process working directory
    #[arg(long)]
    cwd: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) configure ────────────────────────────────────────────────
    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", args.delimiter);
    }
    let loader = CsvLoader {
        delimiter: args.delimiter as u8,
        ..CsvLoader::default()
    };
    let roots = match &args.cwd {
        Some(cwd) => SearchRoots::new(cwd, "/"),
        None => SearchRoots::from_env()?,
    };
    let options = AnalysisOptions {
        normalize_cols: !args.no_normalize,
        check_duplicates: !args.no_dedup,
        show_summary: !args.no_summary,
        collapse: if args.legacy_collapse {
            Collapse::SinglePass
        } else {
            Collapse::UntilStable
        },
        summary: SummaryOptions {
            preview_rows: args.rows,
            histogram_bins: args.bins.max(1),
            sample_seed: args.seed,
            max_categories: args.max_categories,
            chart_dir: (!args.no_charts).then(|| args.charts.clone()),
            report_json: args.report_json.clone(),
        },
    };
    info!(file = %args.file, cwd = %roots.cwd.display(), "startup");

    // ─── 3) run ──────────────────────────────────────────────────────
    let mut renderers = if options.show_summary {
        options.summary.renderers()?
    } else {
        Vec::new()
    };
    let analysis = Analysis::new(Resolver::new(roots, loader), options);
    let table = match analysis.execute(&args.file, &mut renderers)? {
        Outcome::Ready(table) => table,
        Outcome::NotFound => {
            warn!(file = %args.file, "no table produced: file not found");
            return Ok(ExitCode::FAILURE);
        }
        Outcome::EmptyAfterDedup => {
            warn!(file = %args.file, "no table produced: no rows left");
            return Ok(ExitCode::FAILURE);
        }
    };

    // ─── 4) export ───────────────────────────────────────────────────
    if let Some(path) = &args.output {
        write_table(&table, path).with_context(|| format!("exporting to {}", path.display()))?;
    }

    info!(rows = table.num_rows(), columns = table.num_columns(), "done");
    Ok(ExitCode::SUCCESS)
}

// src/summary/mod.rs

pub mod charts;
pub mod console;
pub mod json;
pub mod stats;

use anyhow::{Context, Result};
use arrow::{array::UInt32Array, compute::take_record_batch};
use rand::{rngs::StdRng, seq::index, SeedableRng};
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::table::{column_names, with_row_index, Table};
pub use charts::ChartReport;
pub use console::ConsoleReport;
pub use json::JsonReport;
pub use stats::{
    CorrelationMatrix, Description, Histogram, MissingCount, TableInfo, ValueCounts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preview {
    Head,
    Tail,
    Sample,
}

/// Receives the summary one section at a time, in a fixed order:
/// head, tail, sample, info, describe, missing, histograms, correlation,
/// one `categorical` call per text column, then `finish`.
pub trait ReportRenderer {
    /// `rows` carries a leading `index` column with source row positions.
    fn preview(&mut self, kind: Preview, rows: &Table) -> Result<()>;
    fn info(&mut self, info: &TableInfo) -> Result<()>;
    fn describe(&mut self, description: &Description) -> Result<()>;
    fn missing(&mut self, missing: &[MissingCount]) -> Result<()>;
    /// Only called when at least one numeric column exists.
    fn histograms(&mut self, histograms: &[Histogram]) -> Result<()>;
    /// Only called when at least two numeric columns exist.
    fn correlation(&mut self, matrix: &CorrelationMatrix) -> Result<()>;
    fn categorical(&mut self, counts: &ValueCounts) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: ReportRenderer + ?Sized> ReportRenderer for Box<R> {
    fn preview(&mut self, kind: Preview, rows: &Table) -> Result<()> {
        (**self).preview(kind, rows)
    }
    fn info(&mut self, info: &TableInfo) -> Result<()> {
        (**self).info(info)
    }
    fn describe(&mut self, description: &Description) -> Result<()> {
        (**self).describe(description)
    }
    fn missing(&mut self, missing: &[MissingCount]) -> Result<()> {
        (**self).missing(missing)
    }
    fn histograms(&mut self, histograms: &[Histogram]) -> Result<()> {
        (**self).histograms(histograms)
    }
    fn correlation(&mut self, matrix: &CorrelationMatrix) -> Result<()> {
        (**self).correlation(matrix)
    }
    fn categorical(&mut self, counts: &ValueCounts) -> Result<()> {
        (**self).categorical(counts)
    }
    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Fans every section out to each renderer in turn.
impl<R: ReportRenderer> ReportRenderer for Vec<R> {
    fn preview(&mut self, kind: Preview, rows: &Table) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.preview(kind, rows))
    }
    fn info(&mut self, info: &TableInfo) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.info(info))
    }
    fn describe(&mut self, description: &Description) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.describe(description))
    }
    fn missing(&mut self, missing: &[MissingCount]) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.missing(missing))
    }
    fn histograms(&mut self, histograms: &[Histogram]) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.histograms(histograms))
    }
    fn correlation(&mut self, matrix: &CorrelationMatrix) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.correlation(matrix))
    }
    fn categorical(&mut self, counts: &ValueCounts) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.categorical(counts))
    }
    fn finish(&mut self) -> Result<()> {
        self.iter_mut().try_for_each(|r| r.finish())
    }
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Rows shown by each of head, tail and sample.
    pub preview_rows: usize,
    pub histogram_bins: usize,
    /// Fixed seed for the random sample; `None` draws from entropy.
    pub sample_seed: Option<u64>,
    /// Categories listed per text column by the console and chart renderers.
    pub max_categories: usize,
    /// Where SVG figures go; `None` disables charts.
    pub chart_dir: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            histogram_bins: 15,
            sample_seed: None,
            max_categories: 20,
            chart_dir: None,
            report_json: None,
        }
    }
}

impl SummaryOptions {
    /// Console report on stdout plus whichever file outputs are configured.
    pub fn renderers(&self) -> Result<Vec<Box<dyn ReportRenderer>>> {
        let mut out: Vec<Box<dyn ReportRenderer>> = vec![Box::new(ConsoleReport::new(
            std::io::stdout(),
            self.preview_rows,
            self.max_categories,
        ))];
        if let Some(dir) = &self.chart_dir {
            out.push(Box::new(ChartReport::new(dir, self.max_categories)?));
        }
        if let Some(path) = &self.report_json {
            out.push(Box::new(JsonReport::new(path)));
        }
        Ok(out)
    }
}

fn take_rows(table: &Table, positions: &[u32]) -> Result<Table> {
    let rows = take_record_batch(table, &UInt32Array::from(positions.to_vec()))
        .context("selecting preview rows")?;
    let index: Vec<u64> = positions.iter().map(|&p| p as u64).collect();
    with_row_index(&rows, &index)
}

/// Positions of the first, last and a random `n` rows (fewer when the table is short).
fn preview_positions(rows: usize, n: usize, seed: Option<u64>) -> [(Preview, Vec<u32>); 3] {
    let k = n.min(rows);
    let head = (0..k as u32).collect();
    let tail = ((rows - k) as u32..rows as u32).collect();

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let sample = index::sample(&mut rng, rows, k)
        .into_iter()
        .map(|i| i as u32)
        .collect();

    [
        (Preview::Head, head),
        (Preview::Tail, tail),
        (Preview::Sample, sample),
    ]
}

/// Compute every section for `table` and hand them to `renderer`.
#[instrument(level = "info", skip_all, fields(rows = table.num_rows(), columns = table.num_columns()))]
pub fn summarize(
    table: &Table,
    options: &SummaryOptions,
    renderer: &mut dyn ReportRenderer,
) -> Result<()> {
    // 1) previews
    for (kind, positions) in preview_positions(
        table.num_rows(),
        options.preview_rows,
        options.sample_seed,
    ) {
        renderer.preview(kind, &take_rows(table, &positions)?)?;
    }

    // 2) structure and statistics
    renderer.info(&stats::table_info(table))?;
    renderer.describe(&stats::describe(table)?)?;
    renderer.missing(&stats::missing_counts(table))?;

    // 3) distributions
    if stats::numeric_column_count(table) > 0 {
        renderer.histograms(&stats::histograms(table, options.histogram_bins)?)?;
    }
    if let Some(matrix) = stats::correlation(table)? {
        renderer.correlation(&matrix)?;
    }
    for counts in stats::value_counts(table)? {
        renderer.categorical(&counts)?;
    }

    debug!(columns = ?column_names(table), "summary complete");
    renderer.finish()
}

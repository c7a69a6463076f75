use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::{
    clean::{dedupe, normalize, Collapse},
    resolve::{Resolved, Resolver, SearchRoots},
    summary::{summarize, ReportRenderer, SummaryOptions},
    table::{CsvLoader, Table, TableLoader},
};

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub normalize_cols: bool,
    pub check_duplicates: bool,
    pub show_summary: bool,
    pub collapse: Collapse,
    pub summary: SummaryOptions,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            normalize_cols: true,
            check_duplicates: true,
            show_summary: true,
            collapse: Collapse::default(),
            summary: SummaryOptions::default(),
        }
    }
}

/// What a run produced. Both non-`Ready` variants mean no usable table.
#[derive(Debug)]
pub enum Outcome {
    Ready(Table),
    NotFound,
    EmptyAfterDedup,
}

impl Outcome {
    pub fn into_table(self) -> Option<Table> {
        match self {
            Outcome::Ready(table) => Some(table),
            Outcome::NotFound | Outcome::EmptyAfterDedup => None,
        }
    }
}

/// Resolve, clean and summarize one CSV file.
pub struct Analysis<L> {
    resolver: Resolver<L>,
    options: AnalysisOptions,
}

impl<L: TableLoader> Analysis<L> {
    pub fn new(resolver: Resolver<L>, options: AnalysisOptions) -> Self {
        Self { resolver, options }
    }

    #[instrument(level = "info", skip(self, renderer))]
    pub fn execute(&self, file_name: &str, renderer: &mut dyn ReportRenderer) -> Result<Outcome> {
        // ─── 1) locate and load ───
        let Some(Resolved { path, table }) = self.resolver.resolve(file_name)? else {
            warn!(
                file = file_name,
                cwd = %self.resolver.roots().cwd.display(),
                "file not found in any search location"
            );
            return Ok(Outcome::NotFound);
        };
        info!(path = %path.display(), rows = table.num_rows(), columns = table.num_columns(), "loaded");

        // ─── 2) clean ───
        let mut table = table;
        if self.options.normalize_cols {
            table = normalize(&table, self.options.collapse)?;
        }
        if self.options.check_duplicates {
            table = dedupe(&table)?;
            if table.num_rows() == 0 {
                warn!(path = %path.display(), "table is empty after removing duplicates");
                return Ok(Outcome::EmptyAfterDedup);
            }
        }

        // ─── 3) summarize ───
        if self.options.show_summary {
            summarize(&table, &self.options.summary, renderer)?;
        }

        Ok(Outcome::Ready(table))
    }
}

/// Run the whole pipeline from the process working directory, printing the
/// summary to stdout plus any configured chart or JSON outputs.
pub fn execute_analysis(file_name: &str, options: &AnalysisOptions) -> Result<Option<Table>> {
    let resolver = Resolver::new(SearchRoots::from_env()?, CsvLoader::default());
    let analysis = Analysis::new(resolver, options.clone());
    let mut renderers = if options.show_summary {
        options.summary.renderers()?
    } else {
        Vec::new()
    };
    Ok(analysis.execute(file_name, &mut renderers)?.into_table())
}

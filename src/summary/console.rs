use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray, UInt64Array},
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
    util::pretty::pretty_format_batches,
};
use std::{io::Write, sync::Arc};

use super::{
    stats::{CorrelationMatrix, Description, Histogram, MissingCount, TableInfo, ValueCounts},
    Preview, ReportRenderer,
};
use crate::table::Table;

const BAR_WIDTH: usize = 40;

/// Plain-text report with one headed section per call.
pub struct ConsoleReport<W: Write> {
    out: W,
    preview_rows: usize,
    max_categories: usize,
    categorical_header: bool,
}

impl<W: Write> ConsoleReport<W> {
    pub fn new(out: W, preview_rows: usize, max_categories: usize) -> Self {
        Self {
            out,
            preview_rows,
            max_categories,
            categorical_header: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn table(&mut self, batch: RecordBatch) -> Result<()> {
        let text = pretty_format_batches(&[batch]).context("formatting table")?;
        writeln!(self.out, "{text}")?;
        Ok(())
    }
}

fn utf8(values: impl IntoIterator<Item = impl AsRef<str>>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn batch(columns: Vec<(String, ArrayRef)>) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, arr)| Field::new(name, arr.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, arr)| arr).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building report table")
}

fn description_table(description: &Description) -> Result<RecordBatch> {
    let mut columns: Vec<(String, ArrayRef)> = Vec::new();
    match description {
        Description::Numeric(stats) => {
            columns.push((
                String::new(),
                utf8(["count", "mean", "std", "min", "25%", "50%", "75%", "max"]),
            ));
            for s in stats {
                let values = vec![
                    s.count as f64,
                    s.mean,
                    s.std,
                    s.min,
                    s.q25,
                    s.median,
                    s.q75,
                    s.max,
                ];
                columns.push((s.column.clone(), Arc::new(Float64Array::from(values)) as ArrayRef));
            }
        }
        Description::Categorical(stats) => {
            columns.push((String::new(), utf8(["count", "unique", "top", "freq"])));
            for s in stats {
                let values = [
                    s.count.to_string(),
                    s.unique.to_string(),
                    s.top.clone().unwrap_or_default(),
                    s.freq.to_string(),
                ];
                columns.push((s.column.clone(), utf8(values)));
            }
        }
    }
    batch(columns)
}

fn bar(count: usize, top: usize) -> String {
    if top == 0 {
        return String::new();
    }
    "#".repeat((count * BAR_WIDTH).div_ceil(top))
}

impl<W: Write> ReportRenderer for ConsoleReport<W> {
    fn preview(&mut self, kind: Preview, rows: &Table) -> Result<()> {
        let header = match kind {
            Preview::Head => format!("First {} rows:", self.preview_rows),
            Preview::Tail => format!("\nLast {} rows:", self.preview_rows),
            Preview::Sample => format!("\nRandom sample of {} rows:", self.preview_rows),
        };
        writeln!(self.out, "{header}")?;
        self.table(rows.clone())
    }

    fn info(&mut self, info: &TableInfo) -> Result<()> {
        writeln!(self.out, "\nTable info:")?;
        if info.rows == 0 {
            writeln!(self.out, "0 entries")?;
        } else {
            writeln!(self.out, "{} entries, 0 to {}", info.rows, info.rows - 1)?;
        }
        writeln!(self.out, "Data columns (total {} columns):", info.columns.len())?;

        let table = batch(vec![
            (
                "#".into(),
                Arc::new(UInt64Array::from_iter_values(0..info.columns.len() as u64)) as ArrayRef,
            ),
            ("column".into(), utf8(info.columns.iter().map(|c| &c.name))),
            (
                "non_null".into(),
                Arc::new(UInt64Array::from_iter_values(
                    info.columns.iter().map(|c| c.non_null as u64),
                )) as ArrayRef,
            ),
            ("dtype".into(), utf8(info.columns.iter().map(|c| &c.dtype))),
        ])?;
        self.table(table)?;
        writeln!(self.out, "memory usage: {} bytes", info.memory_bytes)?;
        Ok(())
    }

    fn describe(&mut self, description: &Description) -> Result<()> {
        writeln!(self.out, "\nDescriptive statistics:")?;
        self.table(description_table(description)?)
    }

    fn missing(&mut self, missing: &[MissingCount]) -> Result<()> {
        writeln!(self.out, "\nMissing values:")?;
        let table = batch(vec![
            ("column".into(), utf8(missing.iter().map(|m| &m.column))),
            (
                "missing".into(),
                Arc::new(UInt64Array::from_iter_values(
                    missing.iter().map(|m| m.missing as u64),
                )) as ArrayRef,
            ),
        ])?;
        self.table(table)
    }

    fn histograms(&mut self, histograms: &[Histogram]) -> Result<()> {
        writeln!(self.out, "\nHistograms for numeric variables:")?;
        for h in histograms {
            writeln!(self.out, "\n{}:", h.column)?;
            if h.counts.is_empty() {
                writeln!(self.out, "  (no values)")?;
                continue;
            }
            let top = h.counts.iter().copied().max().unwrap_or(0);
            for (start, end, count) in h.bins() {
                writeln!(
                    self.out,
                    "  [{start:>12.4}, {end:>12.4}) {count:>8} {}",
                    bar(count, top)
                )?;
            }
        }
        Ok(())
    }

    fn correlation(&mut self, matrix: &CorrelationMatrix) -> Result<()> {
        writeln!(self.out, "\nCorrelation heatmap:")?;
        let mut columns: Vec<(String, ArrayRef)> =
            vec![(String::new(), utf8(matrix.columns.iter()))];
        for (j, name) in matrix.columns.iter().enumerate() {
            let values: Vec<f64> = matrix.values.iter().map(|row| row[j]).collect();
            columns.push((name.clone(), Arc::new(Float64Array::from(values)) as ArrayRef));
        }
        self.table(batch(columns)?)
    }

    fn categorical(&mut self, counts: &ValueCounts) -> Result<()> {
        if !self.categorical_header {
            writeln!(self.out, "\nCategorical variables:")?;
            self.categorical_header = true;
        }
        writeln!(self.out, "\nDistribution of {}:", counts.column)?;

        let shown = &counts.counts[..counts.counts.len().min(self.max_categories)];
        let table = batch(vec![
            (counts.column.clone(), utf8(shown.iter().map(|(v, _)| v))),
            (
                "count".into(),
                Arc::new(UInt64Array::from_iter_values(
                    shown.iter().map(|(_, c)| *c as u64),
                )) as ArrayRef,
            ),
        ])?;
        self.table(table)?;

        let hidden = counts.counts.len() - shown.len();
        if hidden > 0 {
            writeln!(self.out, "... {hidden} more values")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

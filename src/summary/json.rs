use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::info;

use super::{
    stats::{CorrelationMatrix, Description, Histogram, MissingCount, TableInfo, ValueCounts},
    Preview, ReportRenderer,
};
use crate::table::Table;

/// Everything but the row previews, as one document.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub info: Option<TableInfo>,
    pub describe: Option<Description>,
    pub missing: Vec<MissingCount>,
    pub histograms: Vec<Histogram>,
    pub correlation: Option<CorrelationMatrix>,
    pub categorical: Vec<ValueCounts>,
}

/// Collects sections and writes them as pretty JSON on `finish`.
pub struct JsonReport {
    path: PathBuf,
    report: Report,
}

impl JsonReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            report: Report::default(),
        }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }
}

impl ReportRenderer for JsonReport {
    fn preview(&mut self, _: Preview, _: &Table) -> Result<()> {
        Ok(())
    }

    fn info(&mut self, info: &TableInfo) -> Result<()> {
        self.report.info = Some(info.clone());
        Ok(())
    }

    fn describe(&mut self, description: &Description) -> Result<()> {
        self.report.describe = Some(description.clone());
        Ok(())
    }

    fn missing(&mut self, missing: &[MissingCount]) -> Result<()> {
        self.report.missing = missing.to_vec();
        Ok(())
    }

    fn histograms(&mut self, histograms: &[Histogram]) -> Result<()> {
        self.report.histograms = histograms.to_vec();
        Ok(())
    }

    fn correlation(&mut self, matrix: &CorrelationMatrix) -> Result<()> {
        self.report.correlation = Some(matrix.clone());
        Ok(())
    }

    fn categorical(&mut self, counts: &ValueCounts) -> Result<()> {
        self.report.categorical.push(counts.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("creating report file {}", self.path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &self.report).context("writing JSON report")?;
        out.flush().context("flushing JSON report")?;
        info!(path = %self.path.display(), "wrote JSON report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{summarize, SummaryOptions};
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn writes_collected_sections() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("price", DataType::Float64, true),
            Field::new("shop", DataType::Utf8, true),
        ]));
        let table = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(1.0), Some(3.0), None])),
                Arc::new(StringArray::from(vec!["a", "b", "a"])),
            ],
        )?;

        let dir = tempdir()?;
        let path = dir.path().join("out").join("report.json");
        let mut json = JsonReport::new(&path);
        summarize(&table, &SummaryOptions::default(), &mut json)?;

        let doc: Value = serde_json::from_reader(File::open(&path)?)?;
        assert_eq!(doc["info"]["rows"], 3);
        assert_eq!(doc["describe"]["kind"], "numeric");
        assert_eq!(doc["describe"]["columns"][0]["mean"], 2.0);
        assert_eq!(doc["missing"][0]["missing"], 1);
        assert_eq!(doc["categorical"][0]["counts"][0][0], "a");
        assert_eq!(doc["categorical"][0]["counts"][0][1], 2);
        // one numeric column: no correlation matrix
        assert!(doc["correlation"].is_null());
        assert_eq!(json.report().histograms.len(), 1);
        Ok(())
    }
}

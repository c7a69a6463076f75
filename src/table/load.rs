// src/table/load.rs

use anyhow::{bail, Context, Result};
use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
};
use std::{
    fs::File,
    io::{self, Seek},
    path::Path,
    sync::Arc,
};
use tracing::debug;

use super::Table;

/// Parses the file at one candidate path.
pub trait TableLoader {
    /// `Ok(None)` when nothing exists at `path`. Content that is present but
    /// cannot be parsed is an error.
    fn load(&self, path: &Path) -> Result<Option<Table>>;
}

impl<L: TableLoader + ?Sized> TableLoader for &L {
    fn load(&self, path: &Path) -> Result<Option<Table>> {
        (**self).load(path)
    }
}

/// CSV with a header row; column types are inferred from the records.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    pub delimiter: u8,
    /// Records scanned for type inference; `None` scans the whole file.
    pub infer_records: Option<usize>,
    pub batch_size: usize,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            infer_records: None,
            batch_size: 8192,
        }
    }
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

impl TableLoader for CsvLoader {
    fn load(&self, path: &Path) -> Result<Option<Table>> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("opening {}", path.display())),
        };

        // 1) infer column types from the records
        let format = Format::default()
            .with_header(true)
            .with_delimiter(self.delimiter);
        let (schema, records) = format
            .infer_schema(&mut file, self.infer_records)
            .with_context(|| format!("inferring CSV schema of {}", path.display()))?;
        if schema.fields().is_empty() {
            bail!("no columns to parse from {}", path.display());
        }
        debug!(
            path = %path.display(),
            columns = schema.fields().len(),
            records,
            "inferred schema"
        );

        // 2) second pass parses into typed batches
        file.rewind()
            .with_context(|| format!("rewinding {}", path.display()))?;
        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_delimiter(self.delimiter)
            .with_batch_size(self.batch_size)
            .build(file)
            .with_context(|| format!("creating CSV reader for {}", path.display()))?;
        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("CSV parse error in {}", path.display()))?;

        let table = concat_batches(&schema, &batches).context("concatenating CSV batches")?;
        Ok(Some(table))
    }
}

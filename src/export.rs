use anyhow::{Context, Result};
use arrow::csv::WriterBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{fs, path::Path};
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Parquet,
}

impl Format {
    /// `.parquet` / `.pq` select Parquet; anything else is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("parquet" | "pq") => Format::Parquet,
            _ => Format::Csv,
        }
    }
}

/// Write `table` to `path` through a uniquely named temporary file in the
/// same directory. A failed write removes the temporary file and leaves any
/// existing output untouched.
#[instrument(level = "info", skip(table), fields(path = %path.display(), rows = table.num_rows()))]
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
            parent
        }
        None => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;

    let format = Format::from_path(path);
    match format {
        Format::Csv => {
            let mut writer = WriterBuilder::new()
                .with_header(true)
                .build(temp.as_file_mut());
            writer.write(table).context("writing CSV")?;
        }
        Format::Parquet => {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let mut writer = ArrowWriter::try_new(temp.as_file_mut(), table.schema(), Some(props))
                .context("creating Arrow writer")?;
            writer.write(table).context("writing Parquet batch")?;
            writer.close().context("closing Parquet writer")?;
        }
    }

    // the error owns the temporary file; dropping it deletes the file
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("moving output into {}", path.display()))?;
    info!(?format, "wrote table");
    Ok(())
}

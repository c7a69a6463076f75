pub mod load;

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

pub use load::{CsvLoader, TableLoader};

/// One CSV file held in memory: named columns of equal length.
pub type Table = RecordBatch;

pub fn column_names(table: &Table) -> Vec<String> {
    table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Integer, float and decimal columns.
pub fn is_numeric(dt: &DataType) -> bool {
    dt.is_numeric()
}

/// Text-valued columns, the ones that get value counts.
pub fn is_categorical(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}

/// Prepend an `index` column carrying the rows' positions in the source table.
pub fn with_row_index(rows: &Table, positions: &[u64]) -> Result<Table> {
    let schema = rows.schema();
    let mut fields = Vec::with_capacity(schema.fields().len() + 1);
    fields.push(Field::new("index", DataType::UInt64, false));
    fields.extend(schema.fields().iter().map(|f| f.as_ref().clone()));

    let mut cols: Vec<ArrayRef> = Vec::with_capacity(rows.num_columns() + 1);
    cols.push(Arc::new(UInt64Array::from(positions.to_vec())));
    cols.extend(rows.columns().iter().cloned());

    RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).context("attaching row index")
}

use anyhow::{Context, Result};
use arrow::{
    array::UInt32Array,
    compute::take_record_batch,
    row::{RowConverter, SortField},
};
use std::collections::HashSet;
use tracing::info;

use crate::table::Table;

/// Drop rows identical to an earlier row across every column. Survivors keep
/// their relative order; nulls compare equal to nulls.
pub fn dedupe(table: &Table) -> Result<Table> {
    if table.num_rows() == 0 || table.num_columns() == 0 {
        return Ok(table.clone());
    }

    // row format gives every row a comparable, hashable byte encoding
    let sort_fields = table
        .schema()
        .fields()
        .iter()
        .map(|f| SortField::new(f.data_type().clone()))
        .collect();
    let converter = RowConverter::new(sort_fields).context("building row converter")?;
    let rows = converter
        .convert_columns(table.columns())
        .context("encoding rows")?;

    let mut seen = HashSet::with_capacity(rows.num_rows());
    let keep: Vec<u32> = (0..rows.num_rows())
        .filter(|&i| seen.insert(rows.row(i)))
        .map(|i| i as u32)
        .collect();

    let removed = table.num_rows() - keep.len();
    if removed == 0 {
        return Ok(table.clone());
    }
    info!(duplicates = removed, "duplicates found, removing");

    take_record_batch(table, &UInt32Array::from(keep)).context("dropping duplicate rows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{AsArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Int64Type, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn people(ids: Vec<Option<i64>>, names: Vec<Option<&str>>) -> Result<Table> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
        ]));
        Ok(RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(names)),
            ],
        )?)
    }

    #[test]
    fn keeps_first_occurrence_in_order() -> Result<()> {
        let table = people(
            vec![Some(2), Some(1), Some(2), Some(3), Some(1)],
            vec![Some("Bob"), Some("Alice"), Some("Bob"), Some("Cy"), Some("Alice")],
        )?;
        let out = dedupe(&table)?;

        assert_eq!(out.num_rows(), 3);
        let ids: Vec<i64> = out.column(0).as_primitive::<Int64Type>().values().to_vec();
        assert_eq!(ids, vec![2, 1, 3]);
        let names: Vec<&str> = out.column(1).as_string::<i32>().iter().flatten().collect();
        assert_eq!(names, vec!["Bob", "Alice", "Cy"]);
        Ok(())
    }

    #[test]
    fn rows_differing_in_one_column_survive() -> Result<()> {
        let table = people(
            vec![Some(1), Some(1)],
            vec![Some("Alice"), Some("alice")],
        )?;
        assert_eq!(dedupe(&table)?.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn nulls_compare_equal() -> Result<()> {
        let table = people(vec![None, None, Some(1)], vec![Some("x"), Some("x"), None])?;
        assert_eq!(dedupe(&table)?.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn all_copies_of_one_row_leave_that_row() -> Result<()> {
        let table = people(vec![Some(1); 4], vec![Some("Alice"); 4])?;
        assert_eq!(dedupe(&table)?.num_rows(), 1);
        Ok(())
    }

    #[test]
    fn idempotent_and_never_grows() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Float64, true)]));
        let table = RecordBatch::try_new(
            schema,
            vec![Arc::new(Float64Array::from(vec![
                Some(1.5),
                None,
                Some(1.5),
                Some(-0.0),
                None,
            ]))],
        )?;

        let once = dedupe(&table)?;
        let twice = dedupe(&once)?;
        assert!(once.num_rows() <= table.num_rows());
        assert_eq!(once.num_rows(), 3);
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn empty_table_passes_through() -> Result<()> {
        let table = people(vec![], vec![])?;
        assert_eq!(dedupe(&table)?.num_rows(), 0);
        Ok(())
    }
}

use anyhow::{Context, Result};
use arrow::{datatypes::Schema, record_batch::RecordBatch};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use crate::table::Table;

static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

/// How doubled separators are removed after case conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Collapse {
    /// Every run of `_` becomes one `_`; leading and trailing `_` are dropped.
    #[default]
    UntilStable,
    /// A single non-overlapping `__` → `_` pass. `Total  Sales` keeps a double
    /// underscore (`total__sales`), so this mode is not idempotent.
    SinglePass,
}

/// `CamelCase Label` → `camel_case_label`. Only ASCII capitals start a new
/// word; other letters are just lowercased.
pub fn normalize_label(label: &str, collapse: Collapse) -> String {
    let mut out = String::with_capacity(label.len() + 4);
    for (i, ch) in label.chars().enumerate() {
        if i > 0 && ch.is_ascii_uppercase() {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    let out = out.replace(' ', "_");

    match collapse {
        Collapse::UntilStable => SEPARATOR_RUN
            .replace_all(&out, "_")
            .trim_matches('_')
            .to_string(),
        Collapse::SinglePass => out.replace("__", "_"),
    }
}

/// Relabel every column; rows are untouched.
pub fn normalize(table: &Table, collapse: Collapse) -> Result<Table> {
    let schema = table.schema();
    let fields: Vec<_> = schema
        .fields()
        .iter()
        .map(|f| {
            let name = normalize_label(f.name(), collapse);
            if &name != f.name() {
                debug!(from = %f.name(), to = %name, "renamed column");
            }
            f.as_ref().clone().with_name(name)
        })
        .collect();

    let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    RecordBatch::try_new(schema, table.columns().to_vec()).context("relabeling columns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::column_names;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field};

    fn snake_case(label: &str) -> bool {
        Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$")
            .unwrap()
            .is_match(label)
    }

    #[test]
    fn camel_case_and_spaces() {
        let c = Collapse::UntilStable;
        assert_eq!(normalize_label("id", c), "id");
        assert_eq!(normalize_label("Name", c), "name");
        assert_eq!(normalize_label("firstName", c), "first_name");
        assert_eq!(normalize_label("TotalSales", c), "total_sales");
        assert_eq!(normalize_label("Unit Price", c), "unit_price");
        assert_eq!(normalize_label("user_Id", c), "user_id");
        // each capital is a boundary, acronyms included
        assert_eq!(normalize_label("ID", c), "i_d");
        // non-ASCII capitals are lowercased in place
        assert_eq!(normalize_label("CódigoÁrea", c), "códigoárea");
        assert_eq!(normalize_label("ÁreaTotal", c), "área_total");
    }

    #[test]
    fn doubled_separators_by_mode() {
        // "Total  Sales" → "total___sales" before collapsing
        assert_eq!(
            normalize_label("Total  Sales", Collapse::UntilStable),
            "total_sales"
        );
        assert_eq!(
            normalize_label("Total  Sales", Collapse::SinglePass),
            "total__sales"
        );
        // one boundary next to one space collapses either way
        assert_eq!(
            normalize_label("Unit Price", Collapse::SinglePass),
            "unit_price"
        );
        assert_eq!(normalize_label(" Name ", Collapse::UntilStable), "name");
        assert_eq!(normalize_label(" Name ", Collapse::SinglePass), "_name_");
    }

    #[test]
    fn collapsing_mode_is_idempotent() {
        let labels = [
            "id",
            "Name",
            "Total  Sales",
            "customerID",
            "A B  C",
            "already_snake",
            "Year2024 Value",
        ];
        for label in labels {
            let once = normalize_label(label, Collapse::UntilStable);
            let twice = normalize_label(&once, Collapse::UntilStable);
            assert_eq!(once, twice, "label {label:?}");
            assert!(snake_case(&once), "{once:?} is not snake_case");
        }
    }

    #[test]
    fn single_pass_mode_is_not_idempotent_for_wide_gaps() {
        let once = normalize_label("Total  Sales", Collapse::SinglePass);
        let twice = normalize_label(&once, Collapse::SinglePass);
        assert_ne!(once, twice);
        assert_eq!(twice, "total_sales");
    }

    #[test]
    fn relabels_columns_and_keeps_rows() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("FullName", DataType::Utf8, true),
        ]));
        let table = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["Ann", "Bo"])),
            ],
        )?;

        let out = normalize(&table, Collapse::default())?;
        assert_eq!(column_names(&out), vec!["id", "full_name"]);
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.column(1).as_ref(), table.column(1).as_ref());
        Ok(())
    }
}

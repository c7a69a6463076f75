use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array},
    compute::cast,
    datatypes::DataType,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::table::{is_categorical, is_numeric, Table};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub non_null: usize,
    pub dtype: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
    pub memory_bytes: usize,
}

/// count, mean, std and quartiles of one numeric column. Undefined values
/// (empty column, std of one value) are NaN.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoricalSummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum Description {
    Numeric(Vec<NumericSummary>),
    /// Used when the table has no numeric column at all.
    Categorical(Vec<CategoricalSummary>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Equal-width bins; `edges` has one more entry than `counts`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Histogram {
    pub column: String,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// `(start, end, count)` per bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(w, &c)| (w[0], w[1], c))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `values[i][j]` is the Pearson coefficient of columns i and j.
    pub values: Vec<Vec<f64>>,
}

/// Frequencies of one text column, most frequent first. Nulls are not counted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValueCounts {
    pub column: String,
    pub counts: Vec<(String, usize)>,
}

/// Per-row values of a numeric column; nulls and NaN become `None`.
fn numeric_cells(array: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let floats = cast(array, &DataType::Float64).context("casting column to Float64")?;
    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| anyhow!("cast did not produce a Float64 array"))?;
    Ok(floats
        .iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

fn text_cells(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    let text = cast(array, &DataType::Utf8).context("casting column to Utf8")?;
    Ok(text
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// `(name, values)` for every numeric column, in table order.
fn numeric_columns(table: &Table) -> Result<Vec<(String, Vec<Option<f64>>)>> {
    let schema = table.schema();
    schema
        .fields()
        .iter()
        .zip(table.columns())
        .filter(|(f, _)| is_numeric(f.data_type()))
        .map(|(f, col)| Ok((f.name().clone(), numeric_cells(col)?)))
        .collect()
}

pub fn numeric_column_count(table: &Table) -> usize {
    table
        .schema()
        .fields()
        .iter()
        .filter(|f| is_numeric(f.data_type()))
        .count()
}

pub fn table_info(table: &Table) -> TableInfo {
    let schema = table.schema();
    let columns = schema
        .fields()
        .iter()
        .zip(table.columns())
        .map(|(f, col)| ColumnInfo {
            name: f.name().clone(),
            non_null: col.len() - col.null_count(),
            dtype: f.data_type().to_string(),
        })
        .collect();

    TableInfo {
        rows: table.num_rows(),
        columns,
        memory_bytes: table.get_array_memory_size(),
    }
}

/// Linear interpolation between the closest ranks of a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn numeric_summary(column: &str, values: &[f64]) -> NumericSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = if n == 0 {
        f64::NAN
    } else {
        sorted.iter().sum::<f64>() / n as f64
    };
    let std = if n < 2 {
        f64::NAN
    } else {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    };

    NumericSummary {
        column: column.to_string(),
        count: n,
        mean,
        std,
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

pub fn categorical_summary(column: &str, values: &[Option<String>]) -> CategoricalSummary {
    let counts = count_values(values.iter().flatten().map(String::as_str));
    let (top, freq) = counts
        .first()
        .map(|(v, c)| (Some(v.clone()), *c))
        .unwrap_or((None, 0));

    CategoricalSummary {
        column: column.to_string(),
        count: values.iter().flatten().count(),
        unique: counts.len(),
        top,
        freq,
    }
}

pub fn describe(table: &Table) -> Result<Description> {
    let numeric = numeric_columns(table)?;
    if !numeric.is_empty() {
        let summaries = numeric
            .iter()
            .map(|(name, cells)| {
                let values: Vec<f64> = cells.iter().flatten().copied().collect();
                numeric_summary(name, &values)
            })
            .collect();
        return Ok(Description::Numeric(summaries));
    }

    let schema = table.schema();
    let summaries = schema
        .fields()
        .iter()
        .zip(table.columns())
        .map(|(f, col)| Ok(categorical_summary(f.name(), &text_cells(col)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Description::Categorical(summaries))
}

pub fn missing_counts(table: &Table) -> Vec<MissingCount> {
    table
        .schema()
        .fields()
        .iter()
        .zip(table.columns())
        .map(|(f, col)| MissingCount {
            column: f.name().clone(),
            missing: col.null_count(),
        })
        .collect()
}

pub fn histogram(column: &str, values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let (Some(lo), Some(hi)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Histogram {
            column: column.to_string(),
            edges: Vec::new(),
            counts: Vec::new(),
        };
    };
    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in values {
        // the right edge of the last bin is inclusive
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram {
        column: column.to_string(),
        edges,
        counts,
    }
}

pub fn histograms(table: &Table, bins: usize) -> Result<Vec<Histogram>> {
    Ok(numeric_columns(table)?
        .iter()
        .map(|(name, cells)| {
            let values: Vec<f64> = cells.iter().flatten().copied().collect();
            histogram(name, &values, bins)
        })
        .collect())
}

/// Pearson coefficient over the rows where both sides are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// `None` when fewer than two numeric columns exist.
pub fn correlation(table: &Table) -> Result<Option<CorrelationMatrix>> {
    let numeric = numeric_columns(table)?;
    if numeric.len() < 2 {
        return Ok(None);
    }

    let n = numeric.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let mut r = pearson(&numeric[i].1, &numeric[j].1);
            if i == j && r.is_finite() {
                r = 1.0;
            }
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(Some(CorrelationMatrix {
        columns: numeric.into_iter().map(|(name, _)| name).collect(),
        values,
    }))
}

/// Count descending; ties keep first-appearance order.
fn count_values<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for v in values {
        match index.get(v) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(v, counts.len());
                counts.push((v.to_string(), 1));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn value_counts(table: &Table) -> Result<Vec<ValueCounts>> {
    let schema = table.schema();
    schema
        .fields()
        .iter()
        .zip(table.columns())
        .filter(|(f, _)| is_categorical(f.data_type()))
        .map(|(f, col)| {
            let cells = text_cells(col)?;
            Ok(ValueCounts {
                column: f.name().clone(),
                counts: count_values(cells.iter().flatten().map(String::as_str)),
            })
        })
        .collect()
}

use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use super::{
    stats::{CorrelationMatrix, Description, Histogram, MissingCount, TableInfo, ValueCounts},
    Preview, ReportRenderer,
};
use crate::table::Table;

const FONT: &str = "sans-serif";

/// Writes one SVG per figure: `hist_<col>.svg`, `correlation.svg`,
/// `counts_<col>.svg`. Text-only sections are ignored.
pub struct ChartReport {
    dir: PathBuf,
    max_categories: usize,
    written: Vec<PathBuf>,
}

impl ChartReport {
    pub fn new(dir: impl Into<PathBuf>, max_categories: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating chart directory {}", dir.display()))?;
        Ok(Self {
            dir,
            max_categories,
            written: Vec::new(),
        })
    }

    /// Figures written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn target(&mut self, stem: &str) -> PathBuf {
        let path = self.dir.join(format!("{}.svg", file_stem(stem)));
        self.written.push(path.clone());
        path
    }
}

/// Column names may hold anything; file names get `[A-Za-z0-9_-]` only.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Red for positive, blue for negative, grey when undefined.
fn heat(r: f64) -> RGBColor {
    if !r.is_finite() {
        return RGBColor(220, 220, 220);
    }
    let w = r.abs().min(1.0);
    let fade = |c: u8| (255.0 - (255.0 - c as f64) * w).round() as u8;
    if r >= 0.0 {
        RGBColor(fade(180), fade(30), fade(40))
    } else {
        RGBColor(fade(40), fade(70), fade(180))
    }
}

fn draw_histogram(path: &Path, hist: &Histogram) -> Result<()> {
    let (Some(&lo), Some(&hi)) = (hist.edges.first(), hist.edges.last()) else {
        return Ok(());
    };
    let top = hist.counts.iter().copied().max().unwrap_or(0).max(1) as f64;

    let root = SVGBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&hist.column, (FONT, 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0f64..top * 1.05)?;
    chart
        .configure_mesh()
        .x_desc(hist.column.as_str())
        .y_desc("count")
        .draw()?;
    chart.draw_series(hist.bins().map(|(start, end, count)| {
        Rectangle::new([(start, 0.0), (end, count as f64)], BLUE.mix(0.6).filled())
    }))?;
    root.present()?;
    Ok(())
}

fn draw_heatmap(path: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    let n = matrix.columns.len();
    let side = (n as u32 * 70).clamp(300, 1400);

    let root = SVGBackend::new(path, (side + 160, side + 120)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("correlation", (FONT, 24))
        .margin(10)
        .margin_left(150)
        .margin_bottom(100)
        .build_cartesian_2d(0f64..n as f64, 0f64..n as f64)?;

    // row 0 at the top
    let cell = |idx: usize| (idx / n, idx % n, (n - 1 - idx / n) as f64);
    chart.draw_series((0..n * n).map(cell).map(|(i, j, y)| {
        Rectangle::new(
            [(j as f64, y), (j as f64 + 1.0, y + 1.0)],
            heat(matrix.values[i][j]).filled(),
        )
    }))?;
    let centered =
        TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series((0..n * n).map(cell).map(|(i, j, y)| {
        Text::new(
            format!("{:.2}", matrix.values[i][j]),
            (j as f64 + 0.5, y + 0.5),
            centered.clone(),
        )
    }))?;

    let right = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    let below = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    for (k, name) in matrix.columns.iter().enumerate() {
        let (px, py) = chart.backend_coord(&(0.0, (n - 1 - k) as f64 + 0.5));
        root.draw(&Text::new(name.clone(), (px - 6, py), right.clone()))?;
        let (px, py) = chart.backend_coord(&(k as f64 + 0.5, 0.0));
        root.draw(&Text::new(name.clone(), (px, py + 6), below.clone()))?;
    }
    root.present()?;
    Ok(())
}

fn draw_counts(path: &Path, counts: &ValueCounts, max_categories: usize) -> Result<()> {
    let shown = &counts.counts[..counts.counts.len().min(max_categories)];
    if shown.is_empty() {
        return Ok(());
    }
    let k = shown.len();
    let top = shown.iter().map(|(_, c)| *c).max().unwrap_or(1) as f64;

    let root = SVGBackend::new(path, (800, (k as u32 * 28 + 120).max(240))).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&counts.column, (FONT, 24))
        .margin(10)
        .margin_left(160)
        .x_label_area_size(40)
        .build_cartesian_2d(0f64..top * 1.05, 0f64..k as f64)?;
    chart.configure_mesh().y_labels(0).x_desc("count").draw()?;

    // most frequent bar on top
    chart.draw_series(shown.iter().enumerate().map(|(i, (_, c))| {
        let y = (k - 1 - i) as f64;
        Rectangle::new([(0.0, y + 0.15), (*c as f64, y + 0.85)], GREEN.mix(0.6).filled())
    }))?;

    let right = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    for (i, (value, _)) in shown.iter().enumerate() {
        let (px, py) = chart.backend_coord(&(0.0, (k - 1 - i) as f64 + 0.5));
        root.draw(&Text::new(value.clone(), (px - 6, py), right.clone()))?;
    }
    root.present()?;
    Ok(())
}

impl ReportRenderer for ChartReport {
    fn preview(&mut self, _: Preview, _: &Table) -> Result<()> {
        Ok(())
    }

    fn info(&mut self, _: &TableInfo) -> Result<()> {
        Ok(())
    }

    fn describe(&mut self, _: &Description) -> Result<()> {
        Ok(())
    }

    fn missing(&mut self, _: &[MissingCount]) -> Result<()> {
        Ok(())
    }

    fn histograms(&mut self, histograms: &[Histogram]) -> Result<()> {
        for h in histograms.iter().filter(|h| !h.counts.is_empty()) {
            let path = self.target(&format!("hist_{}", h.column));
            draw_histogram(&path, h)
                .with_context(|| format!("drawing histogram {}", path.display()))?;
            debug!(path = %path.display(), "wrote histogram");
        }
        Ok(())
    }

    fn correlation(&mut self, matrix: &CorrelationMatrix) -> Result<()> {
        let path = self.target("correlation");
        draw_heatmap(&path, matrix)
            .with_context(|| format!("drawing heatmap {}", path.display()))?;
        debug!(path = %path.display(), "wrote heatmap");
        Ok(())
    }

    fn categorical(&mut self, counts: &ValueCounts) -> Result<()> {
        if counts.counts.is_empty() {
            return Ok(());
        }
        let path = self.target(&format!("counts_{}", counts.column));
        draw_counts(&path, counts, self.max_categories)
            .with_context(|| format!("drawing count plot {}", path.display()))?;
        debug!(path = %path.display(), "wrote count plot");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        info!(dir = %self.dir.display(), figures = self.written.len(), "charts written");
        Ok(())
    }
}

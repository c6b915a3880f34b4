//! Line charts over aggregate tables, drawn with `plotters`.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use std::path::Path;

use crate::aggregate::AggregateTable;

pub const DEFAULT_SIZE: (u32, u32) = (960, 540);

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartFormat {
    Svg,
    Png,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Svg => "svg",
            ChartFormat::Png => "png",
        }
    }
}

/// One line. Non-finite values are gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl Series {
    /// Runs of finite points between gaps.
    pub fn segments(&self) -> Vec<&[(NaiveDate, f64)]> {
        self.points
            .split(|(_, v)| !v.is_finite())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl LineChart {
    /// Builds one series per (group, column) pair of `table`.
    ///
    /// `columns` pairs a table column with its legend label. With a single
    /// column, grouped series are named after their group; with several, the
    /// label is appended to the group name.
    pub fn from_table(
        table: &AggregateTable,
        columns: &[(&str, &str)],
        title: &str,
        x_label: &str,
        y_label: &str,
    ) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|(column, label)| {
                table
                    .column_index(column)
                    .map(|idx| (idx, *label))
                    .ok_or_else(|| anyhow!("unknown column '{}'", column))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut series: Vec<Series> = Vec::new();
        for group in table.groups() {
            for &(idx, label) in &indices {
                let name = match (group, indices.len()) {
                    (Some(group), 1) => group.to_string(),
                    (Some(group), _) => format!("{group} {label}"),
                    (None, _) => label.to_string(),
                };
                let points = table
                    .rows
                    .iter()
                    .filter(|r| r.group.as_deref() == group)
                    .map(|r| (r.bucket, r.values[idx]))
                    .collect();
                series.push(Series { name, points });
            }
        }

        Ok(Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            series,
        })
    }

    fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
        let min = dates.clone().min()?;
        let max = dates.max()?;
        Some((min, max))
    }

    fn value_bounds(&self) -> (f64, f64) {
        let finite = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|(_, v)| *v))
            .filter(|v| v.is_finite());
        let (min, max) = finite.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if max > min { (min, max) } else { (min, min + 1.0) }
    }
}

/// Fixed colours for the provinces and the missing-value sentinel.
pub fn province_colour(name: &str) -> Option<RGBColor> {
    let rgb = match name {
        "Brussels" => (128, 0, 0),
        "Antwerpen" => (218, 165, 32),
        "WestVlaanderen" => (0, 0, 0),
        "OostVlaanderen" => (119, 136, 153),
        "Limburg" => (255, 228, 225),
        "VlaamsBrabant" => (75, 0, 130),
        "BrabantWallon" => (218, 112, 214),
        "Hainaut" => (0, 0, 128),
        "Luxembourg" => (210, 105, 30),
        "Liège" => (154, 205, 50),
        "Namur" => (255, 127, 80),
        "NA" => (255, 69, 0),
        _ => return None,
    };
    Some(RGBColor(rgb.0, rgb.1, rgb.2))
}

fn series_colour(index: usize, name: &str) -> RGBAColor {
    match province_colour(name) {
        Some(colour) => colour.to_rgba(),
        None => Palette99::pick(index).to_rgba(),
    }
}

fn draw<DB>(chart: &LineChart, root: DrawingArea<DB, Shift>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let Some((start, end)) = chart.date_bounds() else {
        root.titled(&chart.title, ("sans-serif", 24))?;
        root.present()?;
        return Ok(());
    };

    let days = (end - start).num_days().max(1) as i32;
    let (y_min, y_max) = chart.value_bounds();
    let headroom = (y_max - y_min) * 0.05;
    let date_label = |d: &i32| {
        (start + chrono::Duration::days(*d as i64))
            .format("%Y-%m-%d")
            .to_string()
    };

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..days, y_min..y_max + headroom)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(8)
        .x_label_formatter(&date_label)
        .draw()?;

    for (i, series) in chart.series.iter().enumerate() {
        let style = series_colour(i, &series.name).stroke_width(2);
        for (n, segment) in series.segments().into_iter().enumerate() {
            let points = segment
                .iter()
                .map(|(d, v)| ((*d - start).num_days() as i32, *v))
                .collect::<Vec<_>>();
            let drawn = ctx.draw_series(LineSeries::new(points, style))?;
            if n == 0 {
                drawn
                    .label(series.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }
        }
    }

    if chart.series.len() > 1 {
        ctx.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Renders the chart as an SVG document.
pub fn render_svg(chart: &LineChart, size: (u32, u32)) -> Result<String> {
    let mut buf = String::new();
    {
        let root = SVGBackend::with_string(&mut buf, size).into_drawing_area();
        draw(chart, root)?;
    }
    Ok(buf)
}

/// Writes the chart to `path`; a `.png` extension selects the bitmap backend,
/// anything else is written as SVG.
pub fn render_to_file(chart: &LineChart, path: &Path, size: (u32, u32)) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => draw(chart, BitMapBackend::new(path, size).into_drawing_area()),
        _ => draw(chart, SVGBackend::new(path, size).into_drawing_area()),
    }
}

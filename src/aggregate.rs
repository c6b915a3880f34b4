//! Filtering, bucketing and summing of observations.
//!
//! [`filter_and_aggregate`] is what every dashboard callback runs: restrict by
//! date range, restrict by category when a selection is given, then sum each
//! measure per (category, date bucket). The result is a plain table that the
//! chart layer reads and the JSON endpoints serialize.

use anyhow::{Result, anyhow};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::records::{Dimension, Observation};

/// Width of the time interval rows are grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    #[default]
    Day,
    /// Monday to Sunday, labelled by the Sunday.
    Week,
}

impl Bucket {
    /// The label of the bucket `date` falls into.
    pub fn of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => date,
            Bucket::Week => {
                let to_sunday = 6 - date.weekday().num_days_from_monday();
                date + Days::new(to_sunday as u64)
            }
        }
    }

    fn step(self) -> Days {
        match self {
            Bucket::Day => Days::new(1),
            Bucket::Week => Days::new(7),
        }
    }
}

/// Inclusive date bounds; a missing bound does not restrict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

/// Parameters of one dashboard recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Selected category values. Empty means no category filter.
    pub categories: Vec<String>,
    pub range: DateRange,
    /// Column the selection applies to and that rows are grouped on when the
    /// selection is non-empty.
    pub dimension: Dimension,
    pub bucket: Bucket,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            range: DateRange::default(),
            dimension: Dimension::Province,
            bucket: Bucket::Day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub bucket: NaiveDate,
    pub group: Option<String>,
    /// One value per table column. Derived ratios may be `NaN`.
    pub values: Vec<f64>,
}

/// Summed measures per (group, bucket), sorted by group then bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub bucket: Bucket,
    pub group_by: Option<Dimension>,
    pub columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("unknown column '{}'", name))
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Sum of a column over all rows, skipping `NaN`.
    pub fn total(&self, name: &str) -> Option<f64> {
        let values = self.column(name)?;
        Some(values.into_iter().filter(|v| !v.is_nan()).sum())
    }

    /// Distinct groups in row order.
    pub fn groups(&self) -> Vec<Option<&str>> {
        let mut groups: Vec<Option<&str>> = Vec::new();
        for row in &self.rows {
            let group = row.group.as_deref();
            if groups.last() != Some(&group) {
                groups.push(group);
            }
        }
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adds `name = round(numerator / denominator * 100, 2)`.
    ///
    /// A zero denominator gives `NaN`, which charts render as a gap.
    pub fn derive_percentage(
        &mut self,
        name: &str,
        numerator: &str,
        denominator: &str,
    ) -> Result<&mut Self> {
        let num = self.require(numerator)?;
        let den = self.require(denominator)?;
        self.derive(name, |values| percentage(values[num], values[den]));
        Ok(self)
    }

    /// Adds `name = a - b`.
    pub fn derive_difference(&mut self, name: &str, a: &str, b: &str) -> Result<&mut Self> {
        let a = self.require(a)?;
        let b = self.require(b)?;
        self.derive(name, |values| values[a] - values[b]);
        Ok(self)
    }

    fn derive<F: Fn(&[f64]) -> f64>(&mut self, name: &str, f: F) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            let value = f(&row.values);
            row.values.push(value);
        }
    }
}

/// `numerator / denominator` as a percentage rounded to two decimals.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return f64::NAN;
    }
    round2(numerator / denominator * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sums every measure per bucket, and per `group_by` value when given.
pub fn aggregate<R: Observation>(
    rows: &[R],
    bucket: Bucket,
    group_by: Option<Dimension>,
) -> AggregateTable {
    aggregate_rows(rows.iter(), bucket, group_by)
}

/// Applies the query's date range and category selection, then aggregates.
///
/// Rows are grouped by the query dimension only when the selection is
/// non-empty; otherwise every category is summed into one series.
pub fn filter_and_aggregate<R: Observation>(rows: &[R], query: &Query) -> AggregateTable {
    let selected: HashSet<&str> = query.categories.iter().map(String::as_str).collect();

    let filtered = rows.iter().filter(|r| query.range.contains(r.date())).filter(|r| {
        selected.is_empty()
            || r.dimension(query.dimension)
                .is_some_and(|value| selected.contains(value))
    });

    let group_by = (!selected.is_empty()).then_some(query.dimension);
    aggregate_rows(filtered, query.bucket, group_by)
}

fn aggregate_rows<'a, R, I>(rows: I, bucket: Bucket, group_by: Option<Dimension>) -> AggregateTable
where
    R: Observation + 'a,
    I: Iterator<Item = &'a R>,
{
    let width = R::MEASURES.len();
    let mut sums: BTreeMap<Option<String>, BTreeMap<NaiveDate, Vec<f64>>> = BTreeMap::new();

    for row in rows {
        let group = group_by.and_then(|dim| row.dimension(dim).map(str::to_string));
        let values = sums
            .entry(group)
            .or_default()
            .entry(bucket.of(row.date()))
            .or_insert_with(|| vec![0.0; width]);
        for (i, value) in values.iter_mut().enumerate() {
            *value += row.measure(i);
        }
    }

    let mut out = Vec::new();
    for (group, series) in sums {
        fill_gaps(&mut out, group, series, bucket, width);
    }

    AggregateTable {
        bucket,
        group_by,
        columns: R::MEASURES.iter().map(|c| c.to_string()).collect(),
        rows: out,
    }
}

/// Emits one row per bucket between the first and last bucket of a group,
/// with zeros where the group had no rows.
fn fill_gaps(
    out: &mut Vec<AggregateRow>,
    group: Option<String>,
    mut series: BTreeMap<NaiveDate, Vec<f64>>,
    bucket: Bucket,
    width: usize,
) {
    let (Some(&first), Some(&last)) = (series.keys().next(), series.keys().next_back()) else {
        return;
    };

    let mut current = first;
    while current <= last {
        let values = series.remove(&current).unwrap_or_else(|| vec![0.0; width]);
        out.push(AggregateRow {
            bucket: current,
            group: group.clone(),
            values,
        });
        match current.checked_add_days(bucket.step()) {
            Some(next) => current = next,
            None => break,
        }
    }
}

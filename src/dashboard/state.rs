//! Data held by a running dashboard and the charts it can draw.

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;

use crate::aggregate::{AggregateTable, Bucket, DateRange, Query, filter_and_aggregate};
use crate::charts::LineChart;
use crate::datasets::Dataset;
use crate::load::{CleanOptions, load_cases, load_hospitalisations, load_tests};
use crate::records::{CaseRecord, Dimension, HospitalisationRecord, Observation, TestRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DashboardKind {
    Cases,
    Tests,
    Hospitalisations,
}

impl DashboardKind {
    pub fn dataset(self) -> Dataset {
        match self {
            DashboardKind::Cases => Dataset::CasesAgeSex,
            DashboardKind::Tests => Dataset::Tests,
            DashboardKind::Hospitalisations => Dataset::Hospitalisations,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DashboardKind::Cases => "Confirmed Cases",
            DashboardKind::Tests => "Performed and Positive Tests",
            DashboardKind::Hospitalisations => "Hospital Intakes and Discharges",
        }
    }

    pub fn charts(self) -> &'static [ChartSpec] {
        match self {
            DashboardKind::Cases => CASE_CHARTS,
            DashboardKind::Tests => TEST_CHARTS,
            DashboardKind::Hospitalisations => HOSPITALISATION_CHARTS,
        }
    }

    pub fn chart(self, id: &str) -> Option<&'static ChartSpec> {
        self.charts().iter().find(|c| c.id == id)
    }
}

/// One chart slot on a dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub column: &'static str,
    pub bucket: Bucket,
    /// `(numerator, denominator)` when `column` is a derived percentage.
    pub percentage: Option<(&'static str, &'static str)>,
}

const CASE_CHARTS: &[ChartSpec] = &[ChartSpec {
    id: "confirmed-cases",
    title: "Confirmed Cases by Date",
    x_label: "Date",
    y_label: "Confirmed Cases",
    column: "CASES",
    bucket: Bucket::Day,
    percentage: None,
}];

const TEST_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        id: "tests-by-day",
        title: "Total Number of Tests by Day",
        x_label: "Date",
        y_label: "Number of Tests",
        column: "TESTS_ALL",
        bucket: Bucket::Day,
        percentage: None,
    },
    ChartSpec {
        id: "pos-tests-by-day",
        title: "Total Number of Positive Tests by Day",
        x_label: "Date",
        y_label: "Number of Positive Tests",
        column: "TESTS_ALL_POS",
        bucket: Bucket::Day,
        percentage: None,
    },
    ChartSpec {
        id: "pos-rate-by-day",
        title: "Positivity Rate (%) by Day",
        x_label: "Date",
        y_label: "Positivity Rate (%)",
        column: "PCT_TESTS_POS",
        bucket: Bucket::Day,
        percentage: Some(("TESTS_ALL_POS", "TESTS_ALL")),
    },
    ChartSpec {
        id: "pos-rate-by-week",
        title: "Positivity Rate (%) by Week",
        x_label: "Week",
        y_label: "Positivity Rate (%)",
        column: "PCT_TESTS_POS",
        bucket: Bucket::Week,
        percentage: Some(("TESTS_ALL_POS", "TESTS_ALL")),
    },
];

const HOSPITALISATION_CHARTS: &[ChartSpec] = &[
    ChartSpec {
        id: "intakes-by-date",
        title: "New Intakes by Date",
        x_label: "Date",
        y_label: "Number of Patients",
        column: "NEW_IN",
        bucket: Bucket::Day,
        percentage: None,
    },
    ChartSpec {
        id: "discharges-by-date",
        title: "Discharges by Date",
        x_label: "Date",
        y_label: "Number of Patients",
        column: "NEW_OUT",
        bucket: Bucket::Day,
        percentage: None,
    },
];

/// User selection coming from the page controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartFilter {
    pub provinces: Vec<String>,
    pub range: DateRange,
}

/// Records loaded once at startup; read-only afterwards.
#[derive(Debug, Clone)]
pub enum DashboardData {
    Cases(Vec<CaseRecord>),
    Tests(Vec<TestRecord>),
    Hospitalisations(Vec<HospitalisationRecord>),
}

fn categories_of<R: Observation>(rows: &[R], dim: Dimension) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.dimension(dim))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn date_bounds_of<R: Observation>(rows: &[R]) -> Option<(NaiveDate, NaiveDate)> {
    let min = rows.iter().map(Observation::date).min()?;
    let max = rows.iter().map(Observation::date).max()?;
    Some((min, max))
}

impl DashboardData {
    pub fn load(kind: DashboardKind, data_dir: &Path, options: &CleanOptions) -> Result<Self> {
        let path = kind.dataset().path_in(data_dir);
        Ok(match kind {
            DashboardKind::Cases => DashboardData::Cases(load_cases(&path, options)?.records),
            DashboardKind::Tests => DashboardData::Tests(load_tests(&path, options)?.records),
            DashboardKind::Hospitalisations => {
                DashboardData::Hospitalisations(load_hospitalisations(&path, options)?.records)
            }
        })
    }

    pub fn kind(&self) -> DashboardKind {
        match self {
            DashboardData::Cases(_) => DashboardKind::Cases,
            DashboardData::Tests(_) => DashboardKind::Tests,
            DashboardData::Hospitalisations(_) => DashboardKind::Hospitalisations,
        }
    }

    /// Sorted distinct provinces, for the dropdown.
    pub fn provinces(&self) -> Vec<String> {
        match self {
            DashboardData::Cases(rows) => categories_of(rows, Dimension::Province),
            DashboardData::Tests(rows) => categories_of(rows, Dimension::Province),
            DashboardData::Hospitalisations(rows) => categories_of(rows, Dimension::Province),
        }
    }

    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            DashboardData::Cases(rows) => date_bounds_of(rows),
            DashboardData::Tests(rows) => date_bounds_of(rows),
            DashboardData::Hospitalisations(rows) => date_bounds_of(rows),
        }
    }

    /// Recomputes the aggregate behind one chart for the given selection.
    pub fn table(&self, spec: &ChartSpec, filter: &ChartFilter) -> Result<AggregateTable> {
        let query = Query {
            categories: filter.provinces.clone(),
            range: filter.range,
            dimension: Dimension::Province,
            bucket: spec.bucket,
        };

        let mut table = match self {
            DashboardData::Cases(rows) => filter_and_aggregate(rows, &query),
            DashboardData::Tests(rows) => filter_and_aggregate(rows, &query),
            DashboardData::Hospitalisations(rows) => filter_and_aggregate(rows, &query),
        };

        if let Some((numerator, denominator)) = spec.percentage {
            table.derive_percentage(spec.column, numerator, denominator)?;
        }
        Ok(table)
    }

    pub fn chart(&self, spec: &ChartSpec, filter: &ChartFilter) -> Result<LineChart> {
        let table = self.table(spec, filter)?;
        LineChart::from_table(
            &table,
            &[(spec.column, spec.y_label)],
            spec.title,
            spec.x_label,
            spec.y_label,
        )
    }
}

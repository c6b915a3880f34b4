//! Static chart sets written by the `plot` subcommand.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::{Bucket, aggregate};
use crate::charts::{ChartFormat, DEFAULT_SIZE, LineChart, render_to_file};
use crate::datasets::Dataset;
use crate::load::{CleanOptions, load_cases, load_hospitalisations, load_mortality, load_tests};
use crate::records::{CaseRecord, Dimension, HospitalisationRecord, MortalityRecord, TestRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Report {
    Cases,
    Hospitalisations,
    Tests,
    Mortality,
}

impl Report {
    pub fn dataset(self) -> Dataset {
        match self {
            Report::Cases => Dataset::CasesAgeSex,
            Report::Hospitalisations => Dataset::Hospitalisations,
            Report::Tests => Dataset::Tests,
            Report::Mortality => Dataset::Mortality,
        }
    }
}

/// A chart and the file stem it is written under.
#[derive(Debug, Clone)]
pub struct NamedChart {
    pub slug: &'static str,
    pub chart: LineChart,
}

fn named(slug: &'static str, chart: LineChart) -> NamedChart {
    NamedChart { slug, chart }
}

pub fn case_charts(records: &[CaseRecord]) -> Result<Vec<NamedChart>> {
    [
        ("cases_by_province", Dimension::Province),
        ("cases_by_age_group", Dimension::AgeGroup),
    ]
    .into_iter()
    .map(|(slug, dim)| -> Result<NamedChart> {
        let table = aggregate(records, Bucket::Day, Some(dim));
        let chart = LineChart::from_table(
            &table,
            &[("CASES", "Confirmed Cases")],
            &format!("Confirmed Cases by {}", dim.label()),
            "Date",
            "Confirmed Cases",
        )?;
        Ok(named(slug, chart))
    })
    .collect()
}

pub fn hospitalisation_charts(records: &[HospitalisationRecord]) -> Result<Vec<NamedChart>> {
    let mut charts = Vec::new();

    for (group_by, slugs, title_suffix) in [
        (
            None,
            [
                "hosp_total",
                "hosp_pct_icu",
                "hosp_intakes_discharges",
                "hosp_net_intakes",
            ],
            "",
        ),
        (
            Some(Dimension::Province),
            [
                "hosp_total_by_province",
                "hosp_pct_icu_by_province",
                "hosp_intakes_discharges_by_province",
                "hosp_net_intakes_by_province",
            ],
            " per Province",
        ),
    ] {
        let mut table = aggregate(records, Bucket::Day, group_by);
        table
            .derive_percentage("PCT_IN_ICU", "TOTAL_IN_ICU", "TOTAL_IN")?
            .derive_difference("NEW_DIFF", "NEW_IN", "NEW_OUT")?;

        charts.push(named(
            slugs[0],
            LineChart::from_table(
                &table,
                &[("TOTAL_IN", "Hospitalised"), ("TOTAL_IN_ICU", "In ICU")],
                &format!("Total Number of Hospitalised Patients and Patients in the ICU{title_suffix}"),
                "Date",
                "Number of Patients",
            )?,
        ));
        charts.push(named(
            slugs[1],
            LineChart::from_table(
                &table,
                &[("PCT_IN_ICU", "Pct in ICU")],
                &format!("Percentage of all Hospitalised Patients in the ICU{title_suffix}"),
                "Date",
                "Pct in ICU",
            )?,
        ));
        charts.push(named(
            slugs[2],
            LineChart::from_table(
                &table,
                &[("NEW_IN", "Intakes"), ("NEW_OUT", "Discharges")],
                &format!("Number of Intakes and Discharges per 24 Hours{title_suffix}"),
                "Date",
                "Number of Patients",
            )?,
        ));
        charts.push(named(
            slugs[3],
            LineChart::from_table(
                &table,
                &[("NEW_DIFF", "Intakes - Discharges")],
                &format!("Difference Between Intakes and Discharges per 24 Hours{title_suffix}"),
                "Date",
                "Number of Patients",
            )?,
        ));
    }

    Ok(charts)
}

pub fn test_charts(records: &[TestRecord]) -> Result<Vec<NamedChart>> {
    let mut by_day = aggregate(records, Bucket::Day, None);
    by_day.derive_percentage("PCT_TESTS_POS", "TESTS_ALL_POS", "TESTS_ALL")?;
    let mut by_week = aggregate(records, Bucket::Week, None);
    by_week.derive_percentage("PCT_TESTS_POS", "TESTS_ALL_POS", "TESTS_ALL")?;
    let mut by_province = aggregate(records, Bucket::Day, Some(Dimension::Province));
    by_province.derive_percentage("PCT_TESTS_POS", "TESTS_ALL_POS", "TESTS_ALL")?;

    Ok(vec![
        named(
            "tests_by_day",
            LineChart::from_table(
                &by_day,
                &[("TESTS_ALL", "Number of Tests")],
                "Total Number of Tests by Day",
                "Date",
                "Number of Tests",
            )?,
        ),
        named(
            "positive_tests_by_day",
            LineChart::from_table(
                &by_day,
                &[("TESTS_ALL_POS", "Number of Positive Tests")],
                "Total Number of Positive Tests by Day",
                "Date",
                "Number of Positive Tests",
            )?,
        ),
        named(
            "positivity_by_day",
            LineChart::from_table(
                &by_day,
                &[("PCT_TESTS_POS", "Positivity Rate (%)")],
                "Positivity Rate (%) by Day",
                "Date",
                "Positivity Rate (%)",
            )?,
        ),
        named(
            "positivity_by_week",
            LineChart::from_table(
                &by_week,
                &[("PCT_TESTS_POS", "Positivity Rate (%)")],
                "Positivity Rate (%) by Week",
                "Week",
                "Positivity Rate (%)",
            )?,
        ),
        named(
            "positivity_by_province",
            LineChart::from_table(
                &by_province,
                &[("PCT_TESTS_POS", "Positivity Rate (%)")],
                "Positivity Rate (%) by Date per Province",
                "Date",
                "Positivity Rate (%)",
            )?,
        ),
    ])
}

pub fn mortality_charts(records: &[MortalityRecord]) -> Result<Vec<NamedChart>> {
    [
        ("deaths_by_region", Dimension::Region, Bucket::Day, "Deaths", "Date"),
        ("deaths_by_age_group", Dimension::AgeGroup, Bucket::Week, "Weekly Deaths", "Week"),
    ]
    .into_iter()
    .map(|(slug, dim, bucket, what, x_label)| -> Result<NamedChart> {
        let table = aggregate(records, bucket, Some(dim));
        let chart = LineChart::from_table(
            &table,
            &[("DEATHS", "Deaths")],
            &format!("{what} by {}", dim.label()),
            x_label,
            "Deaths",
        )?;
        Ok(named(slug, chart))
    })
    .collect()
}

/// Loads the report's dataset from `data_dir` and builds its charts.
pub fn build_report(
    report: Report,
    data_dir: &Path,
    options: &CleanOptions,
) -> Result<Vec<NamedChart>> {
    let path = report.dataset().path_in(data_dir);
    match report {
        Report::Cases => case_charts(&load_cases(&path, options)?.records),
        Report::Hospitalisations => {
            hospitalisation_charts(&load_hospitalisations(&path, options)?.records)
        }
        Report::Tests => test_charts(&load_tests(&path, options)?.records),
        Report::Mortality => mortality_charts(&load_mortality(&path, options)?.records),
    }
}

/// Builds a report and writes one file per chart into `out_dir`.
#[tracing::instrument(
    skip(data_dir, out_dir, options),
    fields(data_dir = %data_dir.display(), out_dir = %out_dir.display())
)]
pub fn write_report(
    report: Report,
    data_dir: &Path,
    out_dir: &Path,
    format: ChartFormat,
    options: &CleanOptions,
) -> Result<Vec<PathBuf>> {
    let charts = build_report(report, data_dir, options)?;
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut paths = Vec::with_capacity(charts.len());
    for NamedChart { slug, chart } in charts {
        let path = out_dir.join(format!("{}.{}", slug, format.extension()));
        render_to_file(&chart, &path, DEFAULT_SIZE)
            .with_context(|| format!("rendering {}", path.display()))?;
        info!(path = %path.display(), series = chart.series.len(), "Chart written");
        paths.push(path);
    }

    Ok(paths)
}

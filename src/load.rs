//! Reading and cleaning the published CSV files.
//!
//! Rows whose date or numeric fields are missing or malformed are dropped.
//! Missing categorical fields are replaced by [`MISSING`] unless the caller
//! asks for those rows to be dropped as well. Nothing here is reported as an
//! error except I/O failures; the per-file counts end up in a [`LoadReport`].

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::records::{CaseRecord, HospitalisationRecord, MISSING, MortalityRecord, TestRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What to do with a row whose categorical field is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingCategory {
    /// Keep the row and use this label instead.
    Sentinel(String),
    Drop,
}

impl Default for MissingCategory {
    fn default() -> Self {
        MissingCategory::Sentinel(MISSING.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub missing_category: MissingCategory,
}

/// Row counts for one loaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub read: usize,
    pub kept: usize,
    pub dropped: usize,
    /// Categorical cells replaced by the sentinel label.
    pub filled: usize,
}

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub report: LoadReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejected {
    Date,
    Count,
    Category,
}

struct Cleaner<'a> {
    options: &'a CleanOptions,
    filled: usize,
}

fn present(raw: Option<String>) -> Option<String> {
    let value = raw?.trim().to_string();
    if value.is_empty() || value == MISSING {
        None
    } else {
        Some(value)
    }
}

fn parse_date(raw: Option<String>) -> Result<NaiveDate, Rejected> {
    let value = present(raw).ok_or(Rejected::Date)?;
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| Rejected::Date)
}

fn parse_count(raw: Option<String>) -> Result<u64, Rejected> {
    let value = present(raw).ok_or(Rejected::Count)?;
    value.parse().map_err(|_| Rejected::Count)
}

impl Cleaner<'_> {
    fn category(&mut self, raw: Option<String>) -> Result<String, Rejected> {
        match present(raw) {
            Some(value) => Ok(value),
            None => match &self.options.missing_category {
                MissingCategory::Sentinel(label) => {
                    self.filled += 1;
                    Ok(label.clone())
                }
                MissingCategory::Drop => Err(Rejected::Category),
            },
        }
    }
}

fn read_rows<R, Raw, T, F>(reader: R, options: &CleanOptions, mut clean: F) -> Result<Loaded<T>>
where
    R: Read,
    Raw: DeserializeOwned,
    F: FnMut(Raw, &mut Cleaner<'_>) -> Result<T, Rejected>,
{
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cleaner = Cleaner { options, filled: 0 };
    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for result in rdr.deserialize::<Raw>() {
        report.read += 1;
        let raw = match result {
            Ok(raw) => raw,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!(error = %e, "Unreadable row skipped");
                report.dropped += 1;
                continue;
            }
        };

        // A row that fails after a sentinel fill must not count as filled.
        let filled_before = cleaner.filled;
        match clean(raw, &mut cleaner) {
            Ok(record) => records.push(record),
            Err(reason) => {
                cleaner.filled = filled_before;
                debug!(?reason, line = report.read, "Row dropped");
                report.dropped += 1;
            }
        }
    }

    report.kept = records.len();
    report.filled = cleaner.filled;
    Ok(Loaded { records, report })
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn log_report(path: &Path, report: &LoadReport) {
    info!(
        path = %path.display(),
        read = report.read,
        kept = report.kept,
        dropped = report.dropped,
        filled = report.filled,
        "Dataset loaded"
    );
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawCase {
    #[serde(rename = "DATE")]
    date: Option<String>,
    #[serde(rename = "PROVINCE")]
    province: Option<String>,
    #[serde(rename = "REGION")]
    region: Option<String>,
    #[serde(rename = "AGEGROUP")]
    age_group: Option<String>,
    #[serde(rename = "SEX")]
    sex: Option<String>,
    #[serde(rename = "CASES")]
    cases: Option<String>,
}

pub fn read_cases<R: Read>(reader: R, options: &CleanOptions) -> Result<Loaded<CaseRecord>> {
    read_rows(reader, options, |raw: RawCase, c| {
        Ok(CaseRecord {
            date: parse_date(raw.date)?,
            cases: parse_count(raw.cases)?,
            province: c.category(raw.province)?,
            region: c.category(raw.region)?,
            age_group: c.category(raw.age_group)?,
            sex: c.category(raw.sex)?,
        })
    })
}

pub fn load_cases(path: &Path, options: &CleanOptions) -> Result<Loaded<CaseRecord>> {
    let loaded = read_cases(open(path)?, options)
        .with_context(|| format!("reading {}", path.display()))?;
    log_report(path, &loaded.report);
    Ok(loaded)
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawHospitalisation {
    #[serde(rename = "DATE")]
    date: Option<String>,
    #[serde(rename = "PROVINCE")]
    province: Option<String>,
    #[serde(rename = "REGION")]
    region: Option<String>,
    #[serde(rename = "TOTAL_IN")]
    total_in: Option<String>,
    #[serde(rename = "TOTAL_IN_ICU")]
    total_in_icu: Option<String>,
    #[serde(rename = "NEW_IN")]
    new_in: Option<String>,
    #[serde(rename = "NEW_OUT")]
    new_out: Option<String>,
}

pub fn read_hospitalisations<R: Read>(
    reader: R,
    options: &CleanOptions,
) -> Result<Loaded<HospitalisationRecord>> {
    read_rows(reader, options, |raw: RawHospitalisation, c| {
        Ok(HospitalisationRecord {
            date: parse_date(raw.date)?,
            total_in: parse_count(raw.total_in)?,
            total_in_icu: parse_count(raw.total_in_icu)?,
            new_in: parse_count(raw.new_in)?,
            new_out: parse_count(raw.new_out)?,
            province: c.category(raw.province)?,
            region: c.category(raw.region)?,
        })
    })
}

pub fn load_hospitalisations(
    path: &Path,
    options: &CleanOptions,
) -> Result<Loaded<HospitalisationRecord>> {
    let loaded = read_hospitalisations(open(path)?, options)
        .with_context(|| format!("reading {}", path.display()))?;
    log_report(path, &loaded.report);
    Ok(loaded)
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawTest {
    #[serde(rename = "DATE")]
    date: Option<String>,
    #[serde(rename = "PROVINCE")]
    province: Option<String>,
    #[serde(rename = "REGION")]
    region: Option<String>,
    #[serde(rename = "TESTS_ALL")]
    tests_all: Option<String>,
    #[serde(rename = "TESTS_ALL_POS")]
    tests_all_pos: Option<String>,
}

pub fn read_tests<R: Read>(reader: R, options: &CleanOptions) -> Result<Loaded<TestRecord>> {
    read_rows(reader, options, |raw: RawTest, c| {
        Ok(TestRecord {
            date: parse_date(raw.date)?,
            tests_all: parse_count(raw.tests_all)?,
            tests_all_pos: parse_count(raw.tests_all_pos)?,
            province: c.category(raw.province)?,
            region: c.category(raw.region)?,
        })
    })
}

pub fn load_tests(path: &Path, options: &CleanOptions) -> Result<Loaded<TestRecord>> {
    let loaded = read_tests(open(path)?, options)
        .with_context(|| format!("reading {}", path.display()))?;
    log_report(path, &loaded.report);
    Ok(loaded)
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawMortality {
    #[serde(rename = "DATE")]
    date: Option<String>,
    #[serde(rename = "REGION")]
    region: Option<String>,
    #[serde(rename = "AGEGROUP")]
    age_group: Option<String>,
    #[serde(rename = "SEX")]
    sex: Option<String>,
    #[serde(rename = "DEATHS")]
    deaths: Option<String>,
}

pub fn read_mortality<R: Read>(
    reader: R,
    options: &CleanOptions,
) -> Result<Loaded<MortalityRecord>> {
    read_rows(reader, options, |raw: RawMortality, c| {
        Ok(MortalityRecord {
            date: parse_date(raw.date)?,
            deaths: parse_count(raw.deaths)?,
            region: c.category(raw.region)?,
            age_group: c.category(raw.age_group)?,
            sex: c.category(raw.sex)?,
        })
    })
}

pub fn load_mortality(path: &Path, options: &CleanOptions) -> Result<Loaded<MortalityRecord>> {
    let loaded = read_mortality(open(path)?, options)
        .with_context(|| format!("reading {}", path.display()))?;
    log_report(path, &loaded.report);
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &str = "\
DATE,PROVINCE,REGION,AGEGROUP,SEX,CASES
2020-03-01,Antwerpen,Flanders,10-19,F,5
2020-03-01,,Flanders,20-29,M,3
NA,Namur,Wallonia,30-39,F,4
2020-03-02,Namur,Wallonia,,F,
2020-13-40,Namur,Wallonia,40-49,M,1
2020-03-02,Liège,Wallonia,40-49,M,2
";

    #[test]
    fn test_read_cases_fills_missing_categories() {
        let loaded = read_cases(CASES.as_bytes(), &CleanOptions::default()).unwrap();

        assert_eq!(loaded.records.len(), 3);
        assert_eq!(loaded.records[1].province, "NA");
        assert_eq!(loaded.records[2].province, "Liège");
        assert_eq!(
            loaded.report,
            LoadReport {
                read: 6,
                kept: 3,
                dropped: 3,
                filled: 1
            }
        );
    }

    #[test]
    fn test_read_cases_drop_policy() {
        let options = CleanOptions {
            missing_category: MissingCategory::Drop,
        };
        let loaded = read_cases(CASES.as_bytes(), &options).unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert!(loaded.records.iter().all(|r| r.province != "NA"));
        assert_eq!(loaded.report.filled, 0);
    }

    #[test]
    fn test_custom_sentinel_label() {
        let options = CleanOptions {
            missing_category: MissingCategory::Sentinel("MISSING".into()),
        };
        let loaded = read_cases(CASES.as_bytes(), &options).unwrap();
        assert_eq!(loaded.records[1].province, "MISSING");
    }

    #[test]
    fn test_read_hospitalisations_ignores_extra_columns() {
        let csv = "\
DATE,PROVINCE,REGION,NR_REPORTING,TOTAL_IN,TOTAL_IN_ICU,TOTAL_IN_RESP,TOTAL_IN_ECMO,NEW_IN,NEW_OUT
2020-03-15,Antwerpen,Flanders,17,71,12,9,0,35,4
2020-03-15,BrabantWallon,Wallonia,5,x,1,0,0,2,0
";
        let loaded = read_hospitalisations(csv.as_bytes(), &CleanOptions::default()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        let r = &loaded.records[0];
        assert_eq!((r.total_in, r.total_in_icu, r.new_in, r.new_out), (71, 12, 35, 4));
        assert_eq!(loaded.report.dropped, 1);
    }

    #[test]
    fn test_read_tests_without_region_column() {
        let csv = "DATE,PROVINCE,TESTS_ALL,TESTS_ALL_POS\n2020-03-01,Namur,10,2\n";
        let loaded = read_tests(csv.as_bytes(), &CleanOptions::default()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].region, "NA");
        assert_eq!(loaded.records[0].tests_all_pos, 2);
    }

    #[test]
    fn test_short_row_is_dropped_not_fatal() {
        let csv = "DATE,REGION,AGEGROUP,SEX,DEATHS\n2020-03-10,Brussels\n2020-03-11,Brussels,85+,F,1\n";
        let loaded = read_mortality(csv.as_bytes(), &CleanOptions::default()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.report.dropped, 1);
    }

    #[test]
    fn test_date_and_count_parsing() {
        assert_eq!(
            parse_date(Some(" 2020-03-01 ".into())).ok(),
            NaiveDate::from_ymd_opt(2020, 3, 1)
        );
        assert!(matches!(parse_date(Some("NA".into())), Err(Rejected::Date)));
        assert!(matches!(parse_date(None), Err(Rejected::Date)));

        assert_eq!(parse_count(Some("42".into())).ok(), Some(42));
        assert!(matches!(parse_count(Some("-1".into())), Err(Rejected::Count)));
        assert!(matches!(parse_count(Some(String::new())), Err(Rejected::Count)));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let path = std::env::temp_dir().join("covid19be_test_does_not_exist.csv");
        assert!(load_cases(&path, &CleanOptions::default()).is_err());
    }
}

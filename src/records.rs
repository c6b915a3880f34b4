//! Cleaned rows of the published datasets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Label substituted for a missing categorical value.
pub const MISSING: &str = "NA";

/// Belgian provinces as spelled in the published files. Brussels is listed as
/// a province there.
pub const PROVINCES: [&str; 11] = [
    "Antwerpen",
    "BrabantWallon",
    "Brussels",
    "Hainaut",
    "Limburg",
    "Liège",
    "Luxembourg",
    "Namur",
    "OostVlaanderen",
    "VlaamsBrabant",
    "WestVlaanderen",
];

/// A categorical column rows can be filtered and grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Province,
    Region,
    AgeGroup,
    Sex,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Province => "PROVINCE",
            Dimension::Region => "REGION",
            Dimension::AgeGroup => "AGEGROUP",
            Dimension::Sex => "SEX",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Province => "Province",
            Dimension::Region => "Region",
            Dimension::AgeGroup => "Age Group",
            Dimension::Sex => "Sex",
        }
    }
}

/// A dated row with categorical dimensions and summable measures.
pub trait Observation {
    /// Names of the numeric columns, in `measure` index order.
    const MEASURES: &'static [&'static str];

    fn date(&self) -> NaiveDate;

    /// `None` when the dataset has no such column.
    fn dimension(&self, dim: Dimension) -> Option<&str>;

    fn measure(&self, index: usize) -> f64;
}

/// Confirmed cases by date, province, age group and sex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub date: NaiveDate,
    pub province: String,
    pub region: String,
    pub age_group: String,
    pub sex: String,
    pub cases: u64,
}

impl Observation for CaseRecord {
    const MEASURES: &'static [&'static str] = &["CASES"];

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        Some(match dim {
            Dimension::Province => self.province.as_str(),
            Dimension::Region => self.region.as_str(),
            Dimension::AgeGroup => self.age_group.as_str(),
            Dimension::Sex => self.sex.as_str(),
        })
    }

    fn measure(&self, index: usize) -> f64 {
        match index {
            0 => self.cases as f64,
            _ => f64::NAN,
        }
    }
}

/// Hospital occupancy and flows by date and province.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalisationRecord {
    pub date: NaiveDate,
    pub province: String,
    pub region: String,
    pub total_in: u64,
    pub total_in_icu: u64,
    pub new_in: u64,
    pub new_out: u64,
}

impl Observation for HospitalisationRecord {
    const MEASURES: &'static [&'static str] = &["TOTAL_IN", "TOTAL_IN_ICU", "NEW_IN", "NEW_OUT"];

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Province => Some(self.province.as_str()),
            Dimension::Region => Some(self.region.as_str()),
            _ => None,
        }
    }

    fn measure(&self, index: usize) -> f64 {
        match index {
            0 => self.total_in as f64,
            1 => self.total_in_icu as f64,
            2 => self.new_in as f64,
            3 => self.new_out as f64,
            _ => f64::NAN,
        }
    }
}

/// Tests performed and positive tests by date and province.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub date: NaiveDate,
    pub province: String,
    pub region: String,
    pub tests_all: u64,
    pub tests_all_pos: u64,
}

impl Observation for TestRecord {
    const MEASURES: &'static [&'static str] = &["TESTS_ALL", "TESTS_ALL_POS"];

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Province => Some(self.province.as_str()),
            Dimension::Region => Some(self.region.as_str()),
            _ => None,
        }
    }

    fn measure(&self, index: usize) -> f64 {
        match index {
            0 => self.tests_all as f64,
            1 => self.tests_all_pos as f64,
            _ => f64::NAN,
        }
    }
}

/// Deaths by date, region, age group and sex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MortalityRecord {
    pub date: NaiveDate,
    pub region: String,
    pub age_group: String,
    pub sex: String,
    pub deaths: u64,
}

impl Observation for MortalityRecord {
    const MEASURES: &'static [&'static str] = &["DEATHS"];

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Province => None,
            Dimension::Region => Some(self.region.as_str()),
            Dimension::AgeGroup => Some(self.age_group.as_str()),
            Dimension::Sex => Some(self.sex.as_str()),
        }
    }

    fn measure(&self, index: usize) -> f64 {
        match index {
            0 => self.deaths as f64,
            _ => f64::NAN,
        }
    }
}

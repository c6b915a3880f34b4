//! The Sciensano datasets this crate knows about and how to download them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::fetch::{HttpClient, fetch_bytes};

const BASE_URL: &str = "https://epistat.sciensano.be/Data";

/// One of the six published CSV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    CasesAgeSex,
    CasesMuniCum,
    CasesMuni,
    Hospitalisations,
    Mortality,
    Tests,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::CasesAgeSex,
        Dataset::CasesMuniCum,
        Dataset::CasesMuni,
        Dataset::Hospitalisations,
        Dataset::Mortality,
        Dataset::Tests,
    ];

    /// File name as published.
    pub fn remote_name(self) -> &'static str {
        match self {
            Dataset::CasesAgeSex => "COVID19BE_CASES_AGESEX.csv",
            Dataset::CasesMuniCum => "COVID19BE_CASES_MUNI_CUM.csv",
            Dataset::CasesMuni => "COVID19BE_CASES_MUNI.csv",
            Dataset::Hospitalisations => "COVID19BE_HOSP.csv",
            Dataset::Mortality => "COVID19BE_MORT.csv",
            Dataset::Tests => "COVID19BE_tests.csv",
        }
    }

    pub fn url(self) -> String {
        format!("{}/{}", BASE_URL, self.remote_name())
    }

    /// Local file name: the published name, lowercased.
    pub fn file_name(self) -> String {
        self.remote_name().to_lowercase()
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Downloads one dataset into `dir`, overwriting any previous copy.
#[tracing::instrument(skip(client, dir), fields(url = %dataset.url()))]
pub async fn download<C: HttpClient>(client: &C, dataset: Dataset, dir: &Path) -> Result<PathBuf> {
    let body = fetch_bytes(client, &dataset.url()).await?;
    let path = dataset.path_in(dir);
    std::fs::write(&path, &body).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), bytes = body.len(), "Dataset saved");
    Ok(path)
}

/// Downloads every dataset in turn. The first failure aborts the run.
pub async fn download_all<C: HttpClient>(client: &C, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut paths = Vec::with_capacity(Dataset::ALL.len());
    for dataset in Dataset::ALL {
        paths.push(download(client, dataset, dir).await?);
    }

    info!(count = paths.len(), dir = %dir.display(), "Download ready");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeClient;
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_urls_and_file_names() {
        assert_eq!(
            Dataset::Tests.url(),
            "https://epistat.sciensano.be/Data/COVID19BE_tests.csv"
        );
        assert_eq!(Dataset::Tests.file_name(), "covid19be_tests.csv");
        assert_eq!(
            Dataset::CasesAgeSex.file_name(),
            "covid19be_cases_agesex.csv"
        );
    }

    #[tokio::test]
    async fn test_download_all_writes_every_file() {
        let dir = temp_dir("covid19be_test_download_all");
        let client = Dataset::ALL.iter().fold(FakeClient::default(), |c, d| {
            c.with(&d.url(), 200, d.remote_name().as_bytes())
        });

        let paths = download_all(&client, &dir).await.unwrap();

        assert_eq!(paths.len(), 6);
        let content = fs::read_to_string(dir.join("covid19be_hosp.csv")).unwrap();
        assert_eq!(content, "COVID19BE_HOSP.csv");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_download_all_stops_at_first_failure() {
        let dir = temp_dir("covid19be_test_download_fail");
        // Only the first dataset is served; the second answers 404.
        let client = FakeClient::default().with(&Dataset::CasesAgeSex.url(), 200, b"ok");

        let result = download_all(&client, &dir).await;

        assert!(result.is_err());
        assert_eq!(client.requested.lock().unwrap().len(), 2);
        assert!(dir.join("covid19be_cases_agesex.csv").exists());
        assert!(!dir.join("covid19be_tests.csv").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use jobsignal_common::CompanyDirectory;

/// Load the company directory. A missing or malformed file yields an empty
/// directory; within a readable file, a missing or non-array list is empty
/// and individual malformed entries are skipped.
pub async fn load_directory(path: &Path) -> CompanyDirectory {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Company directory unreadable, using empty directory");
            return CompanyDirectory::default();
        }
    };
    let directory = parse_directory(&raw);
    info!(
        path = %path.display(),
        greenhouse = directory.greenhouse_boards.len(),
        lever = directory.lever_companies.len(),
        ashby = directory.ashby_orgs.len(),
        smartrecruiters = directory.smart_recruiters_companies.len(),
        "Company directory loaded"
    );
    directory
}

pub fn parse_directory(raw: &str) -> CompanyDirectory {
    let root: Value = match serde_json::from_str(raw) {
        Ok(root) => root,
        Err(e) => {
            warn!(error = %e, "Company directory is not valid JSON, using empty directory");
            return CompanyDirectory::default();
        }
    };

    CompanyDirectory {
        greenhouse_boards: lenient_list(&root, "greenhouseBoards"),
        lever_companies: lenient_list(&root, "leverCompanies"),
        ashby_orgs: lenient_list(&root, "ashbyOrgs"),
        smart_recruiters_companies: lenient_list(&root, "smartRecruitersCompanies"),
    }
}

fn lenient_list<T: DeserializeOwned>(root: &Value, key: &str) -> Vec<T> {
    let Some(entries) = root.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match T::deserialize(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(list = key, error = %e, "Skipping malformed directory entry");
                None
            }
        })
        .collect()
}

//! Run inputs: the ordered job-link list and the candidate memory mapping.
//! Both are loaded once before the session starts; failures here degrade to
//! an empty run rather than a crash, so a bad input file still produces a
//! clean log trail.

use std::fs::File;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is not a JSON object: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} has no \"Link\" column")]
    MissingLinkColumn(String),
}

/// Reads the ordered job links from a CSV with a `Link` column. Blank cells
/// are dropped; order is preserved.
pub fn load_job_links(path: &Path) -> Result<Vec<String>, InputError> {
    let display_path = path.display().to_string();
    let file = File::open(path).map_err(|source| InputError::Io {
        path: display_path.clone(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let link_index = reader
        .headers()
        .map_err(|source| InputError::Csv {
            path: display_path.clone(),
            source,
        })?
        .iter()
        .position(|h| h.trim() == "Link")
        .ok_or_else(|| InputError::MissingLinkColumn(display_path.clone()))?;

    let mut links = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| InputError::Csv {
            path: display_path.clone(),
            source,
        })?;
        if let Some(link) = record.get(link_index) {
            let link = link.trim();
            if !link.is_empty() {
                links.push(link.to_string());
            }
        }
    }

    info!(count = links.len(), path = %display_path, "loaded job links");
    Ok(links)
}

/// Reads the candidate profile/FAQ mapping. Read-only for the rest of the
/// run.
pub fn load_candidate_memory(path: &Path) -> Result<Map<String, Value>, InputError> {
    let display_path = path.display().to_string();
    let file = File::open(path).map_err(|source| InputError::Io {
        path: display_path.clone(),
        source,
    })?;
    let memory: Map<String, Value> =
        serde_json::from_reader(file).map_err(|source| InputError::Json {
            path: display_path.clone(),
            source,
        })?;

    info!(fields = memory.len(), path = %display_path, "loaded candidate memory");
    Ok(memory)
}

/// Forgiving wrapper used at startup: a missing or broken links file means
/// an empty run, not a crash.
pub fn load_job_links_or_empty(path: &Path) -> Vec<String> {
    match load_job_links(path) {
        Ok(links) => links,
        Err(e) => {
            warn!(error = %e, "could not load job links, continuing with none");
            Vec::new()
        }
    }
}

/// Same policy for the memory file: the planner just gets an empty mapping.
pub fn load_candidate_memory_or_empty(path: &Path) -> Map<String, Value> {
    match load_candidate_memory(path) {
        Ok(memory) => memory,
        Err(e) => {
            warn!(error = %e, "could not load candidate memory, continuing empty");
            Map::new()
        }
    }
}

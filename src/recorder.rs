//! Append-only persistence of per-link outcomes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::session::Outcome;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("failed to prepare results directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write result row: {0}")]
    Csv(#[from] csv::Error),
}

/// Persists one terminated link. Append-only; the storage format is the
/// implementation's business.
#[async_trait]
pub trait ResultRecorder: Send + Sync {
    async fn record(&self, outcome: &Outcome) -> Result<(), RecorderError>;
}

const COLUMNS: [&str; 19] = [
    "Date",
    "Time",
    "Link",
    "Status",
    "Job Title",
    "Company Name",
    "Location",
    "Location Type",
    "Employment Type",
    "Seniority Level",
    "Summary",
    "Responsibilities",
    "Minimum Qualifications",
    "Preferred Qualifications",
    "Tech Stack / Skills",
    "Salary",
    "Equity",
    "Perks / Benefits",
    "Relevance Score",
];

/// CSV-backed recorder. One file per run, named after the run's start time,
/// with the header written on creation and one row appended per link.
pub struct CsvRecorder {
    path: PathBuf,
    // csv::Writer is not Sync; single-threaded appends are all we need
    lock: Mutex<()>,
}

impl CsvRecorder {
    pub fn new(output_dir: &Path) -> Result<Self, RecorderError> {
        fs::create_dir_all(output_dir)?;
        let stamp = Local::now().format("%Y-%m-%d_%H%M");
        let path = output_dir.join(format!("application_results_{stamp}.csv"));
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, outcome: &Outcome) -> Result<(), RecorderError> {
        let _guard = match self.lock.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };

        let is_new = !self.path.exists();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);

        if is_new {
            writer.write_record(COLUMNS)?;
        }

        let now = Local::now();
        let summary = outcome.summary.as_map();
        let mut row: Vec<String> = Vec::with_capacity(COLUMNS.len());
        row.push(now.format("%Y-%m-%d").to_string());
        row.push(now.format("%H:%M:%S").to_string());
        row.push(outcome.link.clone());
        row.push(outcome.status.as_str().to_string());
        for column in &COLUMNS[4..] {
            row.push(field_text(summary.get(*column)));
        }
        writer.write_record(&row)?;
        writer.flush()?;
        Ok(())
    }
}

/// Flattens a summary value to CSV text. Lists become "; "-joined strings,
/// scalars lose their JSON quoting.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl ResultRecorder for CsvRecorder {
    async fn record(&self, outcome: &Outcome) -> Result<(), RecorderError> {
        self.append(outcome)?;
        info!(link = %outcome.link, status = outcome.status.as_str(), "result saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{JobContext, OutcomeStatus};
    use serde_json::json;

    fn outcome(link: &str, status: OutcomeStatus) -> Outcome {
        let mut summary = JobContext::new();
        let mut fields = serde_json::Map::new();
        fields.insert("Job Title".into(), json!("Platform Engineer"));
        fields.insert("Tech Stack / Skills".into(), json!(["Rust", "Postgres"]));
        fields.insert("Relevance Score".into(), json!(8));
        summary.merge(&fields);
        Outcome {
            link: link.into(),
            status,
            reason: None,
            summary,
        }
    }

    #[tokio::test]
    async fn writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = CsvRecorder::new(dir.path()).unwrap();

        recorder
            .record(&outcome("https://a.example/jobs/1", OutcomeStatus::Success))
            .await
            .unwrap();
        recorder
            .record(&outcome("https://a.example/jobs/2", OutcomeStatus::Failed))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(recorder.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date,Time,Link,Status,Job Title"));
        assert!(lines[1].contains("Success"));
        assert!(lines[1].contains("Rust; Postgres"));
        assert!(lines[2].contains("Failed"));
    }

    #[test]
    fn field_text_flattens_lists_and_scalars() {
        assert_eq!(field_text(None), "");
        assert_eq!(field_text(Some(&json!("plain"))), "plain");
        assert_eq!(field_text(Some(&json!(["a", "b"]))), "a; b");
        assert_eq!(field_text(Some(&json!(7))), "7");
    }
}

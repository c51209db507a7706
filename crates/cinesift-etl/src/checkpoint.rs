//! Resumable progress markers for long-running jobs.
//!
//! One JSON file per job under the checkpoint directory. A file is written
//! after every fully processed page and removed when the job completes, so
//! its presence means "interrupted here".

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EtlError, EtlResult};

/// Where a job stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub job: String,
    /// Release year for per-year movie listings; `None` for single-unit jobs.
    #[serde(default)]
    pub unit: Option<i32>,
    /// First page not yet processed.
    #[serde(default)]
    pub next_page: u32,
    /// Range cursor for index scans.
    #[serde(default)]
    pub cursor: Option<String>,
    pub run_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn page(job: impl Into<String>, run_id: Uuid, unit: Option<i32>, next_page: u32) -> Self {
        Self {
            job: job.into(),
            unit,
            next_page,
            cursor: None,
            run_id,
            updated_at: Utc::now(),
        }
    }

    pub fn cursor(job: impl Into<String>, run_id: Uuid, cursor: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            unit: None,
            next_page: 0,
            cursor: Some(cursor.into()),
            run_id,
            updated_at: Utc::now(),
        }
    }
}

/// Directory of checkpoint files.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, job: &str) -> PathBuf {
        self.dir.join(format!("{job}.checkpoint.json"))
    }

    /// The saved checkpoint for `job`, if any.
    pub fn load(&self, job: &str) -> EtlResult<Option<Checkpoint>> {
        let path = self.path(job);
        if !path.exists() {
            return Ok(None);
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| EtlError::checkpoint(&path, e))?;
        let checkpoint =
            serde_json::from_str(&contents).map_err(|e| EtlError::checkpoint(&path, e))?;
        Ok(Some(checkpoint))
    }

    /// Persist `checkpoint`, replacing any earlier one for the same job.
    pub fn save(&self, checkpoint: &Checkpoint) -> EtlResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| EtlError::checkpoint(&self.dir, e))?;

        let path = self.path(&checkpoint.job);
        let staging = path.with_extension("json.tmp");
        let contents =
            serde_json::to_string_pretty(checkpoint).map_err(|e| EtlError::checkpoint(&path, e))?;

        std::fs::write(&staging, contents).map_err(|e| EtlError::checkpoint(&staging, e))?;
        std::fs::rename(&staging, &path).map_err(|e| EtlError::checkpoint(&path, e))?;

        log::debug!("Checkpoint saved to {}", path.display());
        Ok(())
    }

    /// Remove the checkpoint for `job`; a missing file is not an error.
    pub fn clear(&self, job: &str) -> EtlResult<()> {
        let path = self.path(job);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EtlError::checkpoint(&path, e)),
        }
    }
}

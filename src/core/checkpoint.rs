//! Persisted resume point: the last location whose batch was accepted.
//!
//! Written after every successful upload via temp file + rename, so the file
//! on disk is always either the previous or the new checkpoint.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::cursor::Location;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint
{
    pub run_id: String,
    /// Last article of the last uploaded batch
    pub last_uploaded: Location,
    /// Batches uploaded so far, across resumed runs
    pub batches: usize,
    pub documents: usize,
    pub updated_at: String, // RFC3339
}

impl Checkpoint
{
    pub fn new(
        run_id: impl Into<String>,
        last_uploaded: Location,
        batches: usize,
        documents: usize,
    ) -> Self
    {
        Self {
            run_id: run_id.into(),
            last_uploaded,
            batches,
            documents,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// `<dir>/<run_id>.checkpoint.json`
pub fn checkpoint_path(
    dir: &Path,
    run_id: &str,
) -> PathBuf
{
    dir.join(format!("{run_id}.checkpoint.json"))
}

/// Load the checkpoint for `run_id`, if one was written.
pub fn load(
    dir: &Path,
    run_id: &str,
) -> Result<Option<Checkpoint>>
{
    let path = checkpoint_path(dir, run_id);
    if !path.exists()
    {
        return Ok(None);
    }
    let text =
        fs::read_to_string(&path).with_context(|| format!("read checkpoint: {}", path.display()))?;
    let cp = serde_json::from_str(&text)
        .with_context(|| format!("parse checkpoint: {}", path.display()))?;
    Ok(Some(cp))
}

pub fn save(
    dir: &Path,
    checkpoint: &Checkpoint,
) -> Result<()>
{
    fs::create_dir_all(dir).with_context(|| format!("create checkpoint dir: {}", dir.display()))?;

    let path = checkpoint_path(dir, &checkpoint.run_id);
    let tmp = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(checkpoint).context("serialize checkpoint")?;

    fs::write(&tmp, text).with_context(|| format!("write checkpoint tmp: {}", tmp.display()))?;
    File::open(&tmp)?.sync_all().ok();
    fs::rename(&tmp, &path)
        .with_context(|| format!("rename {} → {}", tmp.display(), path.display()))?;
    Ok(())
}

//! Indexing collaborator seam.
//!
//! The core only needs "submit this payload, tell me if it worked". The
//! bundled [`DirectoryUploader`] writes each payload to disk with a manifest
//! so batches can be inspected or replayed by a separate sender.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the collaborator reports for an accepted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse
{
    /// Collaborator-specific receipt (file name, request id, ...)
    pub receipt: String,
    pub adds: usize,
    pub bytes: usize,
}

/// Accepts one batch payload per call; each call is atomic.
pub trait Uploader: Send + Sync
{
    fn upload(
        &self,
        documents: &[u8],
        content_type: &str,
    ) -> Result<UploadResponse>;
}

/// Manifest line appended for every stored batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry
{
    pub file: String,
    pub bytes: usize,
    pub adds: usize,
    pub content_type: String,
    pub checksum: String, // blake3:<hex>
    pub stored_at: String,
}

/// Stores payloads as `batch-NNNNNN.json` plus `manifest.jsonl`.
#[derive(Debug)]
pub struct DirectoryUploader
{
    dir: PathBuf,
    next: std::sync::atomic::AtomicUsize,
}

impl DirectoryUploader
{
    /// Create the output directory; numbering continues after existing
    /// batch files so a resumed run never overwrites earlier output.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self>
    {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create output dir: {}", dir.display()))?;

        let existing = fs::read_dir(&dir)
            .with_context(|| format!("list output dir: {}", dir.display()))?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix("batch-"))
                    .and_then(|n| n.strip_suffix(".json"))
                    .and_then(|n| n.parse::<usize>().ok())
            })
            .max()
            .unwrap_or(0);

        Ok(Self { dir, next: std::sync::atomic::AtomicUsize::new(existing + 1) })
    }

    pub fn dir(&self) -> &Path
    {
        &self.dir
    }

    fn append_manifest(
        &self,
        entry: &ManifestEntry,
    ) -> Result<()>
    {
        let path = self.dir.join("manifest.jsonl");
        let line = serde_json::to_string(entry).context("serialize manifest entry")?;

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open manifest: {}", path.display()))?;
        writeln!(f, "{line}").context("append manifest")?;
        Ok(())
    }
}

impl Uploader for DirectoryUploader
{
    fn upload(
        &self,
        documents: &[u8],
        content_type: &str,
    ) -> Result<UploadResponse>
    {
        let adds = count_documents(documents)?;
        let n = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let name = format!("batch-{n:06}.json");
        let final_path = self.dir.join(&name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));

        // Stage in a temp file, then rename into place
        fs::write(&tmp_path, documents)
            .with_context(|| format!("write batch tmp: {}", tmp_path.display()))?;
        File::open(&tmp_path)?.sync_all().ok();
        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!("rename {} → {}", tmp_path.display(), final_path.display())
        })?;

        let entry = ManifestEntry {
            file: name.clone(),
            bytes: documents.len(),
            adds,
            content_type: content_type.to_string(),
            checksum: format!("blake3:{}", blake3::hash(documents).to_hex()),
            stored_at: Utc::now().to_rfc3339(),
        };
        self.append_manifest(&entry)?;
        debug!(file = %final_path.display(), bytes = documents.len(), adds, "stored batch");

        Ok(UploadResponse { receipt: name, adds, bytes: documents.len() })
    }
}

/// Count top-level documents in a JSON array payload.
fn count_documents(documents: &[u8]) -> Result<usize>
{
    let value: serde_json::Value =
        serde_json::from_slice(documents).context("batch payload is not valid JSON")?;
    value
        .as_array()
        .map(Vec::len)
        .context("batch payload is not a JSON array")
}

/// Read back the manifest written by a [`DirectoryUploader`].
pub fn read_manifest(dir: &Path) -> Result<Vec<ManifestEntry>>
{
    let path = dir.join("manifest.jsonl");
    if !path.exists()
    {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("read manifest: {}", path.display()))?;

    text.lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, l)| {
            serde_json::from_str(l).with_context(|| format!("manifest line {}", i + 1))
        })
        .collect()
}

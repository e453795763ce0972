//! Append-only JSON Lines log of everything a run skipped or shipped.
//!
//! One file per run id (`<log_dir>/<run_id>.log`). Each append takes an
//! exclusive `fd-lock` on the file so runs for different years can share a
//! log directory, and two processes on the same run id never interleave a
//! line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::article::FormatDefect;
use crate::core::cursor::Location;
use crate::core::error::ArchiveError;

/// What happened, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent
{
    Started
    {
        base: String,
        years: String,
        resume_after: Option<String>,
    },
    FormatDefect
    {
        location: String,
        line: usize,
        expected: String,
        missing: bool,
    },
    Rejected
    {
        location: Option<String>,
        message: String,
    },
    IoError
    {
        message: String,
    },
    Oversize
    {
        location: String,
        message: String,
    },
    BatchUploaded
    {
        sequence: usize,
        documents: usize,
        bytes: usize,
        receipt: String,
        last: String,
    },
    Done
    {
        visited: usize,
        documents: usize,
        batches: usize,
    },
}

/// One line in the log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry
{
    pub at: String, // RFC3339
    #[serde(flatten)]
    pub event: LogEvent,
}

impl LogEvent
{
    pub fn format_defect(
        location: &Location,
        defect: &FormatDefect,
    ) -> Self
    {
        LogEvent::FormatDefect {
            location: location.to_string(),
            line: defect.line,
            expected: defect
                .expected
                .as_str()
                .to_string(),
            missing: defect.missing,
        }
    }

    /// Map a skipped-item error to its log event.
    pub fn from_error(err: &ArchiveError) -> Self
    {
        match err
        {
            ArchiveError::Io { .. } | ArchiveError::Read { .. } =>
            {
                LogEvent::IoError { message: format!("{err:#}") }
            }
            ArchiveError::InvalidField { location, .. } =>
            {
                LogEvent::Rejected { location: Some(location.to_string()), message: err.to_string() }
            }
            ArchiveError::OversizeRecord { id, .. } =>
            {
                LogEvent::Oversize { location: id.clone(), message: err.to_string() }
            }
            ArchiveError::Upload { .. } =>
            {
                LogEvent::Rejected { location: None, message: format!("{err:#}") }
            }
        }
    }
}

/// Handle to a run's log file. Cheap to clone; opens the file per append.
#[derive(Debug, Clone)]
pub struct RunLog
{
    path: PathBuf,
}

impl RunLog
{
    /// Create the log directory and make sure the file can be opened.
    pub fn open(
        log_dir: &Path,
        run_id: &str,
    ) -> Result<Self>
    {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("create log dir: {}", log_dir.display()))?;
        let path = log_dir.join(format!("{run_id}.log"));
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open run log: {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn append(
        &self,
        event: LogEvent,
    ) -> Result<()>
    {
        let entry = LogEntry { at: Utc::now().to_rfc3339(), event };
        let mut line = serde_json::to_string(&entry).context("serialize log entry")?;
        line.push('\n');

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open run log: {}", self.path.display()))?;

        let mut lock = RwLock::new(file);
        let mut guard = lock
            .write()
            .with_context(|| format!("lock run log: {}", self.path.display()))?;
        guard
            .write_all(line.as_bytes())
            .context("append run log")?;
        Ok(())
    }

    /// Parse every entry back, in append order.
    pub fn read(&self) -> Result<Vec<LogEntry>>
    {
        read_entries(&self.path)
    }
}

/// Run id keying the log and checkpoint: the start year, or `all`.
pub fn run_id(start_year: Option<u32>) -> String
{
    match start_year
    {
        Some(y) => y.to_string(),
        None => "all".to_string(),
    }
}

pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>>
{
    let text =
        fs::read_to_string(path).with_context(|| format!("read run log: {}", path.display()))?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, l)| serde_json::from_str(l).with_context(|| format!("run log line {}", i + 1)))
        .collect()
}

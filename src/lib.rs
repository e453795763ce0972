//! **archdex** - Walks a `YYYY/MM/DD/<number>.<type>` text archive, extracts
//! article records and ships them to an indexing service in size-bounded batches.
//!
//! Deterministic traversal, parallel parsing with order preserved, and a
//! checkpoint after every accepted batch so interrupted runs can resume.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core processing pipeline - traversal, parsing, batching and upload
pub mod core {
    /// Error taxonomy for listing, parsing, batching and upload
    pub mod error;
    pub use error::{ArchiveError, Level, PartialLocation};

    /// Per-level directory listings with ignore globs
    pub mod index;
    pub use index::{NumberedDirs, PathIndex};

    /// Resumable four-level archive traversal
    pub mod cursor;
    pub use cursor::{ArchiveCursor, Location, TraversalState};

    /// Article text → record, with byline and vocabulary handling
    pub mod article;
    pub use article::{ArticleParser, ArticleRecord, ArticleType, AuthorTitles, FormatDefect};

    /// Size-bounded, order-preserving batch accumulation
    pub mod batch;
    pub use batch::{Batch, BatchAccumulator, BatchLimits, Framing};

    /// Upload envelope encoding
    pub mod document;
    pub use document::{EncodedDocument, encode};

    /// Indexing collaborator trait and the directory-backed uploader
    pub mod upload;
    pub use upload::{DirectoryUploader, UploadResponse, Uploader};

    /// Resume point persisted after each accepted batch
    pub mod checkpoint;
    pub use checkpoint::Checkpoint;

    /// End-to-end run: traverse → parse → batch → upload
    pub mod pipeline;
    pub use pipeline::{Pipeline, PipelineOptions, RunSummary, run as pipeline_run};

    /// Archive tree visualization with per-day article counts
    pub mod tree;
    pub use tree::run as tree_run;
}

/// Infrastructure - Configuration, I/O, logging
pub mod infra {
    /// Layered configuration (file + ARCHDEX__ env vars)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use io::{FileContent, read_file_smart};

    /// tracing subscriber setup
    pub mod logging;

    /// Append-only JSON Lines run log
    pub mod run_log;
    pub use run_log::{LogEntry, LogEvent, RunLog};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{pipeline_run, tree_run};
pub use infra::{Config, load_config};

// Core types for external consumers
pub use crate::core::{ArchiveCursor, ArchiveError, ArticleParser, ArticleRecord, Location};

//! Filepath: src/core/pipeline.rs
//! Traverse → read/parse (parallel, order kept) → encode → batch → upload.
//!
//! - Locations are pulled from the cursor in windows; each window is read and
//!   parsed on the rayon pool and collected back in traversal order
//! - Format defects, rejected records and unreadable entries are logged and
//!   skipped; only the base directory, the run log and the uploader can fail
//!   a run
//! - Batches are uploaded one at a time in sequence order and the checkpoint
//!   is rewritten after each accepted batch

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use tabled::{Table, Tabled};
use tracing::{debug, info, instrument, warn};

use crate::cli::{AppContext, ParseArgs, RunArgs};
use crate::core::article::{ArticleParser, ParsedArticle, pretty_print};
use crate::core::batch::{Batch, BatchAccumulator, BatchLimits};
use crate::core::checkpoint::{self, Checkpoint};
use crate::core::cursor::{ArchiveCursor, Location};
use crate::core::document::{
    CONTENT_TYPE, EncodedDocument, PAYLOAD_FRAMING, encode, encoded_len, payload,
};
use crate::core::error::ArchiveError;
use crate::core::index::PathIndex;
use crate::core::upload::{DirectoryUploader, Uploader};
use crate::infra::config::{Config, expand_path, load_config};
use crate::infra::io::read_file_smart;
use crate::infra::run_log::{LogEvent, RunLog, run_id};

/// Everything a run needs, resolved from config and flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions
{
    pub base: PathBuf,
    /// Start inclusive, end exclusive
    pub years: Range<u32>,
    pub run_id: String,
    pub parse_window: usize,
    pub max_articles: Option<usize>,
    pub resume_after: Option<Location>,
    /// Batch and document totals carried over from the resumed checkpoint
    pub prior_batches: usize,
    pub prior_documents: usize,
    pub limits: BatchLimits,
    pub checkpoint_dir: PathBuf,
}

impl PipelineOptions
{
    /// Defaults for walking every year under `base`.
    pub fn new(
        base: impl Into<PathBuf>,
        checkpoint_dir: impl Into<PathBuf>,
    ) -> Self
    {
        Self {
            base: base.into(),
            years: 0..u32::MAX,
            run_id: run_id(None),
            parse_window: 64,
            max_articles: None,
            resume_after: None,
            prior_batches: 0,
            prior_documents: 0,
            limits: BatchLimits::service(),
            checkpoint_dir: checkpoint_dir.into(),
        }
    }

    /// Merge CLI flags over the loaded config.
    pub fn resolve(
        args: &RunArgs,
        config: &Config,
    ) -> Result<Self>
    {
        let base = args
            .base
            .clone()
            .unwrap_or_else(|| config.archive.base_path.clone());
        let checkpoint_dir = args
            .checkpoint_dir
            .clone()
            .unwrap_or_else(|| config.output.checkpoint_dir.clone());

        let start = args.start_year.or(config.archive.start_year);
        let end = args.end_year.or(config.archive.end_year);
        let years = year_range(start, end)?;

        let mut options = Self::new(expand_path(&base)?, expand_path(&checkpoint_dir)?);
        options.years = years;
        options.run_id = run_id(start);
        options.parse_window = args
            .parse_window
            .unwrap_or(config.pipeline.parse_window)
            .max(1);
        options.max_articles = args.max_articles;

        if args.resume
        {
            match checkpoint::load(&options.checkpoint_dir, &options.run_id)?
            {
                Some(cp) =>
                {
                    info!(after = %cp.last_uploaded, "resuming from checkpoint");
                    options.prior_batches = cp.batches;
                    options.prior_documents = cp.documents;
                    options.resume_after = Some(cp.last_uploaded);
                }
                None => warn!(run_id = %options.run_id, "no checkpoint found, starting fresh"),
            }
        }

        Ok(options)
    }
}

/// Half-open year range from optional bounds.
pub fn year_range(
    start: Option<u32>,
    end: Option<u32>,
) -> Result<Range<u32>>
{
    let range = start.unwrap_or(0)..end.unwrap_or(u32::MAX);
    if range.start >= range.end
    {
        anyhow::bail!("start year {} is not before end year {}", range.start, range.end);
    }
    Ok(range)
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary
{
    /// Locations yielded by the cursor
    pub visited: usize,
    /// Records accepted into a batch
    pub documents: usize,
    pub defects: usize,
    pub rejected: usize,
    pub io_errors: usize,
    pub oversize: usize,
    pub batches: usize,
    /// Documents inside shipped batches
    pub uploaded: usize,
    pub bytes: usize,
    pub last_uploaded: Option<Location>,
}

impl RunSummary
{
    pub fn table(&self) -> String
    {
        #[derive(Tabled)]
        struct Row
        {
            metric: &'static str,
            value: usize,
        }

        let rows = vec![
            Row { metric: "articles visited", value: self.visited },
            Row { metric: "records batched", value: self.documents },
            Row { metric: "format defects", value: self.defects },
            Row { metric: "rejected", value: self.rejected },
            Row { metric: "io errors", value: self.io_errors },
            Row { metric: "oversize", value: self.oversize },
            Row { metric: "batches", value: self.batches },
            Row { metric: "bytes", value: self.bytes },
        ];
        Table::new(rows).to_string()
    }
}

pub struct Pipeline
{
    options: PipelineOptions,
    parser: ArticleParser,
    index: PathIndex,
    log: RunLog,
    progress: ProgressBar,
}

impl Pipeline
{
    pub fn new(
        options: PipelineOptions,
        parser: ArticleParser,
        index: PathIndex,
        log: RunLog,
    ) -> Self
    {
        Self { options, parser, index, log, progress: ProgressBar::hidden() }
    }

    pub fn with_progress(
        mut self,
        progress: ProgressBar,
    ) -> Self
    {
        self.progress = progress;
        self
    }

    /// Run to completion against `uploader`. Without one the run is a dry
    /// run: batches are built and logged but nothing is uploaded or
    /// checkpointed.
    ///
    /// # Errors
    ///
    /// Fails when the base directory cannot be listed, the run log cannot be
    /// written, or a batch upload or checkpoint write fails. The checkpoint
    /// on disk then still names the last accepted batch.
    #[instrument(skip_all, fields(run_id = %self.options.run_id, dry_run = uploader.is_none()))]
    pub fn execute(
        &self,
        uploader: Option<&dyn Uploader>,
    ) -> Result<RunSummary>
    {
        let opts = &self.options;
        let mut cursor = ArchiveCursor::open(&opts.base, self.index.clone(), opts.years.clone())
            .with_context(|| format!("Failed to open archive {}", opts.base.display()))?;
        if let Some(after) = opts.resume_after.clone()
        {
            cursor = cursor.resume_after(after);
        }

        self.log.append(LogEvent::Started {
            base: dunce::canonicalize(&opts.base)
                .unwrap_or_else(|_| opts.base.clone())
                .display()
                .to_string(),
            years: format!("{}..{}", opts.years.start, opts.years.end),
            resume_after: opts
                .resume_after
                .as_ref()
                .map(Location::to_string),
        })?;

        let mut summary = RunSummary::default();
        let mut acc = BatchAccumulator::new(opts.limits, PAYLOAD_FRAMING, encoded_len);
        let mut window: Vec<Location> = Vec::with_capacity(opts.parse_window);

        loop
        {
            window.clear();
            self.fill_window(&mut cursor, &mut window, &mut summary)?;
            if window.is_empty()
            {
                break;
            }

            let parser = &self.parser;
            let base = opts.base.as_path();
            let parsed: Vec<Result<ParsedArticle, ArchiveError>> = window
                .par_iter()
                .map(|loc| read_and_parse(parser, base, loc))
                .collect();

            for result in parsed
            {
                self.absorb(result, &mut acc, &mut summary)?;
                while let Some(batch) = acc.flush_if_needed()
                {
                    self.ship(batch, uploader, &mut summary)?;
                }
            }
            self.progress
                .set_position(summary.visited as u64);
        }

        while let Some(batch) = acc.finalize()
        {
            self.ship(batch, uploader, &mut summary)?;
        }

        self.log.append(LogEvent::Done {
            visited: summary.visited,
            documents: summary.documents,
            batches: summary.batches,
        })?;
        self.progress
            .finish_and_clear();
        info!(visited = summary.visited, batches = summary.batches, "run complete");

        Ok(summary)
    }

    /// Pull up to `parse_window` locations, logging listing failures.
    fn fill_window(
        &self,
        cursor: &mut ArchiveCursor,
        window: &mut Vec<Location>,
        summary: &mut RunSummary,
    ) -> Result<()>
    {
        while window.len() < self.options.parse_window
        {
            if let Some(max) = self.options.max_articles
                && summary.visited >= max
            {
                break;
            }
            match cursor.next()
            {
                None => break,
                Some(Ok(loc)) =>
                {
                    summary.visited += 1;
                    window.push(loc);
                }
                Some(Err(e)) =>
                {
                    summary.io_errors += 1;
                    warn!(error = %e, "skipping unreadable directory");
                    self.log.append(LogEvent::from_error(&e))?;
                }
            }
        }
        Ok(())
    }

    /// Record one parse outcome and offer the record for batching.
    fn absorb<F>(
        &self,
        result: Result<ParsedArticle, ArchiveError>,
        acc: &mut BatchAccumulator<EncodedDocument, F>,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        F: Fn(&EncodedDocument) -> usize,
    {
        let parsed = match result
        {
            Ok(p) => p,
            Err(e) =>
            {
                match e
                {
                    ArchiveError::InvalidField { .. } => summary.rejected += 1,
                    _ => summary.io_errors += 1,
                }
                debug!(error = %e, "skipping article");
                return self.log.append(LogEvent::from_error(&e));
            }
        };

        for defect in &parsed.defects
        {
            summary.defects += 1;
            self.log.append(LogEvent::format_defect(&parsed.record.location, defect))?;
        }

        let doc = match encode(&parsed.record)
        {
            Ok(d) => d,
            Err(e) =>
            {
                summary.rejected += 1;
                return self.log.append(LogEvent::Rejected {
                    location: Some(parsed.record.location.to_string()),
                    message: format!("{e:#}"),
                });
            }
        };

        match acc.offer(doc, |d| d.location.to_string())
        {
            Ok(()) => summary.documents += 1,
            Err(e) =>
            {
                summary.oversize += 1;
                warn!(error = %e, "dropping oversize record");
                self.log.append(LogEvent::from_error(&e))?;
            }
        }
        Ok(())
    }

    /// Upload one sealed batch and move the checkpoint forward.
    fn ship(
        &self,
        batch: Batch<EncodedDocument>,
        uploader: Option<&dyn Uploader>,
        summary: &mut RunSummary,
    ) -> Result<()>
    {
        let Some(last) = batch
            .items
            .last()
            .map(|d| d.location.clone())
        else
        {
            return Ok(());
        };

        let Some(uploader) = uploader
        else
        {
            info!(
                sequence = batch.sequence,
                documents = batch.len(),
                bytes = batch.bytes,
                "dry run: batch not uploaded"
            );
            summary.batches += 1;
            summary.bytes += batch.bytes;
            summary.uploaded += batch.len();
            return Ok(());
        };

        let body = payload(&batch);
        let response = uploader
            .upload(&body, CONTENT_TYPE)
            .map_err(|source| ArchiveError::Upload { sequence: batch.sequence, source })?;

        summary.batches += 1;
        summary.bytes += batch.bytes;
        summary.uploaded += batch.len();
        summary.last_uploaded = Some(last.clone());

        self.log.append(LogEvent::BatchUploaded {
            sequence: batch.sequence,
            documents: batch.len(),
            bytes: batch.bytes,
            receipt: response.receipt,
            last: last.to_string(),
        })?;

        let opts = &self.options;
        checkpoint::save(
            &opts.checkpoint_dir,
            &Checkpoint::new(
                opts.run_id.clone(),
                last,
                opts.prior_batches + summary.batches,
                opts.prior_documents + summary.uploaded,
            ),
        )?;
        debug!(sequence = batch.sequence, "checkpoint saved");
        Ok(())
    }
}

fn read_and_parse(
    parser: &ArticleParser,
    base: &Path,
    location: &Location,
) -> Result<ParsedArticle, ArchiveError>
{
    let content = read_file_smart(location.path_in(base))
        .map_err(|source| ArchiveError::Read { location: location.clone(), source })?;
    parser.parse(content.as_ref(), location)
}

pub fn run(
    args: RunArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    let options = PipelineOptions::resolve(&args, &config)?;

    // Combine config ignore patterns with CLI args
    let mut ignore_patterns = config
        .archive
        .ignore_patterns
        .clone();
    ignore_patterns.extend(args.ignore.iter().cloned());
    let index = PathIndex::new(&ignore_patterns)?;

    let log_dir = expand_path(
        args.log_dir
            .as_deref()
            .unwrap_or(config.output.log_dir.as_path()),
    )?;
    let out_dir = expand_path(
        args.out_dir
            .as_deref()
            .unwrap_or(config.output.out_dir.as_path()),
    )?;
    let log = RunLog::open(&log_dir, &options.run_id)?;

    if ctx.dry_run && !ctx.quiet
    {
        println!("{}", "DRY RUN: batches are built but not uploaded".yellow());
        println!("  Base: {}", options.base.display());
        println!("  Years: {}..{}", options.years.start, options.years.end);
        println!("  Log: {}", log.path().display());
    }

    let progress = if ctx.quiet
    {
        ProgressBar::hidden()
    }
    else
    {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} articles {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb
    };

    let pipeline = Pipeline::new(options, config.parser.build(), index, log).with_progress(progress);

    let uploader = if ctx.dry_run { None } else { Some(DirectoryUploader::create(&out_dir)?) };
    let summary = pipeline.execute(uploader.as_ref().map(|u| u as &dyn Uploader))?;

    if !ctx.quiet
    {
        println!("{}", summary.table());
        if let Some(last) = &summary.last_uploaded
        {
            println!("Last uploaded: {}", last.to_string().green());
        }
    }
    Ok(())
}

/// Parse one article file and print what would be indexed.
pub fn parse(
    args: ParseArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    let parser = config.parser.build();

    let location = Location::from_path(&args.file).with_context(|| {
        format!("{} is not under a YYYY/MM/DD directory", args.file.display())
    })?;
    let content = read_file_smart(&args.file)?;
    let parsed = parser.parse(content.as_ref(), &location)?;

    if args.json
    {
        println!("{}", encode(&parsed.record)?.json);
    }
    else if !ctx.quiet
    {
        println!("{}", pretty_print(&parsed));
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use std::fs;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;
    use crate::core::upload::UploadResponse;

    #[derive(Default)]
    struct Recording
    {
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    impl Uploader for Recording
    {
        fn upload(
            &self,
            documents: &[u8],
            _content_type: &str,
        ) -> Result<UploadResponse>
        {
            let mut payloads = self
                .payloads
                .lock()
                .unwrap();
            payloads.push(documents.to_vec());
            Ok(UploadResponse {
                receipt: format!("r{}", payloads.len()),
                adds: 0,
                bytes: documents.len(),
            })
        }
    }

    struct Refusing;

    impl Uploader for Refusing
    {
        fn upload(
            &self,
            _documents: &[u8],
            _content_type: &str,
        ) -> Result<UploadResponse>
        {
            anyhow::bail!("service unavailable")
        }
    }

    fn write(
        root: &Path,
        rel: &str,
        body: &str,
    )
    {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn archive() -> TempDir
    {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("archive");
        write(&base, "1899/01/01/1.article", "# One\n## Sub\n### Jane Doe STAFF WRITER\nBody one");
        write(&base, "1899/01/01/2.obituary", "# Two\n## Sub\n### X\nnope");
        write(&base, "1899/01/02/3.advertisement", "no markers at all");
        tmp
    }

    fn pipeline(tmp: &TempDir) -> Pipeline
    {
        let options = PipelineOptions::new(tmp.path().join("archive"), tmp.path().join("state"));
        let log = RunLog::open(&tmp.path().join("logs"), &options.run_id).unwrap();
        Pipeline::new(options, ArticleParser::default(), PathIndex::new(&[]).unwrap(), log)
    }

    #[test]
    fn year_range_is_half_open()
    {
        assert_eq!(year_range(Some(1899), Some(1901)).unwrap(), 1899..1901);
        assert_eq!(year_range(None, None).unwrap(), 0..u32::MAX);
        assert!(year_range(Some(1950), Some(1950)).is_err());
    }

    #[test]
    fn skips_rejects_and_uploads_the_rest()
    {
        let tmp = archive();
        let up = Recording::default();
        let summary = pipeline(&tmp)
            .execute(Some(&up))
            .unwrap();

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.rejected, 1);
        // Three markers missing on the advertisement
        assert_eq!(summary.defects, 3);
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.last_uploaded, Some(Location::new(1899, 1, 2, "3.advertisement")));

        let payloads = up.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), summary.bytes);

        let cp = checkpoint::load(&tmp.path().join("state"), "all")
            .unwrap()
            .unwrap();
        assert_eq!(cp.documents, 2);
        assert!(summary.table().contains("records batched"));
    }

    #[test]
    fn dry_run_uploads_nothing_and_writes_no_checkpoint()
    {
        let tmp = archive();
        let summary = pipeline(&tmp)
            .execute(None)
            .unwrap();

        assert_eq!(summary.batches, 1);
        assert_eq!(summary.last_uploaded, None);
        assert!(
            checkpoint::load(&tmp.path().join("state"), "all")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn upload_failure_is_surfaced()
    {
        let tmp = archive();
        let err = pipeline(&tmp)
            .execute(Some(&Refusing))
            .unwrap_err();

        let archive_err = err
            .downcast_ref::<ArchiveError>()
            .expect("upload error");
        assert!(matches!(archive_err, ArchiveError::Upload { sequence: 1, .. }));
    }

    #[test]
    fn missing_base_fails_the_run()
    {
        let tmp = TempDir::new().unwrap();
        let up = Recording::default();
        assert!(pipeline(&tmp).execute(Some(&up)).is_err());
    }
}

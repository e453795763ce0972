//! Four-level carry traversal over `<base>/<YYYY>/<MM>/<DD>/<article>`.
//!
//! Every level holds an ascending queue of remaining children. When the
//! article queue runs dry the cursor pops the next day and lists it; an
//! empty day pops the next month, and so on up to the year queue. The carry
//! is a plain loop, so deep archives never grow the stack.
//!
//! Directory names are kept as found on disk. Spellings that parse to the
//! same number (`1` and `01`) form one level value, and articles from all of
//! them are visited under it.
//!
//! An unreadable month or day directory is reported once as an
//! [`ArchiveError::Io`] and the walk carries on with the next sibling.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::error::{ArchiveError, Level, PartialLocation};
use crate::core::index::{NumberedDirs, PathIndex};

/// One article file in the archive.
///
/// Ordering follows traversal order: date, then filename, then the on-disk
/// path for alias directories of the same day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location
{
    pub year: u32,
    pub month: u32,
    pub day: u32,
    /// Raw filename, `<number>.<type>`
    pub article: String,
    /// Relative to the archive base, directory names as on disk
    pub path: PathBuf,
}

impl Location
{
    /// Location under the zero-padded `YYYY/MM/DD` directories.
    pub fn new(
        year: u32,
        month: u32,
        day: u32,
        article: impl Into<String>,
    ) -> Self
    {
        let day_dir = PathBuf::from(format!("{year:04}"))
            .join(format!("{month:02}"))
            .join(format!("{day:02}"));
        Self::in_dir(&day_dir, year, month, day, article)
    }

    /// Location of `article` inside `day_dir`, a path relative to the base.
    pub fn in_dir(
        day_dir: &Path,
        year: u32,
        month: u32,
        day: u32,
        article: impl Into<String>,
    ) -> Self
    {
        let article = article.into();
        let path = day_dir.join(&article);
        Self { year, month, day, article, path }
    }

    /// Path relative to the archive base.
    pub fn relative_path(&self) -> &Path
    {
        &self.path
    }

    /// Absolute path of the article under `base`.
    pub fn path_in(
        &self,
        base: &Path,
    ) -> PathBuf
    {
        base.join(&self.path)
    }

    /// Recover a location from a path ending in `YYYY/MM/DD/<article>`.
    pub fn from_path(path: &Path) -> Option<Self>
    {
        let article = path.file_name()?.to_str()?;
        let day_dir = path.parent()?;
        let month_dir = day_dir.parent()?;
        let year_dir = month_dir.parent()?;

        let num = |p: &Path| -> Option<u32> { p.file_name()?.to_str()?.parse().ok() };
        let relative = PathBuf::from(year_dir.file_name()?)
            .join(month_dir.file_name()?)
            .join(day_dir.file_name()?);

        Some(Self::in_dir(&relative, num(year_dir)?, num(month_dir)?, num(day_dir)?, article))
    }
}

impl fmt::Display for Location
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{:04}/{:02}/{:02}/{}", self.year, self.month, self.day, self.article)
    }
}

/// Remaining work at each level plus the values currently being visited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalState
{
    pub years_remaining: VecDeque<NumberedDirs>,
    pub current_year: Option<u32>,
    pub months_remaining: VecDeque<NumberedDirs>,
    pub current_month: Option<u32>,
    pub days_remaining: VecDeque<NumberedDirs>,
    pub current_day: Option<u32>,
    pub articles_remaining: VecDeque<Location>,
    pub current_article: Option<String>,
}

impl TraversalState
{
    fn resolved(&self) -> PartialLocation
    {
        PartialLocation { year: self.current_year, month: self.current_month, day: self.current_day }
    }
}

/// Stateful, deterministic iterator over every article in a year range.
#[derive(Debug)]
pub struct ArchiveCursor
{
    base: PathBuf,
    index: PathIndex,
    state: TraversalState,
    /// Listing failures not yet handed to the caller
    pending: VecDeque<ArchiveError>,
    /// Everything at or before this location is skipped
    resume: Option<Location>,
    finished: bool,
}

impl ArchiveCursor
{
    /// Open a cursor over `base`, restricted to years in `years`.
    ///
    /// # Errors
    ///
    /// Fails only when the base directory itself cannot be listed.
    pub fn open(
        base: impl Into<PathBuf>,
        index: PathIndex,
        years: Range<u32>,
    ) -> Result<Self, ArchiveError>
    {
        let base = base.into();
        let listed = index.list_year_dirs(&base, &years)?;
        debug!(base = %base.display(), years = listed.len(), "opened archive cursor");

        let state = TraversalState { years_remaining: listed.into(), ..Default::default() };

        Ok(Self { base, index, state, pending: VecDeque::new(), resume: None, finished: false })
    }

    /// Skip everything up to and including `after`, so a run interrupted
    /// after `after` was handled picks up at the very next article.
    pub fn resume_after(
        mut self,
        after: Location,
    ) -> Self
    {
        self.state
            .years_remaining
            .retain(|y| y.value >= after.year);
        self.resume = Some(after);
        self
    }

    /// Read-only view of the traversal state.
    pub fn state(&self) -> &TraversalState
    {
        &self.state
    }

    /// Step to the next article.
    ///
    /// Returns `None` once every level is exhausted. An `Err` reports a
    /// directory that could not be listed; the following call continues
    /// with that directory's next sibling.
    pub fn advance(&mut self) -> Option<Result<Location, ArchiveError>>
    {
        if self.finished
        {
            return None;
        }

        loop
        {
            if let Some(err) = self.pending.pop_front()
            {
                return Some(Err(err));
            }

            // 1) Next article in the current day
            if let Some(loc) = self
                .state
                .articles_remaining
                .pop_front()
            {
                self.state.current_article = Some(loc.article.clone());
                trace!(location = %loc, "advance");
                return Some(Ok(loc));
            }

            // 2) Day exhausted: carry into the next day
            if let Some(day) = self
                .state
                .days_remaining
                .pop_front()
            {
                self.state.current_day = Some(day.value);
                self.state.current_article = None;
                self.fill_articles(&day.dirs);
                continue;
            }

            // 3) Month exhausted: carry into the next month
            if let Some(month) = self
                .state
                .months_remaining
                .pop_front()
            {
                self.state.current_month = Some(month.value);
                self.state.current_day = None;
                self.state.current_article = None;
                self.fill_days(&month.dirs);
                continue;
            }

            // 4) Year exhausted: carry into the next year
            if let Some(year) = self
                .state
                .years_remaining
                .pop_front()
            {
                self.state.current_year = Some(year.value);
                self.state.current_month = None;
                self.state.current_day = None;
                self.state.current_article = None;
                self.fill_months(&year.dirs);
                continue;
            }

            // 5) Nothing left anywhere
            self.finished = true;
            self.state = TraversalState::default();
            debug!("archive traversal complete");
            return None;
        }
    }

    fn fill_months(
        &mut self,
        dirs: &[PathBuf],
    )
    {
        let (mut months, errors) = self
            .index
            .list_numbered(&self.base, dirs, Level::Year, self.state.resolved());
        self.pending.extend(errors);

        if let Some(r) = &self.resume
            && Some(r.year) == self.state.current_year
        {
            months.retain(|m| m.value >= r.month);
        }
        self.state.months_remaining = months.into();
    }

    fn fill_days(
        &mut self,
        dirs: &[PathBuf],
    )
    {
        let (mut days, errors) = self
            .index
            .list_numbered(&self.base, dirs, Level::Month, self.state.resolved());
        self.pending.extend(errors);

        if let Some(r) = &self.resume
            && (Some(r.year), Some(r.month)) == (self.state.current_year, self.state.current_month)
        {
            days.retain(|d| d.value >= r.day);
        }
        self.state.days_remaining = days.into();
    }

    fn fill_articles(
        &mut self,
        dirs: &[PathBuf],
    )
    {
        let (Some(year), Some(month), Some(day)) =
            (self.state.current_year, self.state.current_month, self.state.current_day)
        else
        {
            return;
        };
        let at = self.state.resolved();

        let mut articles = Vec::new();
        for dir in dirs
        {
            match self
                .index
                .list_articles(&self.base.join(dir), at)
            {
                Ok(names) => articles.extend(
                    names
                        .into_iter()
                        .map(|name| Location::in_dir(dir, year, month, day, name)),
                ),
                Err(e) => self.pending.push_back(e),
            }
        }
        articles.sort();

        if let Some(r) = &self.resume
            && (r.year, r.month, r.day) == (year, month, day)
        {
            articles.retain(|a| a > r);
        }
        self.state.articles_remaining = articles.into();
    }
}

impl Iterator for ArchiveCursor
{
    type Item = Result<Location, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.advance()
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use anyhow::Result;
    use tempfile::TempDir;

    use super::*;

    fn touch(
        root: &Path,
        rel: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "# t\n## s\n### b\nbody")?;
        Ok(())
    }

    fn cursor(root: &Path) -> ArchiveCursor
    {
        ArchiveCursor::open(root, PathIndex::new(&[]).unwrap(), 0..u32::MAX).unwrap()
    }

    fn visit(c: ArchiveCursor) -> Vec<String>
    {
        c.map(|r| r.unwrap().to_string())
            .collect()
    }

    #[test]
    fn visits_in_ascending_order_across_levels() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        touch(root, "1900/01/02/1.article")?;
        touch(root, "1899/12/31/2.article")?;
        touch(root, "1899/12/31/1.advertisement")?;
        touch(root, "1899/12/01/5.article")?;
        touch(root, "1900/01/02/notes.txt")?;

        let got = visit(cursor(root));
        assert_eq!(
            got,
            vec![
                "1899/12/01/5.article",
                "1899/12/31/1.advertisement",
                "1899/12/31/2.article",
                "1900/01/02/1.article",
                "1900/01/02/notes.txt",
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_levels_are_carried_over() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        fs::create_dir_all(root.join("1899"))?; // no months
        fs::create_dir_all(root.join("1900/02"))?; // no days
        fs::create_dir_all(root.join("1900/03/04"))?; // no articles
        touch(root, "1900/03/05/9.article")?;
        fs::create_dir_all(root.join("misc/01/01"))?;

        assert_eq!(visit(cursor(root)), vec!["1900/03/05/9.article"]);
        Ok(())
    }

    #[test]
    fn exhausted_cursor_stays_exhausted() -> Result<()>
    {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "1899/12/01/1.article")?;
        let mut c = cursor(tmp.path());

        assert!(c.advance().is_some());
        assert!(c.advance().is_none());
        assert!(c.advance().is_none());
        assert_eq!(c.state(), &TraversalState::default());
        Ok(())
    }

    #[test]
    fn state_tracks_current_position() -> Result<()>
    {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "1901/02/03/1.article")?;
        touch(tmp.path(), "1901/02/03/2.article")?;
        let mut c = cursor(tmp.path());

        let first = c.advance().unwrap()?;
        assert_eq!(first, Location::new(1901, 2, 3, "1.article"));
        let s = c.state();
        assert_eq!(s.current_year, Some(1901));
        assert_eq!(s.current_month, Some(2));
        assert_eq!(s.current_day, Some(3));
        assert_eq!(s.current_article.as_deref(), Some("1.article"));
        let queued: Vec<&str> = s
            .articles_remaining
            .iter()
            .map(|l| l.article.as_str())
            .collect();
        assert_eq!(queued, vec!["2.article"]);
        Ok(())
    }

    #[test]
    fn resume_skips_through_checkpoint() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        for rel in [
            "1899/11/30/1.article",
            "1899/12/01/1.article",
            "1899/12/01/2.article",
            "1899/12/02/1.article",
            "1900/01/01/1.article",
        ]
        {
            touch(root, rel)?;
        }

        let full = visit(cursor(root));
        let resumed = visit(cursor(root).resume_after(Location::new(1899, 12, 1, "1.article")));
        assert_eq!(resumed, full[2..].to_vec());
        Ok(())
    }

    #[test]
    fn unreadable_day_is_reported_then_skipped() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        touch(root, "1900/01/04/1.article")?;
        // A plain file where a day directory should be fails to list
        fs::write(root.join("1900/01/05"), "not a directory")?;
        touch(root, "1900/01/06/1.article")?;

        let got: Vec<_> = cursor(root).collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].as_ref().unwrap(), &Location::new(1900, 1, 4, "1.article"));
        match &got[1]
        {
            Err(ArchiveError::Io { level, at, .. }) =>
            {
                assert_eq!(*level, Level::Day);
                assert_eq!(at.day, Some(5));
            }
            other => panic!("expected io error, got {other:?}"),
        }
        assert_eq!(got[2].as_ref().unwrap(), &Location::new(1900, 1, 6, "1.article"));
        Ok(())
    }

    #[test]
    fn location_paths_are_zero_padded()
    {
        let loc = Location::new(905, 1, 7, "33.article");
        assert_eq!(loc.relative_path(), Path::new("0905/01/07/33.article"));
        assert_eq!(loc.to_string(), "0905/01/07/33.article");
    }

    #[test]
    fn location_is_recovered_from_archive_path()
    {
        let loc = Location::from_path(Path::new("/data/archives-text/1899/12/01/4521.article"));
        assert_eq!(loc, Some(Location::new(1899, 12, 1, "4521.article")));
        assert_eq!(Location::from_path(Path::new("notes/1.article")), None);

        let unpadded = Location::from_path(Path::new("1899/12/1/4521.article")).unwrap();
        assert_eq!((unpadded.year, unpadded.month, unpadded.day), (1899, 12, 1));
        assert_eq!(unpadded.relative_path(), Path::new("1899/12/1/4521.article"));
    }

    #[test]
    fn unpadded_and_padded_aliases_are_both_visited() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        touch(root, "1900/1/5/1.article")?;
        touch(root, "1900/01/05/2.article")?;
        touch(root, "1900/01/5/1.article")?;
        touch(root, "1900/02/01/3.article")?;

        let got: Vec<Location> = cursor(root).collect::<Result<_, _>>()?;
        let paths: Vec<&Path> = got
            .iter()
            .map(Location::relative_path)
            .collect();
        assert_eq!(
            paths,
            vec![
                Path::new("1900/01/5/1.article"),
                Path::new("1900/1/5/1.article"),
                Path::new("1900/01/05/2.article"),
                Path::new("1900/02/01/3.article"),
            ]
        );
        assert!(got[..3].iter().all(|l| (l.year, l.month, l.day) == (1900, 1, 5)));

        // Every yielded path exists as spelled
        assert!(got.iter().all(|l| l.path_in(root).is_file()));

        // Resuming inside the aliased day keeps the remaining alias entries
        let resumed: Vec<Location> = cursor(root)
            .resume_after(got[1].clone())
            .collect::<Result<_, _>>()?;
        assert_eq!(resumed, got[2..].to_vec());
        Ok(())
    }

    #[test]
    fn unpadded_only_directories_are_read_in_place() -> Result<()>
    {
        let tmp = TempDir::new()?;
        touch(tmp.path(), "1900/3/7/12.article")?;

        let got: Vec<Location> = cursor(tmp.path()).collect::<Result<_, _>>()?;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].to_string(), "1900/03/07/12.article");
        assert_eq!(got[0].relative_path(), Path::new("1900/3/7/12.article"));
        Ok(())
    }
}

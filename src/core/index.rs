//! Filepath: src/core/index.rs
//! Per-level directory listings for the archive hierarchy.
//! - Year/month/day levels keep only names that parse as integers
//! - Article level keeps regular files, minus ignore globs
//! - Results are sorted so traversal is reproducible
//!
//! Listing never fails because of an odd sibling; only an unreadable
//! directory is an error. Names such as `1` and `01` parse to the same
//! value; [`PathIndex::list_numbered`] keeps every such directory under
//! that one value.

use std::ffi::OsString;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::core::error::{ArchiveError, Level, PartialLocation};

/// A level value together with every directory whose name parses to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedDirs
{
    pub value: u32,
    /// Relative to the listing root, ascending
    pub dirs: Vec<PathBuf>,
}

/// Directory lister shared by the cursor and the tree view.
#[derive(Debug, Clone)]
pub struct PathIndex
{
    /// Filenames skipped at the article level
    ignore: GlobSet,
}

impl PathIndex
{
    /// Build an index that skips article entries matching any of `patterns`
    /// (e.g. ".DS_Store", "*.swp"). Patterns match the bare filename.
    pub fn new(patterns: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self { ignore: builder.build()? })
    }

    /// List the numeric children of `dir`, ascending and deduplicated.
    pub fn list_numeric(
        &self,
        dir: &Path,
        level: Level,
        at: PartialLocation,
    ) -> Result<Vec<u32>, ArchiveError>
    {
        let mut out: Vec<u32> = numeric_entries(dir, level, at)?
            .into_iter()
            .map(|(n, _)| n)
            .collect();

        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// List the numeric children of every `parents` directory under `root`
    /// and merge them by value.
    ///
    /// The parents are alias spellings of one level value, so a child value
    /// found under several of them is a single entry holding all of its
    /// directories. A parent that cannot be listed is returned as an error
    /// next to whatever the others produced.
    pub fn list_numbered(
        &self,
        root: &Path,
        parents: &[PathBuf],
        level: Level,
        at: PartialLocation,
    ) -> (Vec<NumberedDirs>, Vec<ArchiveError>)
    {
        let mut found: Vec<(u32, PathBuf)> = Vec::new();
        let mut errors = Vec::new();

        for parent in parents
        {
            let dir = if parent.as_os_str().is_empty() { root.to_path_buf() } else { root.join(parent) };
            match numeric_entries(&dir, level, at)
            {
                Ok(entries) => found.extend(
                    entries
                        .into_iter()
                        .map(|(n, name)| (n, parent.join(name))),
                ),
                Err(e) => errors.push(e),
            }
        }
        found.sort();

        let mut out: Vec<NumberedDirs> = Vec::new();
        for (value, dir) in found
        {
            match out.last_mut()
            {
                Some(last) if last.value == value => last.dirs.push(dir),
                _ => out.push(NumberedDirs { value, dirs: vec![dir] }),
            }
        }

        for entry in out.iter().filter(|e| e.dirs.len() > 1)
        {
            warn!(
                %level,
                value = entry.value,
                dirs = ?entry.dirs,
                "directory names alias the same number; visiting all of them"
            );
        }

        (out, errors)
    }

    /// List year directories under `base` that fall inside `range`.
    pub fn list_years(
        &self,
        base: &Path,
        range: &Range<u32>,
    ) -> Result<Vec<u32>, ArchiveError>
    {
        Ok(self
            .list_year_dirs(base, range)?
            .into_iter()
            .map(|y| y.value)
            .collect())
    }

    /// Year directories directly under `base` that fall inside `range`,
    /// with alias spellings grouped.
    pub fn list_year_dirs(
        &self,
        base: &Path,
        range: &Range<u32>,
    ) -> Result<Vec<NumberedDirs>, ArchiveError>
    {
        let (mut years, mut errors) =
            self.list_numbered(base, &[PathBuf::new()], Level::Base, PartialLocation::default());
        if let Some(e) = errors.pop()
        {
            return Err(e);
        }
        years.retain(|y| range.contains(&y.value));
        Ok(years)
    }

    /// List article filenames in a day directory, sorted lexicographically.
    pub fn list_articles(
        &self,
        dir: &Path,
        at: PartialLocation,
    ) -> Result<Vec<String>, ArchiveError>
    {
        let entries = fs::read_dir(dir).map_err(|source| io_error(Level::Day, dir, at, source))?;

        let mut out = Vec::new();
        for entry in entries
        {
            let entry = entry.map_err(|source| io_error(Level::Day, dir, at, source))?;

            // Unknown file types are treated like directories: skipped
            let is_file = entry
                .file_type()
                .map(|ft| ft.is_file())
                .unwrap_or(false);
            if !is_file
            {
                continue;
            }

            let Ok(name) = entry
                .file_name()
                .into_string()
            else
            {
                warn!(dir = %dir.display(), "skipping article with non UTF-8 filename");
                continue;
            };

            if self
                .ignore
                .is_match(&name)
            {
                continue;
            }
            out.push(name);
        }

        out.sort();
        Ok(out)
    }
}

/// Numeric children of `dir` with their on-disk names, unsorted.
fn numeric_entries(
    dir: &Path,
    level: Level,
    at: PartialLocation,
) -> Result<Vec<(u32, OsString)>, ArchiveError>
{
    let entries = fs::read_dir(dir).map_err(|source| io_error(level, dir, at, source))?;

    let mut out = Vec::new();
    for entry in entries
    {
        let entry = entry.map_err(|source| io_error(level, dir, at, source))?;
        let name = entry.file_name();

        // Non-numeric siblings (README, .git, notes) are filtered, not errors
        match name
            .to_str()
            .and_then(|s| s.parse::<u32>().ok())
        {
            Some(n) => out.push((n, name)),
            None => debug!(dir = %dir.display(), name = ?name, "skipping non-numeric entry"),
        }
    }
    Ok(out)
}

fn io_error(
    level: Level,
    dir: &Path,
    at: PartialLocation,
    source: std::io::Error,
) -> ArchiveError
{
    ArchiveError::Io { level, path: dir.to_path_buf(), at, source }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn index() -> PathIndex
    {
        PathIndex::new(&[".DS_Store".to_string(), ".*".to_string()]).unwrap()
    }

    #[test]
    fn numeric_listing_filters_sorts_and_dedups() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        for name in ["12", "03", "3", "notes", "1a", "-1", "07"]
        {
            fs::create_dir_all(root.join(name))?;
        }
        fs::write(root.join("README.md"), "readme")?;

        let got = index().list_numeric(root, Level::Year, PartialLocation::default())?;
        assert_eq!(got, vec![3, 7, 12]);
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_io_error()
    {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("1901");
        let at = PartialLocation { year: Some(1901), month: None, day: None };

        let err = index()
            .list_numeric(&missing, Level::Year, at)
            .unwrap_err();
        match err
        {
            ArchiveError::Io { level, path, at: got, .. } =>
            {
                assert_eq!(level, Level::Year);
                assert_eq!(path, missing);
                assert_eq!(got, at);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn years_respect_range() -> Result<()>
    {
        let tmp = TempDir::new()?;
        for y in ["1899", "1900", "1901", "1902"]
        {
            fs::create_dir_all(tmp.path().join(y))?;
        }

        let got = index().list_years(tmp.path(), &(1900..1902))?;
        assert_eq!(got, vec![1900, 1901]);
        Ok(())
    }

    #[test]
    fn numbered_listing_groups_alias_spellings() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        for rel in ["1900/01", "1900/1", "1900/02", "01900/01", "01900/notes"]
        {
            fs::create_dir_all(root.join(rel))?;
        }
        let parents = [PathBuf::from("01900"), PathBuf::from("1900")];

        let (got, errors) = index().list_numbered(root, &parents, Level::Year, PartialLocation::default());
        assert!(errors.is_empty());
        assert_eq!(
            got,
            vec![
                NumberedDirs {
                    value: 1,
                    dirs: vec![
                        PathBuf::from("01900/01"),
                        PathBuf::from("1900/01"),
                        PathBuf::from("1900/1"),
                    ],
                },
                NumberedDirs { value: 2, dirs: vec![PathBuf::from("1900/02")] },
            ]
        );

        // The single-directory listing still collapses the aliases
        assert_eq!(index().list_numeric(&root.join("1900"), Level::Year, PartialLocation::default())?, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn numbered_listing_reports_unreadable_parents()
    {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("1900/03")).unwrap();
        let parents = [PathBuf::from("1900"), PathBuf::from("missing")];

        let (got, errors) = index().list_numbered(tmp.path(), &parents, Level::Year, PartialLocation::default());
        assert_eq!(got, vec![NumberedDirs { value: 3, dirs: vec![PathBuf::from("1900/03")] }]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ArchiveError::Io { path, .. } if path.ends_with("missing")));
    }

    #[test]
    fn article_listing_skips_dirs_and_ignored_names() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let day = tmp.path();
        fs::write(day.join("10.article"), "# a")?;
        fs::write(day.join("2.advertisement"), "# b")?;
        fs::write(day.join(".DS_Store"), "")?;
        fs::write(day.join(".hidden"), "")?;
        fs::create_dir_all(day.join("scans"))?;

        let got = index().list_articles(day, PartialLocation::default())?;
        assert_eq!(got, vec!["10.article".to_string(), "2.advertisement".to_string()]);
        Ok(())
    }
}

//! Article text → [`ArticleRecord`].
//!
//! Expected file shape:
//!
//! ```text
//! # <title>
//! ## <subtitle>
//! ### <byline>
//! <body lines...>
//! ```
//!
//! Marker drift is common in the corpus, so a missing marker is recorded as
//! a [`FormatDefect`] and the record is still produced. Unknown article
//! types, malformed numbers and impossible dates reject the record.

pub mod byline;
pub mod record;

pub use byline::{AuthorTitles, DEFAULT_AUTHOR_TITLES};
pub use record::{ArticleRecord, ArticleType, noon_utc};

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::cursor::Location;
use crate::core::error::ArchiveError;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// Heading marker expected at the start of the first three lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker
{
    #[serde(rename = "#")]
    Title,
    #[serde(rename = "##")]
    Subtitle,
    #[serde(rename = "###")]
    Byline,
}

impl Marker
{
    pub fn as_str(&self) -> &'static str
    {
        match self
        {
            Marker::Title => "#",
            Marker::Subtitle => "##",
            Marker::Byline => "###",
        }
    }

    /// 1-based line the marker belongs on.
    pub fn line(&self) -> usize
    {
        match self
        {
            Marker::Title => 1,
            Marker::Subtitle => 2,
            Marker::Byline => 3,
        }
    }
}

/// Non-fatal structural problem in an article file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDefect
{
    pub line: usize,
    pub expected: Marker,
    /// True when the file ends before this line
    pub missing: bool,
}

impl fmt::Display for FormatDefect
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        if self.missing
        {
            write!(f, "line {} missing, expected `{}`", self.line, self.expected.as_str())
        }
        else
        {
            write!(f, "line {} does not start with `{}`", self.line, self.expected.as_str())
        }
    }
}

/// A record together with the format defects found while parsing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle
{
    pub record: ArticleRecord,
    pub defects: Vec<FormatDefect>,
}

/// Parser settings; the vocabularies are passed in rather than read from
/// globals so tests can swap them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleParser
{
    titles: AuthorTitles,
    accepted_types: Vec<ArticleType>,
}

impl Default for ArticleParser
{
    fn default() -> Self
    {
        Self::new(AuthorTitles::default(), ArticleType::ALL.to_vec())
    }
}

impl ArticleParser
{
    pub fn new(
        titles: AuthorTitles,
        accepted_types: Vec<ArticleType>,
    ) -> Self
    {
        Self { titles, accepted_types }
    }

    /// Parse one article's raw text. The filename is `location.article`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidField`] when the type, number, date or
    /// author title falls outside what the index accepts.
    pub fn parse(
        &self,
        raw: &str,
        location: &Location,
    ) -> Result<ParsedArticle, ArchiveError>
    {
        let (number, kind) = self.split_filename(location)?;

        let publish_date = noon_utc(location.year, location.month, location.day).ok_or_else(|| {
            ArchiveError::InvalidField {
                location: location.clone(),
                field: "publish_date",
                value: format!("{:04}-{:02}-{:02}", location.year, location.month, location.day),
                reason: "not a calendar date".into(),
            }
        })?;

        let lines: Vec<&str> = raw.lines().collect();
        let mut defects = Vec::new();

        let title = heading(&lines, Marker::Title, &mut defects);
        let subtitle = heading(&lines, Marker::Subtitle, &mut defects);
        let byline = heading(&lines, Marker::Byline, &mut defects);

        let text = lines
            .get(3..)
            .map(|rest| rest.concat())
            .unwrap_or_default()
            .trim()
            .to_string();

        let (author, author_title) = self.titles.split_byline(&byline);
        let (author, author_title) = (author.to_string(), author_title.to_string());

        let record = ArticleRecord {
            text,
            kind,
            number,
            publish_date,
            title,
            subtitle,
            author,
            author_title,
            location: location.clone(),
        };
        self.validate(&record)?;

        Ok(ParsedArticle { record, defects })
    }

    /// Decompose `<number>.<type>`, splitting at the last dot.
    fn split_filename(
        &self,
        location: &Location,
    ) -> Result<(String, ArticleType), ArchiveError>
    {
        let invalid = |field: &'static str, value: &str, reason: &str| ArchiveError::InvalidField {
            location: location.clone(),
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let Some((number, suffix)) = location.article.rsplit_once('.')
        else
        {
            return Err(invalid("type", "", "filename has no `.<type>` suffix"));
        };

        let kind: ArticleType = suffix
            .parse()
            .map_err(|_| invalid("type", suffix, "not an accepted article type"))?;
        if !self.accepted_types.contains(&kind)
        {
            return Err(invalid("type", suffix, "article type disabled by configuration"));
        }

        if number.is_empty()
            || number.chars().any(char::is_whitespace)
            || !number.bytes().any(|b| b.is_ascii_digit())
        {
            return Err(invalid("number", number, "expected a digit-bearing article number"));
        }

        Ok((number.to_string(), kind))
    }

    /// Final gate before a record may be emitted.
    fn validate(
        &self,
        record: &ArticleRecord,
    ) -> Result<(), ArchiveError>
    {
        if !self.titles.contains(&record.author_title)
        {
            return Err(ArchiveError::InvalidField {
                location: record.location.clone(),
                field: "author_title",
                value: record.author_title.clone(),
                reason: "not in the author-title vocabulary".into(),
            });
        }
        if !self.accepted_types.contains(&record.kind)
        {
            return Err(ArchiveError::InvalidField {
                location: record.location.clone(),
                field: "type",
                value: record.kind.to_string(),
                reason: "not an accepted article type".into(),
            });
        }
        Ok(())
    }
}

/// Extract a heading line: strip its marker, trim, collapse whitespace.
/// Lines without the marker are kept whole and flagged.
fn heading(
    lines: &[&str],
    marker: Marker,
    defects: &mut Vec<FormatDefect>,
) -> String
{
    let line_no = marker.line();
    let Some(line) = lines.get(line_no - 1)
    else
    {
        defects.push(FormatDefect { line: line_no, expected: marker, missing: true });
        return String::new();
    };

    let body = match line.strip_prefix(marker.as_str())
    {
        Some(rest) => rest,
        None =>
        {
            defects.push(FormatDefect { line: line_no, expected: marker, missing: false });
            line
        }
    };

    collapse_whitespace(body)
}

/// Trim and squeeze internal whitespace runs to single spaces.
pub fn collapse_whitespace(s: &str) -> String
{
    WHITESPACE_RUN
        .replace_all(s.trim(), " ")
        .into_owned()
}

/// Multi-line human view of a parsed article, with a 40 character sample.
pub fn pretty_print(parsed: &ParsedArticle) -> String
{
    let r = &parsed.record;
    let sample: String = r.text.chars().take(40).collect();
    let rule = "-".repeat(58);

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("location: {}\n", r.location));
    out.push_str(&format!("title: {}\n", r.title));
    out.push_str(&format!("subtitle: {}\n", r.subtitle));
    out.push_str(&format!("author: {}\n", r.author));
    out.push_str(&format!("author_title: {}\n", r.author_title));
    out.push_str(&format!("article_type: {}\n", r.kind));
    out.push_str(&format!("article_number: {}\n", r.number));
    out.push_str(&format!("publish_date: {}\n", r.publish_date.format("%Y-%m-%dT%H:%M:%SZ")));
    out.push_str(&format!("text sample: {sample}\n"));
    for d in &parsed.defects
    {
        out.push_str(&format!("defect: {d}\n"));
    }
    out.push_str(&rule);
    out
}

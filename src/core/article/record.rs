//! Typed article record produced by the parser.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cursor::Location;

/// Closed set of article kinds encoded in the filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleType
{
    Article,
    Advertisement,
}

impl ArticleType
{
    pub const ALL: [ArticleType; 2] = [ArticleType::Article, ArticleType::Advertisement];

    pub fn as_str(&self) -> &'static str
    {
        match self
        {
            ArticleType::Article => "article",
            ArticleType::Advertisement => "advertisement",
        }
    }
}

impl fmt::Display for ArticleType
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleType
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s
        {
            "article" => Ok(ArticleType::Article),
            "advertisement" => Ok(ArticleType::Advertisement),
            other => Err(format!("unknown article type: {other}")),
        }
    }
}

/// Structured fields extracted from one article file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord
{
    /// Body text, lines joined without separator
    pub text: String,
    pub kind: ArticleType,
    /// Filename stem; may carry non-digit characters in some eras
    pub number: String,
    /// Calendar date of the location at 12:00:00 UTC
    pub publish_date: DateTime<Utc>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Member of the author-title vocabulary; empty when none matched
    pub author_title: String,
    pub location: Location,
}

/// Canonical publish time for a calendar date: noon UTC.
/// The archive has no time of day, so every record is pinned to 12:00.
pub fn noon_utc(
    year: u32,
    month: u32,
    day: u32,
) -> Option<DateTime<Utc>>
{
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(12, 0, 0)
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn article_type_is_closed()
    {
        assert_eq!("article".parse::<ArticleType>(), Ok(ArticleType::Article));
        assert_eq!("advertisement".parse::<ArticleType>(), Ok(ArticleType::Advertisement));
        assert!("obituary".parse::<ArticleType>().is_err());
        assert!("Article".parse::<ArticleType>().is_err());
    }

    #[test]
    fn noon_utc_rejects_impossible_dates()
    {
        let d = noon_utc(1899, 12, 31).unwrap();
        assert_eq!(d.format("%Y-%m-%dT%H:%M:%SZ").to_string(), "1899-12-31T12:00:00Z");
        assert!(noon_utc(1900, 2, 29).is_none());
        assert!(noon_utc(1920, 13, 1).is_none());
        assert!(noon_utc(1920, 0, 1).is_none());
    }
}

//! Author-title vocabulary and byline splitting.
//!
//! The vocabulary is an ordered list and order is significant: entries are
//! tried one after another and the first one found wins, even if a longer
//! entry would also match. Titles that contain other titles must therefore
//! come first ("SENIOR STAFF WRITER" before "STAFF WRITER" before "STAFF").

use serde::{Deserialize, Serialize};

/// Titles seen in the archive, in precedence order.
pub const DEFAULT_AUTHOR_TITLES: &[&str] = &[
    "",
    "SENIOR STAFF WRITER",
    "STAFF WRITER",
    "DESK EDITOR",
    "CONTRIBUTING WRITER",
    "MANAGING EDITOR",
    "EDITOR IN CHIEF",
    "DEPUTY EDITOR",
    "EXECUTIVE EDITOR",
    "STAFF",
    "ASSU President",
    "ASSU Parlimentarian",
    "STAFF FOOTBALL WRITERS",
    "FASHION COLUMNIST",
    "FOOTBALL EDITOR",
    "ARTS EDITOR",
    "FOOD EDITOR",
    "FOOD DINING EDITOR",
    "OPINIONS DESK",
    "FOOD DRUNK EDITOR",
    "FELLOW",
    "DAILY INTERN",
    "CONTRIBUTING EDITOR",
    "MANAGING WRITER",
    "GUEST COLUMNIST",
    "SEX GODDESS",
    "GUEST COLUMNISTS",
    "EDITORIAL STAKE",
    "CONTRIBUTING YANKEE",
    "SPECIAL CONTRIBUTOR",
    "EDITORIAL BOARD",
    "EDITORIAL STAFF",
    "FILM CRITIC",
    "HEALTH EDITOR",
    "ASSHOLE",
    "INTERMISSION",
    "NEWS EDITOR",
    "CLASS PRESIDENT",
    "ASSOCIATED PRESS",
    "AP SPORTS WRITER",
    "AP BASEBALL WRITER",
    "WEEKLY COLUMNIST",
    "HEALTH COLUMNIST",
    "ASSOCIATED EDITOR",
    "ASSOCIATE EDITOR",
    "SPORTS EDITOR",
    "EDITOR THE DAILY",
];

/// Ordered, closed vocabulary of author titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AuthorTitles
{
    entries: Vec<String>,
}

impl From<Vec<String>> for AuthorTitles
{
    fn from(entries: Vec<String>) -> Self
    {
        Self::new(entries)
    }
}

impl From<AuthorTitles> for Vec<String>
{
    fn from(titles: AuthorTitles) -> Self
    {
        titles.entries
    }
}

impl Default for AuthorTitles
{
    fn default() -> Self
    {
        Self::new(DEFAULT_AUTHOR_TITLES.iter().map(|s| s.to_string()))
    }
}

impl AuthorTitles
{
    /// Build a vocabulary; the empty default title is always a member.
    pub fn new(entries: impl IntoIterator<Item = String>) -> Self
    {
        let mut entries: Vec<String> = entries.into_iter().collect();
        if !entries.iter().any(String::is_empty)
        {
            entries.insert(0, String::new());
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[String]
    {
        &self.entries
    }

    pub fn contains(
        &self,
        title: &str,
    ) -> bool
    {
        self.entries
            .iter()
            .any(|e| e == title)
    }

    /// First vocabulary entry (in list order) whose first occurrence in
    /// `byline` is past position 0. Case-insensitive.
    ///
    /// Returns the byte offset of the match and the canonical entry.
    pub fn find_in<'a>(
        &'a self,
        byline: &str,
    ) -> Option<(usize, &'a str)>
    {
        // ASCII folding keeps byte offsets aligned with `byline`
        let folded = byline.to_ascii_uppercase();

        for entry in &self.entries
        {
            if entry.is_empty()
            {
                continue;
            }
            let needle = entry.to_ascii_uppercase();

            // A match at 0 would swallow the whole name; only the first
            // occurrence of each entry is considered
            if let Some(idx) = folded.find(&needle)
                && idx > 0
            {
                return Some((idx, entry.as_str()));
            }
        }
        None
    }

    /// Split a byline into `(author, author_title)`.
    pub fn split_byline<'a>(
        &'a self,
        byline: &'a str,
    ) -> (&'a str, &'a str)
    {
        match self.find_in(byline)
        {
            Some((idx, title)) => (byline[..idx].trim_end(), title),
            None => (byline, ""),
        }
    }
}

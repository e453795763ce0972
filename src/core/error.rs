//! Error taxonomy shared by traversal, parsing, batching and upload.

use std::fmt;
use std::path::PathBuf;

use crate::core::cursor::Location;

/// Archive level a directory listing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level
{
    Base,
    Year,
    Month,
    Day,
}

impl fmt::Display for Level
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        match self
        {
            Level::Base => write!(f, "base"),
            Level::Year => write!(f, "year"),
            Level::Month => write!(f, "month"),
            Level::Day => write!(f, "day"),
        }
    }
}

/// Location resolved so far when a directory listing fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PartialLocation
{
    pub year: Option<u32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl fmt::Display for PartialLocation
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        let mut parts = Vec::with_capacity(3);
        if let Some(y) = self.year
        {
            parts.push(format!("{y:04}"));
        }
        if let Some(m) = self.month
        {
            parts.push(format!("{m:02}"));
        }
        if let Some(d) = self.day
        {
            parts.push(format!("{d:02}"));
        }
        if parts.is_empty()
        {
            return write!(f, "<base>");
        }
        write!(f, "{}", parts.join("/"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError
{
    /// Directory or file could not be read
    #[error("cannot read {level} directory {} ({at}): {source}", path.display())]
    Io
    {
        level: Level,
        path: PathBuf,
        at: PartialLocation,
        #[source]
        source: std::io::Error,
    },

    /// Article file could not be read
    #[error("cannot read article {location}: {source}")]
    Read
    {
        location: Location,
        #[source]
        source: anyhow::Error,
    },

    /// Field outside its closed vocabulary or structurally malformed
    #[error("invalid {field} {value:?} in {location}: {reason}")]
    InvalidField
    {
        location: Location,
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Single record larger than the per-record ceiling
    #[error("record {id} is {size} bytes, over the {limit} byte ceiling")]
    OversizeRecord
    {
        id: String,
        size: usize,
        limit: usize,
    },

    /// Opaque failure from the indexing collaborator
    #[error("upload of batch {sequence} failed")]
    Upload
    {
        sequence: usize,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn partial_location_renders_resolved_prefix()
    {
        let at = PartialLocation { year: Some(1899), month: Some(1), day: None };
        assert_eq!(at.to_string(), "1899/01");
        assert_eq!(PartialLocation::default().to_string(), "<base>");
    }

    #[test]
    fn invalid_field_message_names_field_and_location()
    {
        let err = ArchiveError::InvalidField {
            location: Location::new(1920, 3, 4, "12.obituary"),
            field: "type",
            value: "obituary".into(),
            reason: "not an accepted article type".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("type"));
        assert!(msg.contains("1920/03/04/12.obituary"));
    }
}

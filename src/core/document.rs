//! Upload envelope for article records.
//!
//! Each record is serialized exactly once; the resulting bytes are what the
//! accumulator measures and what the uploader transmits.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::article::ArticleRecord;
use crate::core::batch::{Batch, Framing};
use crate::core::cursor::Location;

/// Content type of a batch payload.
pub const CONTENT_TYPE: &str = "application/json";

/// Framing of a batch payload: a JSON array of documents.
pub const PAYLOAD_FRAMING: Framing = Framing::JSON_ARRAY;

#[derive(Serialize)]
struct Envelope<'a>
{
    #[serde(rename = "type")]
    op: &'static str,
    id: &'a str,
    fields: Fields<'a>,
}

#[derive(Serialize)]
struct Fields<'a>
{
    article_text: &'a str,
    article_type: &'static str,
    article_number: &'a str,
    publish_date: String,
    title: &'a str,
    subtitle: &'a str,
    author: &'a str,
    author_title: &'a str,
}

/// One record in its transmitted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument
{
    pub id: String,
    pub location: Location,
    pub json: String,
}

impl EncodedDocument
{
    pub fn len(&self) -> usize
    {
        self.json.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.json.is_empty()
    }
}

/// Stable document id: `YYYYMMDD_<type>_<number>`, number kept as written.
pub fn document_id(record: &ArticleRecord) -> String
{
    format!("{}_{}_{}", record.publish_date.format("%Y%m%d"), record.kind, record.number)
}

/// Serialize a record into an `add` envelope.
pub fn encode(record: &ArticleRecord) -> Result<EncodedDocument>
{
    let id = document_id(record);
    let envelope = Envelope {
        op: "add",
        id: &id,
        fields: Fields {
            article_text: &record.text,
            article_type: record.kind.as_str(),
            article_number: &record.number,
            publish_date: record
                .publish_date
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string(),
            title: &record.title,
            subtitle: &record.subtitle,
            author: &record.author,
            author_title: &record.author_title,
        },
    };

    let json = serde_json::to_string(&envelope)
        .with_context(|| format!("Failed to serialize document {id}"))?;

    Ok(EncodedDocument { id, location: record.location.clone(), json })
}

/// Byte size of an encoded document inside a payload.
pub fn encoded_len(doc: &EncodedDocument) -> usize
{
    doc.len()
}

/// Render a sealed batch as the JSON array that goes over the wire.
pub fn payload(batch: &Batch<EncodedDocument>) -> Vec<u8>
{
    let mut out = Vec::with_capacity(batch.bytes);
    out.push(b'[');
    for (i, doc) in batch
        .items
        .iter()
        .enumerate()
    {
        if i > 0
        {
            out.push(b',');
        }
        out.extend_from_slice(doc.json.as_bytes());
    }
    out.push(b']');
    out
}

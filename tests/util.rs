//! Shared test utilities for integration tests
//!
//! Builds small on-disk archives in the `YYYY/MM/DD/<number>.<type>` layout.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// Article text in the expected four-part shape.
pub fn article(
    title: &str,
    byline: &str,
    body: &str,
) -> String
{
    format!("# {title}\n## A subtitle\n### {byline}\n{body}\n")
}

/// Write one article at `archive/<rel>`.
pub fn put(
    tmp: &assert_fs::TempDir,
    rel: &str,
    text: &str,
)
{
    tmp.child(format!("archive/{rel}"))
        .write_str(text)
        .expect("write article");
}

/// Two years of articles with one rejected type and one drifting file.
///
/// Accepted records, in traversal order:
/// 1899/01/01/1.article, 1899/01/01/2.advertisement, 1899/01/02/10.article,
/// 1900/03/15/7.article, 1900/03/15/8.article
pub fn make_archive() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    put(&tmp, "1899/01/01/1.article", &article("First", "Jane Doe STAFF WRITER", "Body one"));
    put(&tmp, "1899/01/01/2.advertisement", &article("Sale", "John Smith", "Hats"));
    put(&tmp, "1899/01/01/3.obituary", &article("Gone", "X", "Rejected type"));
    put(&tmp, "1899/01/02/10.article", "# Only a title\nno more markers\n");
    put(&tmp, "1900/03/15/7.article", &article("Later", "Ann Lee SENIOR STAFF WRITER", "Body"));
    put(&tmp, "1900/03/15/8.article", &article("Last", "Bo Chan sports editor", "Body"));

    // Noise that the index must skip
    tmp.child("archive/README.md")
        .write_str("not a year")
        .expect("write readme");
    tmp.child("archive/1899/01/01/.DS_Store")
        .write_str("")
        .expect("write ds_store");

    tmp
}

pub fn default_ignores() -> Vec<String>
{
    [".DS_Store", "Thumbs.db", ".*", "*~", "*.swp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

//! Archive traversal: order, skipping, resume.

use std::collections::BTreeSet;

use anyhow::Result;
use archdex::core::{ArchiveCursor, Location, PathIndex};
use assert_fs::prelude::*;
use proptest::prelude::*;

mod util;

fn visit(cursor: ArchiveCursor) -> Vec<Location>
{
    cursor
        .map(|r| r.expect("no listing errors"))
        .collect()
}

#[test]
fn fixture_is_visited_in_ascending_order() -> Result<()>
{
    let tmp = util::make_archive();
    let index = PathIndex::new(&util::default_ignores())?;
    let cursor = ArchiveCursor::open(tmp.path().join("archive"), index, 0..u32::MAX)?;

    let seen: Vec<String> = visit(cursor)
        .iter()
        .map(Location::to_string)
        .collect();
    assert_eq!(
        seen,
        [
            "1899/01/01/1.article",
            "1899/01/01/2.advertisement",
            "1899/01/01/3.obituary",
            "1899/01/02/10.article",
            "1900/03/15/7.article",
            "1900/03/15/8.article",
        ]
    );
    Ok(())
}

#[test]
fn year_range_is_start_inclusive_end_exclusive() -> Result<()>
{
    let tmp = util::make_archive();
    let index = PathIndex::new(&util::default_ignores())?;

    let only_1900 = visit(ArchiveCursor::open(tmp.path().join("archive"), index.clone(), 1900..1901)?);
    assert_eq!(only_1900.len(), 2);
    assert!(only_1900.iter().all(|l| l.year == 1900));

    let none = visit(ArchiveCursor::open(tmp.path().join("archive"), index, 1899..1899)?);
    assert!(none.is_empty());
    Ok(())
}

#[test]
fn empty_archive_yields_nothing() -> Result<()>
{
    let tmp = assert_fs::TempDir::new()?;
    tmp.child("archive/1899/01").create_dir_all()?;
    let cursor = ArchiveCursor::open(tmp.path().join("archive"), PathIndex::new(&[])?, 0..u32::MAX)?;
    assert!(visit(cursor).is_empty());
    Ok(())
}

#[test]
fn missing_base_is_an_error()
{
    let tmp = assert_fs::TempDir::new().unwrap();
    let res = ArchiveCursor::open(tmp.path().join("nope"), PathIndex::new(&[]).unwrap(), 0..u32::MAX);
    assert!(res.is_err());
}

/// Article files as (year, month, day, number, zero-padded directories).
/// Unpadded entries land in alias directories such as `1990/1/2`.
fn layout() -> impl Strategy<Value = BTreeSet<(u32, u32, u32, u32, bool)>>
{
    prop::collection::btree_set((1990u32..1993, 1u32..4, 1u32..4, 1u32..40, any::<bool>()), 0..40)
}

fn build(files: &BTreeSet<(u32, u32, u32, u32, bool)>) -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    for &(y, m, d, n, padded) in files
    {
        let day_dir = if padded { format!("{y:04}/{m:02}/{d:02}") } else { format!("{y}/{m}/{d}") };
        tmp.child(format!("{day_dir}/{n}.article"))
            .write_str("# t\n## s\n### b\nbody")
            .expect("write");
    }
    tmp
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_file_is_visited_once_in_order(files in layout()) {
        let tmp = build(&files);
        let cursor = ArchiveCursor::open(tmp.path(), PathIndex::new(&[]).unwrap(), 0..u32::MAX).unwrap();
        let seen = visit(cursor);

        prop_assert_eq!(seen.len(), files.len());
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn resume_yields_the_remaining_suffix(files in layout(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!files.is_empty());
        let tmp = build(&files);
        let index = PathIndex::new(&[]).unwrap();

        let full = visit(ArchiveCursor::open(tmp.path(), index.clone(), 0..u32::MAX).unwrap());
        let k = pick.index(full.len());

        let resumed = visit(
            ArchiveCursor::open(tmp.path(), index, 0..u32::MAX)
                .unwrap()
                .resume_after(full[k].clone()),
        );
        prop_assert_eq!(&resumed[..], &full[k + 1..]);
    }
}

//! Filepath: src/core/tree.rs
//! Archive tree view: years → months → days, each day labelled with its
//! article count as `DD:count`. Years and months show their totals.
//!
//! Uses the same PathIndex policy as the cursor, so the counts match what a
//! run would visit. Unreadable directories are shown in red and skipped.

use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use ptree::TreeBuilder;
use tracing::warn;

use crate::cli::{AppContext, TreeArgs};
use crate::core::error::{Level, PartialLocation};
use crate::core::index::{NumberedDirs, PathIndex};
use crate::core::pipeline::year_range;
use crate::infra::config::{expand_path, load_config};

pub fn run(args: TreeArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config()?;

    // Combine config ignore patterns with CLI args
    let mut ignore_patterns = config.archive.ignore_patterns.clone();
    ignore_patterns.extend(args.ignore);

    let index = PathIndex::new(&ignore_patterns)?;
    let base = expand_path(args.base.as_deref().unwrap_or(config.archive.base_path.as_path()))?;
    let years = year_range(
        args.start_year.or(config.archive.start_year),
        args.end_year.or(config.archive.end_year),
    )?;
    let depth = args.depth.unwrap_or(3).clamp(1, 3);

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would scan:".yellow());
            println!("  Base: {}", base.display());
            println!("  Years: {}..{}", years.start, years.end);
            println!("  Depth: {depth}");
            println!("  Ignore patterns: {:?}", ignore_patterns);
        }
        return Ok(());
    }

    let tree = build_archive_tree(&base, &index, &years, depth)
        .with_context(|| format!("Failed to scan archive {}", base.display()))?;

    if !ctx.quiet {
        print_tree(&tree, ctx.no_color)?;
    }

    Ok(())
}

#[derive(Debug)]
struct TreeNode {
    name: String,
    /// Articles at or below this node
    articles: usize,
    /// Set when the directory could not be listed
    unreadable: bool,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(name: String) -> Self {
        Self {
            name,
            articles: 0,
            unreadable: false,
            children: Vec::new(),
        }
    }

    fn unreadable(name: String) -> Self {
        Self {
            unreadable: true,
            ..Self::new(name)
        }
    }
}

/// Build the hierarchy down to `depth` levels (1 = years, 3 = days).
/// Counts always cover the full subtree regardless of depth.
fn build_archive_tree(
    base: &Path,
    index: &PathIndex,
    years: &Range<u32>,
    depth: usize,
) -> Result<TreeNode> {
    let mut root = TreeNode::new(
        base.file_name()
            .unwrap_or(base.as_os_str())
            .to_string_lossy()
            .to_string(),
    );

    for year in index.list_year_dirs(base, years)? {
        let mut year_node = TreeNode::new(format!("{:04}", year.value));
        let at = PartialLocation {
            year: Some(year.value),
            ..Default::default()
        };

        let (months, errors) = index.list_numbered(base, &year.dirs, Level::Year, at);
        if !errors.is_empty() {
            for e in &errors {
                warn!(error = %e, "skipping unreadable year");
            }
            root.children.push(TreeNode::unreadable(year_node.name));
            continue;
        }

        for month in months {
            let month_node = month_subtree(base, index, at, &month);
            year_node.articles += month_node.articles;
            if depth > 1 {
                year_node.children.push(month_node);
            }
        }

        root.articles += year_node.articles;
        root.children.push(year_node);
    }

    if depth < 3 {
        for year in &mut root.children {
            for month in &mut year.children {
                month.children.clear();
            }
        }
    }

    Ok(root)
}

fn month_subtree(
    base: &Path,
    index: &PathIndex,
    at: PartialLocation,
    month: &NumberedDirs,
) -> TreeNode {
    let name = format!("{:02}", month.value);
    let at = PartialLocation {
        month: Some(month.value),
        ..at
    };

    let (days, errors) = index.list_numbered(base, &month.dirs, Level::Month, at);
    if !errors.is_empty() {
        for e in &errors {
            warn!(error = %e, "skipping unreadable month");
        }
        return TreeNode::unreadable(name);
    }

    let mut node = TreeNode::new(name);
    for day in days {
        let at = PartialLocation {
            day: Some(day.value),
            ..at
        };
        let day_name = format!("{:02}", day.value);

        // Alias spellings of one day add up into a single node
        let listed: Result<Vec<usize>, _> = day
            .dirs
            .iter()
            .map(|dir| index.list_articles(&base.join(dir), at).map(|a| a.len()))
            .collect();

        match listed {
            Ok(counts) => {
                let mut day_node = TreeNode::new(day_name);
                day_node.articles = counts.iter().sum();
                node.articles += day_node.articles;
                node.children.push(day_node);
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable day");
                node.children.push(TreeNode::unreadable(day_name));
            }
        }
    }
    node
}

/// Print the tree with formatted labels.
fn print_tree(tree: &TreeNode, no_color: bool) -> Result<()> {
    let mut builder = TreeBuilder::new(format_node_label(tree, no_color));

    add_children_to_builder(&mut builder, &tree.children, no_color);

    let tree = builder.build();
    ptree::print_tree(&tree)?;

    Ok(())
}

fn add_children_to_builder(builder: &mut TreeBuilder, children: &[TreeNode], no_color: bool) {
    for child in children {
        if child.children.is_empty() {
            builder.add_empty_child(format_node_label(child, no_color));
        } else {
            builder.begin_child(format_node_label(child, no_color));
            add_children_to_builder(builder, &child.children, no_color);
            builder.end_child();
        }
    }
}

/// `name:count`, or `name (unreadable)` for directories that failed to list.
fn format_node_label(node: &TreeNode, no_color: bool) -> String {
    if node.unreadable {
        let label = format!("{} (unreadable)", node.name);
        return if no_color {
            label
        } else {
            label.red().to_string()
        };
    }

    if no_color {
        format!("{}:{}", node.name, node.articles)
    } else {
        format!("{}:{}", node.name.blue(), node.articles)
    }
}

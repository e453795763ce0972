use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::article::{ArticleParser, ArticleType, AuthorTitles};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Where the archive lives and which part of it to walk
    pub archive: ArchiveConfig,

    /// Where batches, logs and checkpoints go
    pub output: OutputConfig,

    /// Field extraction vocabularies
    pub parser: ParserConfig,

    /// Pipeline tuning
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig
{
    pub base_path: PathBuf,
    /// First year to walk (inclusive)
    pub start_year: Option<u32>,
    /// Year to stop before (exclusive)
    pub end_year: Option<u32>,
    /// Article filenames to skip (globs on the bare name)
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig
{
    pub out_dir: PathBuf,
    pub log_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig
{
    /// Ordered; earlier entries win over later ones
    pub author_titles: AuthorTitles,
    pub article_types: Vec<ArticleType>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig
{
    /// Articles read and parsed in parallel per step
    pub parse_window: usize,
}

impl Default for ArchiveConfig
{
    fn default() -> Self
    {
        Self {
            base_path: PathBuf::from("./archives-text"),
            start_year: None,
            end_year: None,
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".*".to_string(),
                "*~".to_string(),
                "*.swp".to_string(),
            ],
        }
    }
}

impl Default for OutputConfig
{
    fn default() -> Self
    {
        Self {
            out_dir: PathBuf::from("./batches"),
            log_dir: PathBuf::from("./logs"),
            checkpoint_dir: PathBuf::from("./.adx"),
        }
    }
}

impl Default for ParserConfig
{
    fn default() -> Self
    {
        Self { author_titles: AuthorTitles::default(), article_types: ArticleType::ALL.to_vec() }
    }
}

impl Default for PipelineConfig
{
    fn default() -> Self
    {
        Self { parse_window: 64 }
    }
}

impl ParserConfig
{
    pub fn build(&self) -> ArticleParser
    {
        ArticleParser::new(self.author_titles.clone(), self.article_types.clone())
    }
}

/// Expand `~` and `$VAR` in a configured path.
pub fn expand_path(p: &Path) -> Result<PathBuf>
{
    let raw = p.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["archdex.toml", "archdex.yaml", "archdex.json", ".archdex.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Environment overrides, e.g. ARCHDEX__ARCHIVE__BASE_PATH
    builder = builder.add_source(
        config::Environment::with_prefix("ARCHDEX")
            .prefix_separator("__")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("archdex.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();

        assert_eq!(back.pipeline.parse_window, 64);
        assert_eq!(back.parser.author_titles, AuthorTitles::default());
        assert_eq!(back.parser.article_types, ArticleType::ALL.to_vec());
        assert!(text.contains("base_path"));
    }

    #[test]
    fn partial_file_keeps_defaults()
    {
        let back: Config = toml::from_str("[archive]\nstart_year = 1950\n").unwrap();
        assert_eq!(back.archive.start_year, Some(1950));
        assert_eq!(back.archive.base_path, PathBuf::from("./archives-text"));
        assert_eq!(back.output.out_dir, PathBuf::from("./batches"));
    }

    #[test]
    fn custom_vocabulary_order_is_kept()
    {
        let back: Config =
            toml::from_str("[parser]\nauthor_titles = [\"EDITOR\", \"MANAGING EDITOR\"]\n").unwrap();
        assert_eq!(back.parser.author_titles.entries(), ["", "EDITOR", "MANAGING EDITOR"]);
    }

    #[test]
    fn plain_paths_pass_through_expansion()
    {
        let p = expand_path(Path::new("plain/dir")).unwrap();
        assert_eq!(p, PathBuf::from("plain/dir"));
    }
}

use anyhow::Result;
use archdex::cli::{Cli, Commands};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = cli.context();
    archdex::infra::logging::init(ctx.verbose, ctx.no_color);

    match cli.command {
        Commands::Run(args) => archdex::pipeline_run(args, &ctx),
        Commands::Parse(args) => archdex::core::pipeline::parse(args, &ctx),
        Commands::Tree(args) => archdex::tree_run(args, &ctx),
        Commands::Init(args) => archdex::infra::config::init(args, &ctx),
        Commands::Completions(args) => archdex::completion::run(args, &ctx),
    }
}

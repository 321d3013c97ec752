use anyhow::Result;
use clap::Parser;
use frontpress::build::build_site;
use frontpress::config::Config;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Builds a static blog from a directory of Markdown entries.
#[derive(Parser)]
#[command(name = "frontpress", version, about)]
struct Cli {
    /// The directory to search (along with its parents) for
    /// `frontpress.yaml`.
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// The root link prefix for static files and page links, e.g. `/blog`.
    #[arg(long, env = "FRONTPRESS_ROOT")]
    root: Option<String>,

    /// The output directory. Its contents are replaced.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Build into a staging directory and swap it into place when done.
    #[arg(long)]
    staged: bool,

    /// Log every post written.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose enables DEBUG, otherwise use RUST_LOG or default to INFO
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::from_directory(&cli.project)?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if let Some(output) = cli.output {
        config.output_directory = output;
    }
    config.staged |= cli.staged;

    let report = build_site(&config)?;
    if report.collisions > 0 {
        warn!(collisions = report.collisions, "some posts overwrote others");
    }
    info!(
        written = report.posts_written,
        skipped = report.skipped(),
        output = %config.output_directory.display(),
        "site built"
    );
    Ok(())
}

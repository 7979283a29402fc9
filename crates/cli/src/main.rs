mod output;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use luacat_lib::{Interpreter, Options};
use output::{OutputFormat, write_catalog};

/// Interprets Lua source and generates an mcm catalog.
#[derive(Parser)]
#[command(name = "luacat")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Lua files to run, in order, against one catalog
  #[arg(value_name = "FILE", required = true)]
  files: Vec<String>,

  /// Output encoding
  #[arg(short, long, value_enum, default_value_t)]
  format: OutputFormat,

  /// Write the catalog here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// How many tables deep a resource payload may nest
  #[arg(long, default_value_t = Options::default().max_depth)]
  max_depth: usize,

  /// Enable debug logging
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::from_default_env()
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let mut interp = Interpreter::with_options(Options {
    max_depth: cli.max_depth,
  })
  .context("Failed to create Lua interpreter")?;

  for file in &cli.files {
    if file.is_empty() {
      bail!("empty source");
    }
    interp
      .run(file)
      .with_context(|| format!("Failed to run script: {}", file))?;
  }

  let catalog = interp.finish();
  tracing::debug!(resources = catalog.len(), "writing catalog");
  write_catalog(&catalog, cli.format, cli.output.as_deref())
}

//! Catalog output encoding.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use luacat_lib::Catalog;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Cbor,
  Json,
}

impl OutputFormat {
  pub fn encode<W: Write>(self, catalog: &Catalog, mut writer: W) -> Result<()> {
    match self {
      OutputFormat::Cbor => catalog.write_cbor(&mut writer).context("Failed to encode catalog as CBOR")?,
      OutputFormat::Json => {
        let json = catalog.to_json_pretty().context("Failed to encode catalog as JSON")?;
        writeln!(writer, "{}", json).context("Failed to write catalog")?;
      }
    }
    writer.flush().context("Failed to flush catalog output")
  }
}

/// Write the catalog to `path`, or to stdout when no path is given.
pub fn write_catalog(catalog: &Catalog, format: OutputFormat, path: Option<&Path>) -> Result<()> {
  match path {
    Some(path) => {
      let file = File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?;
      format.encode(catalog, BufWriter::new(file))
    }
    None => format.encode(catalog, io::stdout().lock()),
  }
}

//! # afmreader
//!
//! Command-line front-end for inspecting and converting AFM force-curve files.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a file
//! afmreader info map-data-2021.11.05-17.37.44.432.jpk-force-map
//!
//! # Export every curve to UFF
//! afmreader convert egel.001 export/
//!
//! # Write the piezo image and one curve as CSV
//! afmreader piezo map.jpk-force-map piezo.csv
//! afmreader curve map.jpk-force-map --index 12 curve.csv
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod convert;
mod curve;
mod info;
mod piezo;

/// afmreader - Atomic Force Microscopy file reader
#[derive(Parser)]
#[command(name = "afmreader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load header defaults from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the metadata of an AFM file
    Info {
        /// Input file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the full metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the curves of a file to UFF
    Convert {
        /// Input file path
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory (defaults to the current directory)
        #[arg(value_name = "OUTDIR")]
        output: Option<PathBuf>,
    },

    /// Compute the piezo image and write it as CSV
    Piezo {
        /// Input file path
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output CSV path (defaults to stdout)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Write the channels of one curve as CSV
    Curve {
        /// Input file path
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Curve index
        #[arg(short, long, default_value_t = 0)]
        index: usize,

        /// Output CSV path (defaults to stdout)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let reader_config = config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Info { file, json } => info::run(file, reader_config, json),
        Commands::Convert { input, output } => convert::run(input, output, reader_config),
        Commands::Piezo { input, output } => piezo::run(input, output, reader_config),
        Commands::Curve {
            input,
            index,
            output,
        } => curve::run(input, index, output, reader_config),
    }
}

/// Open a CSV writer on a file or stdout
fn csv_writer(output: Option<&std::path::Path>) -> Result<csv::Writer<Box<dyn std::io::Write>>> {
    use anyhow::Context;

    let sink: Box<dyn std::io::Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    Ok(csv::WriterBuilder::new().flexible(true).from_writer(sink))
}

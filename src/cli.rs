use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::CliOverrides;

#[derive(Parser)]
#[command(name = "cardscan")]
#[command(about = "Identify Magic: The Gathering cards from photographs", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// JSON config file (default: ./cardscan.json)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Identify every image in a directory, one at a time, and print a report.
    Scan {
        /// Directory of card photos (.jpg, .jpeg, .png)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Directory of reference label/image pairs
        #[arg(short, long)]
        examples: Option<PathBuf>,
        /// Retries per image after the first attempt
        #[arg(long)]
        max_retries: Option<u32>,
        /// Delay between images (ms)
        #[arg(long)]
        pacing_ms: Option<u64>,
        /// Model name
        #[arg(long)]
        model: Option<String>,
        /// Output a JSON report instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Identify a single image.
    Identify {
        image: PathBuf,
        /// Directory of reference label/image pairs
        #[arg(short, long)]
        examples: Option<PathBuf>,
        /// Retries after the first attempt
        #[arg(long)]
        max_retries: Option<u32>,
        /// Model name
        #[arg(long)]
        model: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List the reference examples that would be sent as context.
    Examples {
        /// Directory of reference label/image pairs
        #[arg(short, long)]
        examples: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    pub(crate) fn overrides(&self) -> CliOverrides {
        match self {
            Command::Scan {
                input,
                examples,
                max_retries,
                pacing_ms,
                model,
                ..
            } => CliOverrides {
                input_dir: input.clone(),
                examples_dir: examples.clone(),
                max_retries: *max_retries,
                pacing_ms: *pacing_ms,
                model: model.clone(),
            },
            Command::Identify {
                examples,
                max_retries,
                model,
                ..
            } => CliOverrides {
                examples_dir: examples.clone(),
                max_retries: *max_retries,
                model: model.clone(),
                ..CliOverrides::default()
            },
            Command::Examples { examples, .. } => CliOverrides {
                examples_dir: examples.clone(),
                ..CliOverrides::default()
            },
        }
    }
}

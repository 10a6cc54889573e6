use crate::dispatcher::DEFAULT_WORKERS;
use crate::extractor::DEFAULT_EXTENSIONS;
use clap::Parser;
use std::path::PathBuf;

/// SQL Image Fetch - download every image referenced by a SQL dump
#[derive(Parser, Debug, Clone)]
#[command(name = "sql-image-fetch")]
#[command(author = "Arthur")]
#[command(version = "0.1.0")]
#[command(about = "Extract image URLs from SQL insert statements and download them", long_about = None)]
pub struct Args {
    /// SQL dump to scan (defaults to the first .sql file in the current directory)
    pub input: Option<PathBuf>,

    /// Number of concurrent download workers
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Image extensions to look for, comma separated
    #[arg(short, long, value_delimiter = ',', default_values_t = DEFAULT_EXTENSIONS.map(String::from))]
    pub extensions: Vec<String>,

    /// Output directory (defaults to an `image` directory next to the input file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// HTTP request timeout in milliseconds (no timeout when unset)
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Hide the progress bar
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}

mod cli;
mod config;
mod dedupe;
mod dispatcher;
mod error;
mod extractor;
mod fetcher;
mod logging;

use anyhow::Result;
use cli::parse_args;
use colored::*;
use config::Config;
use dedupe::unique_urls;
use dispatcher::Dispatcher;
use error::SetupError;
use extractor::Extractor;
use fetcher::Fetcher;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::time::Instant;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    let cwd = std::env::current_dir()?;
    let config = Config::resolve(args, &cwd)?;

    logging::init_logging(config.verbose)?;

    println!("SQL Image Fetch v0.1.0");
    println!("==========================");
    println!("Input: {}", config.input.display());
    println!("Output: {}", config.output_dir.display());
    println!("Workers: {}", config.workers);
    println!("Extensions: {}", config.extensions.join(", "));
    println!();

    let extractor = Extractor::new(config.extensions.as_slice())?;
    let file = File::open(&config.input).map_err(|source| SetupError::ReadInput {
        path: config.input.clone(),
        source,
    })?;
    let records = extractor
        .extract_reader(BufReader::new(file))
        .map_err(|source| SetupError::ReadInput {
            path: config.input.clone(),
            source,
        })?;
    let tables: HashSet<&str> = records.iter().map(|r| r.source_table.as_str()).collect();
    info!(
        records = records.len(),
        tables = tables.len(),
        "extracted image references"
    );

    let urls = unique_urls(records);
    println!("Found {} unique remote files.", urls.len());

    std::fs::create_dir_all(&config.output_dir).map_err(|source| SetupError::CreateOutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let fetcher = Fetcher::new(config.timeout)?;
    let dispatcher = Dispatcher::new(fetcher, config.workers).with_progress(config.show_progress);

    let start_time = Instant::now();
    let summary = dispatcher.run(urls, &config.output_dir).await;
    let elapsed = start_time.elapsed();

    println!();
    println!("==========================");
    println!("{}", "Download completed!".green());
    println!("Time elapsed: {:.2}s", elapsed.as_secs_f64());
    println!("Total files: {}", summary.total);
    println!("Downloaded: {}", summary.downloaded);
    println!("Skipped (already present): {}", summary.skipped);
    if summary.failed > 0 {
        println!("{}", format!("Failed: {}", summary.failed).red());
    } else {
        println!("Failed: 0");
    }
    println!("Saved to: {}", config.output_dir.display());

    Ok(())
}

use crate::cli::Args;
use crate::error::SetupError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the directory created next to the input file
const IMAGE_DIR: &str = "image";

/// Everything a run needs, resolved from the command line before any work starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub extensions: Vec<String>,
    pub timeout: Option<Duration>,
    pub verbose: bool,
    pub show_progress: bool,
}

impl Config {
    /// Resolve arguments, looking in `cwd` for a dump when none was given
    pub fn resolve(args: Args, cwd: &Path) -> Result<Self, SetupError> {
        if args.workers == 0 {
            return Err(SetupError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let extensions = normalize_extensions(&args.extensions);
        if extensions.is_empty() {
            return Err(SetupError::InvalidConfig(
                "at least one image extension is required".to_string(),
            ));
        }

        let input = match args.input {
            Some(path) => path,
            None => find_default_input(cwd)?,
        };

        let output_dir = args.output.unwrap_or_else(|| {
            input
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(IMAGE_DIR)
        });

        Ok(Config {
            input,
            output_dir,
            workers: args.workers,
            extensions,
            timeout: args.timeout.map(Duration::from_millis),
            verbose: args.verbose,
            show_progress: !args.quiet,
        })
    }
}

/// First `.sql` file in `dir`, by name
pub fn find_default_input(dir: &Path) -> Result<PathBuf, SetupError> {
    let no_input = || SetupError::NoInputFile(dir.to_path_buf());

    let entries = fs::read_dir(dir).map_err(|_| no_input())?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(no_input)
}

fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut extensions: Vec<String> = Vec::new();
    for ext in raw {
        let ext = ext.trim().trim_start_matches('.');
        if !ext.is_empty() && !extensions.iter().any(|e| e == ext) {
            extensions.push(ext.to_string());
        }
    }
    extensions
}

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before the download pipeline starts. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no input file given and no .sql file found in {0}")]
    NoInputFile(PathBuf),

    #[error("failed to read input file {path}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create output directory {path}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to compile image URL pattern")]
    Pattern(#[from] regex::Error),
}

/// Errors for a single URL. Workers log these and move on to the next URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to get remote file info")]
    Metadata(#[source] reqwest::Error),

    #[error("download failed")]
    Download(#[source] reqwest::Error),

    #[error("failed to create file {path}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("URL has no file name: {0}")]
    NoFileName(String),
}

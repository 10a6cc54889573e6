use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging system. `RUST_LOG` wins when set; otherwise the
/// crate logs at info (debug when verbose). Log lines go to stderr so they
/// do not tear the progress bar.
pub fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), verbose);

    let fmt_layer = fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// The `RUST_LOG` directives when present and valid, the crate defaults otherwise
fn build_filter(env: Option<&str>, verbose: bool) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(verbose)))
}

/// Filter used when `RUST_LOG` is not set
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("sql_image_fetch={level},warn")
}

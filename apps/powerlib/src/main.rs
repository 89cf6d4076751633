//! # Powerlib - Asset Library Manager
//!
//! The main binary for Powerlib.
//!
//! ## Usage
//!
//! ```bash
//! # Create a library and fill it
//! powerlib -L lib/library.json init
//! powerlib -L lib/library.json collection add Characters
//! powerlib -L lib/library.json asset add Characters Boris
//! powerlib -L lib/library.json component add Characters Boris \
//!     -t group_reference_objects chars/boris.ext Boris
//!
//! # Link it into a scene document
//! powerlib -L lib/library.json -D shots/010.json link Characters Boris
//! ```

use clap::Parser;
use powerlib::cli::{self, Cli};
use powerlib::config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    init_tracing(config.log_format, default_filter(cli.verbose, cli.quiet));
    tracing::debug!(source = ?config.source, "configuration resolved");

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "powerlib=debug,powerlib_core=debug"
    } else if quiet {
        "powerlib=warn,powerlib_core=warn"
    } else {
        "powerlib=info,powerlib_core=info"
    }
}

/// Logs go to stderr so `--json-mode` output on stdout stays parseable.
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_tracing(format: LogFormat, default: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

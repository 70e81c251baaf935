//! docstore CLI entry point
//!
//! Installs logging, delegates to the CLI module, prints errors to stderr,
//! and exits non-zero on failure. Logs go to stderr; stdout carries only
//! command output.

use docstore::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docstore=info"));
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    if let Err(e) = cli::run_cli(args).await {
        cli::write_error(&e);
        std::process::exit(1);
    }
}

use std::process::ExitCode;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use based::cli;

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => e.exit(),
    };

    // ── Configuration ───────────────────────────────────────────────────────
    let (config, config_errors) = match cli::load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("based: can't read config: {e}");
            return ExitCode::FAILURE;
        }
    };

    // ── Logging ─────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli::log_filter(args.verbose, &config)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    for e in &config_errors {
        warn!("config {e}");
    }

    let stdout = std::io::stdout();
    match cli::execute(&args, &config, &mut stdout.lock()) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            eprintln!("based: {e}");
            ExitCode::from(cli::EXIT_FAILED)
        }
    }
}

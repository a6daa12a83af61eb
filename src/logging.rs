use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Compact stderr logging for the command-line tools. `RUST_LOG` wins over
/// the `verbose` switch when set.
pub fn init_cli_logger(verbose: bool) {
    let fallback = if verbose {
        "season_uncertainty=debug,info"
    } else {
        "season_uncertainty=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // try_init: a subscriber may already be installed.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

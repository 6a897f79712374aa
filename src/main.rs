//! querykill - find a running MySQL statement by its text, kill it, and keep an audit trail

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Diagnostics go to stderr; stdout carries only the JSON report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "querykill=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting querykill v{}", env!("CARGO_PKG_VERSION"));

    // Everything holding a connection is dropped inside run()
    let code = querykill::cli::run();
    std::process::exit(code);
}

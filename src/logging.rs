//! Logging setup for the CLI binary.
//!
//! Controlled by `RUST_LOG` (for example `RUST_LOG=runbook=debug`); without
//! it only warnings surface. Everything goes to stderr, leaving stdout to
//! reports and serialized documents.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

use std::sync::OnceLock;

use tracing::{debug, error};
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the logger, or update its filter if it is already installed.
///
/// `RUST_LOG` overrides the filter derived from `verbosity`.
pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let verbosity = verbosity.unwrap_or_default();

    let log_filter = match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,backstage=error,backstage_provider=error,backstage_catalog=error",
        // Only show warnings
        Verbosity::Verbose(0) => {
            "off,backstage=warn,backstage_provider=warn,backstage_catalog=warn"
        },
        Verbosity::Verbose(1) => {
            "off,backstage=info,backstage_provider=info,backstage_catalog=info"
        },
        // Show reads, requests and retries
        Verbosity::Verbose(2) => {
            "off,backstage=debug,backstage_provider=debug,backstage_catalog=debug"
        },
        Verbosity::Verbose(3) => {
            "off,backstage=trace,backstage_provider=trace,backstage_catalog=trace"
        },
        // Also show debug logs of the HTTP stack
        Verbosity::Verbose(4) => {
            "debug,backstage=trace,backstage_provider=trace,backstage_catalog=trace"
        },
        Verbosity::Verbose(_) => "trace",
    };

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        let (filter, reload_handle) = tracing_subscriber::reload::Layer::new(EnvFilter::new("off"));
        let log_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter);
        tracing_subscriber::registry().with(log_layer).init();
        reload_handle
    });

    update_filters(filter_handle, log_filter);
    debug!(?verbosity, "logger initialized");
}

fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

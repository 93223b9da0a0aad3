//! Log setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber. `RUST_LOG` takes precedence over the flags.
pub fn init(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "chipgen={default_level},chipgen_core={default_level},chipgen_emit={default_level}"
        ))
    });

    // A subscriber may already be installed (e.g. by tests); that is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

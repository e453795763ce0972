use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Install the global subscriber. `RUST_LOG` wins over the flags.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(
    verbose: bool,
    no_color: bool,
)
{
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(false)
        .with_ansi(!no_color)
        .compact()
        .try_init();
}

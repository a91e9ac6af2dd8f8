use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise structured JSON logging on stdout.
///
/// The level is controlled by `RUST_LOG` and defaults to `info`. Records
/// emitted through the `log` facade (actix's logger, `LoggerMiddleware`) are
/// bridged into the same subscriber. Returns an error if a global subscriber
/// is already installed.
pub fn init_telemetry() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_initializes_once() {
        let _ = init_telemetry();
        assert!(init_telemetry().is_err());
    }
}

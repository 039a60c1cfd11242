use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by the RUST_LOG env var.
    pub log_level: String,
    /// Per-module level overrides (e.g. "ddig_store" => "debug").
    pub module_levels: Vec<(String, String)>,
    /// JSON lines on stdout; human-readable output otherwise.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            module_levels: Vec::new(),
            json: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter {directive:?}: {reason}")]
    Filter { directive: String, reason: String },
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Filter directive built from the config, e.g. `info,ddig_store=debug`.
pub fn filter_directive(config: &TelemetryConfig) -> String {
    let mut directive = config.log_level.to_lowercase();
    for (module, level) in &config.module_levels {
        directive.push_str(&format!(",{}={}", module, level.to_lowercase()));
    }
    directive
}

/// Initialize the tracing subscriber. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let directive = filter_directive(config);
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directive).map_err(|e| TelemetryError::Filter {
            directive: directive.clone(),
            reason: e.to_string(),
        })?,
    };

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(filter = %directive, json = config.json, "telemetry initialized");
    Ok(())
}

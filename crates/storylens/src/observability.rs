//! Tracing subscriber setup for binaries and services embedding Storylens.
//!
//! Logs go to stderr through `tracing-subscriber`, either human readable or
//! JSON. With the `observability` feature, spans are also exported through
//! OpenTelemetry's stdout exporter.

use tracing_subscriber::{EnvFilter, Layer, Registry, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "observability")]
use std::sync::OnceLock;

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

#[cfg(feature = "observability")]
static TRACER_PROVIDER: OnceLock<opentelemetry_sdk::trace::SdkTracerProvider> = OnceLock::new();

/// Logging and telemetry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Service name for telemetry attribution
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "storylens_analysis=debug")
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl ObservabilityConfig {
    /// Create a configuration for `service_name` at the default `info` level.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Set the service version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Set the fallback filter directive.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Filter from `RUST_LOG`, falling back to [`log_level`](Self::log_level).
    ///
    /// # Errors
    ///
    /// Returns an error if `RUST_LOG` is unset and `log_level` is not a
    /// valid filter directive.
    pub fn env_filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
        Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.log_level))?)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Initialize logging with the default configuration.
///
/// # Errors
///
/// See [`init_observability_with_config`].
pub fn init_observability() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_observability_with_config(ObservabilityConfig::default())
}

/// Initialize the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber has already been installed.
pub fn init_observability_with_config(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = config.env_filter()?;

    let fmt_layer: BoxedLayer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    let mut layers = vec![fmt_layer];
    #[cfg(feature = "observability")]
    layers.push(otel_layer(&config));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        json = config.json_logs,
        "Observability initialized"
    );
    Ok(())
}

#[cfg(feature = "observability")]
fn otel_layer(config: &ObservabilityConfig) -> BoxedLayer {
    use opentelemetry::{KeyValue, global, trace::TracerProvider};
    use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes(vec![KeyValue::new(
            "service.version",
            config.service_version.clone(),
        )])
        .build();

    let provider = TRACER_PROVIDER
        .get_or_init(|| {
            SdkTracerProvider::builder()
                .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
                .with_resource(resource)
                .build()
        })
        .clone();
    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(config.service_name.clone());
    tracing_opentelemetry::layer().with_tracer(tracer).boxed()
}

/// Flush and shut down span export.
///
/// A no-op without the `observability` feature.
pub fn shutdown_observability() {
    #[cfg(feature = "observability")]
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Tracer provider shutdown failed");
        }
    }
}

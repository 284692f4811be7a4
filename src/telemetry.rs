//! Logging and OpenTelemetry initialization
//!
//! Logs go to stdout as text or JSON. Spans are additionally exported over
//! OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{Config, Sampler};
use tracing::{info, Level, Subscriber};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::config::LogFormat;
use crate::error::{Error, Result};

pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const SERVICE_NAME: &str = "database-api";

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Text => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(format));

    let otlp_endpoint = std::env::var(OTLP_ENDPOINT_ENV).ok();
    let otel_layer = match &otlp_endpoint {
        Some(endpoint) => Some(init_otel_layer(&registry, endpoint)?),
        None => None,
    };

    registry
        .with(otel_layer)
        .try_init()
        .map_err(|e| Error::TelemetryError(e.to_string()))?;

    match otlp_endpoint {
        Some(endpoint) => info!("OpenTelemetry tracing initialized ({})", endpoint),
        None => info!("OpenTelemetry tracing disabled ({} not set)", OTLP_ENDPOINT_ENV),
    }
    Ok(())
}

/// Build the OTLP export layer for `_subscriber`'s type.
fn init_otel_layer<S>(_subscriber: &S, endpoint: &str) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
{
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::new(vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    // TLS is used automatically when the endpoint scheme is https
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()
        .map_err(|e| Error::TelemetryError(format!("failed to build OTLP exporter: {e}")))?;

    let provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_config(
            Config::default()
                .with_resource(resource)
                .with_sampler(Sampler::AlwaysOn),
        )
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    let tracer = opentelemetry::trace::TracerProvider::tracer(&provider, SERVICE_NAME);
    global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

/// Flush and shut down the OpenTelemetry tracer provider.
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}

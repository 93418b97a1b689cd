use miette::{IntoDiagnostic, WrapErr};
use opentelemetry::InstrumentationScope;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing::info;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, TracingConfig};

/// The filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "scriptbot=debug,wanxiao=debug";

/// Initializes the global tracing subscriber.
///
/// Logs are always written to stdout in the configured format. When `tracing.enabled` is set,
/// spans are additionally exported over OTLP/HTTP, configured through the standard
/// `OTEL_EXPORTER_OTLP_*` environment variables.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be built or a global subscriber is already set.
pub fn try_init(tracing: &TracingConfig) -> miette::Result<()> {
    // Create a tracing layer with the configured tracer
    let telemetry_layer = if tracing.enabled {
        let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .build()
            .into_diagnostic()
            .wrap_err("building otlp http exporter failed")?;
        let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(otlp_exporter)
            .with_resource(
                Resource::builder_empty()
                    .with_service_name(env!("CARGO_PKG_NAME"))
                    .build(),
            )
            .build();
        let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url("https://opentelemetry.io/schema/1.0.0")
            .build();
        let tracer = provider.tracer_with_scope(scope);

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let stdout_layer = match tracing.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(stdout_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .try_init()
        .into_diagnostic()
        .wrap_err("could not init registry")?;

    info!(format = ?tracing.format, otlp = tracing.enabled, "tracing initialized");

    Ok(())
}

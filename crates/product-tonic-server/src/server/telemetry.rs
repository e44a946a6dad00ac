//! # Logging and Telemetry
//!
//! Log events always go through `tracing` to a pretty console layer filtered
//! by `RUST_LOG` (default `info`). OpenTelemetry export is opt-in via cargo
//! features.
//!
//! ## Feature matrix
//!
//! - `otel-trace`: Exports spans through `tracing-opentelemetry`.
//! - `metrics`: Records per-RPC counters and histograms.
//! - `otlp`: OTLP/gRPC exporter. The collector endpoint is read from
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4317`).
//! - `stdout`: Prints spans/metrics to stdout; useful for local debugging.
//!
//! Exporters require at least one of `otel-trace` or `metrics`, and both
//! exporters can be enabled at once.
//!
//! ## Metrics
//!
//! | name            | kind           | attributes       |
//! |-----------------|----------------|------------------|
//! | `rpc_requests`  | counter        | `method`         |
//! | `rpc_inflight`  | up/down        | `method`         |
//! | `rpc_errors`    | counter        | `method`, `kind` |
//! | `rpc_duration`  | histogram (ms) | `method`         |
//!
//! ## Example usage
//!
//! ```bash
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://collector:4317 \
//!     cargo run --features otel-trace,metrics,otlp
//! ```

#[cfg(all(feature = "otlp", not(any(feature = "otel-trace", feature = "metrics"))))]
compile_error!("The 'otlp' feature requires at least one of 'otel-trace' or 'metrics' to be enabled.");

#[cfg(all(feature = "stdout", not(any(feature = "otel-trace", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'otel-trace' or 'metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "otlp")]
use opentelemetry_otlp::{Protocol, WithExportConfig};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "otel-trace"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "otel-trace"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "otel-trace"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "otel-trace")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel-trace")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "otel-trace")]
use opentelemetry_sdk::trace as sdktrace;

#[cfg(any(feature = "metrics", feature = "otel-trace"))]
const SERVICE_NAME: &str = "product-tonic-server";

pub struct TelemetryProviders {
    #[cfg(feature = "otel-trace")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every exporter. Errors are printed to stderr
    /// because the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "otel-trace")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {:#?}", err);
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {:#?}", err);
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {:#?}", err);
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {:#?}", err);
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel-trace")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "otel-trace")]
    let tracer_provider = init_tracer()?;

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics()?;

    #[cfg(any(feature = "metrics", feature = "otel-trace"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        );

    #[cfg(feature = "otel-trace")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.init();

    Ok(TelemetryProviders {
        #[cfg(feature = "otel-trace")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "otlp")]
fn otlp_endpoint() -> String {
    std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string())
}

#[cfg(any(feature = "metrics", feature = "otel-trace"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        let exporter = opentelemetry_stdout::MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();
        builder.with_reader(reader)
    };

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint())
            .with_protocol(Protocol::Grpc)
            .with_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build metrics exporter")?;
        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(feature = "otel-trace")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = builder.with_simple_exporter(opentelemetry_stdout::SpanExporter::default());

    #[cfg(feature = "otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint())
            .with_protocol(Protocol::Grpc)
            .with_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build tracer exporter")?;

        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    Ok(builder.build())
}

#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("rpc_requests")
            .with_description("Product RPCs received")
            .build(),
    );

    let _ = INFLIGHT.set(
        meter
            .i64_up_down_counter("rpc_inflight")
            .with_description("Product RPCs currently executing")
            .build(),
    );

    let _ = ERRORS.set(
        meter
            .u64_counter("rpc_errors")
            .with_description("Product RPCs that returned an error status")
            .build(),
    );

    let _ = DURATION_MS.set(
        meter
            .f64_histogram("rpc_duration")
            .with_unit("ms")
            .with_description("End-to-end RPC handling time")
            .build(),
    );
}

// Each helper compiles to a no-op without the `metrics` feature.
#[cfg(feature = "metrics")]
pub fn rpc_started(method: &'static str) {
    let attrs = [KeyValue::new("method", method)];
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &attrs);
    }
    if let Some(counter) = INFLIGHT.get() {
        counter.add(1, &attrs);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn rpc_started(_method: &'static str) {}

#[cfg(feature = "metrics")]
pub fn rpc_finished(method: &'static str, duration_ms: f64) {
    let attrs = [KeyValue::new("method", method)];
    if let Some(counter) = INFLIGHT.get() {
        counter.add(-1, &attrs);
    }
    if let Some(histogram) = DURATION_MS.get() {
        histogram.record(duration_ms, &attrs);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn rpc_finished(_method: &'static str, _duration_ms: f64) {}

#[cfg(feature = "metrics")]
pub fn rpc_failed(method: &'static str, kind: &'static str) {
    if let Some(counter) = ERRORS.get() {
        counter.add(
            1,
            &[KeyValue::new("method", method), KeyValue::new("kind", kind)],
        );
    }
}

#[cfg(not(feature = "metrics"))]
pub fn rpc_failed(_method: &'static str, _kind: &'static str) {}

use crate::config::{CommonConfig, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const METRICS_PREFIX: &str = "relay";

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("could not install log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] metrics_exporter_statsd::StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Recorder(String),
    #[error("invalid Sentry DSN: {0}")]
    SentryDsn(#[from] sentry::types::ParseDsnError),
}

/// Keeps the Sentry client alive until the invocation completes.
pub struct Telemetry {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Maps the configured log level to a tracing filter directive. Accepts
/// Python-style names like `WARNING` and `CRITICAL` as well as tracing names.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

fn env_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => Ok(EnvFilter::try_new(directives)?),
        _ => Ok(EnvFilter::try_new(level_directive(log_level))?),
    }
}

/// Installs logging (stderr), the Sentry client and layer, and the statsd
/// recorder, each only when configured.
pub fn init(common: &CommonConfig, log_level: &str) -> Result<Telemetry, TelemetryError> {
    let sentry = common.logging.as_ref().map(init_sentry).transpose()?;
    let sentry_layer = sentry
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(env_filter(log_level)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_layer)
        .try_init()?;

    if let Some(metrics_config) = &common.metrics {
        init_metrics(metrics_config)?;
    }

    shared::metrics_defs::describe_all(shared::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(notifier::metrics_defs::ALL_METRICS);

    Ok(Telemetry { _sentry: sentry })
}

fn init_sentry(config: &LoggingConfig) -> Result<sentry::ClientInitGuard, TelemetryError> {
    let dsn: sentry::types::Dsn = config.sentry_dsn.parse()?;

    Ok(sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        ..Default::default()
    }))
}

fn init_metrics(config: &MetricsConfig) -> Result<(), TelemetryError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|e| TelemetryError::Recorder(e.to_string()))?;

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "statsd metrics enabled"
    );
    Ok(())
}

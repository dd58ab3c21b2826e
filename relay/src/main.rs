mod config;
mod telemetry;

use clap::Parser;
use config::{CommonConfig, Config, ConfigError};
use notifier::envelope::InboundEnvelope;
use notifier::errors::SetupError;
use notifier::handler::prepare_message;
use notifier::{Relay, RelayError};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use telemetry::TelemetryError;

#[derive(Parser)]
#[command(name = "relay", about = "Relays SNS notifications to a Slack channel")]
enum CliCommand {
    /// Runs one invocation and prints the result as JSON.
    Invoke {
        /// YAML config file. Settings are read from the environment when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// SNS event payload. Read from stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Extracts and validates the message without contacting Slack or SNS.
    Validate {
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("could not read event: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("could not encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl CliError {
    /// Failure report for the host. Relay errors carry their kind.
    fn report(&self) -> serde_json::Value {
        let kind = match self {
            CliError::Relay(e) => e.kind(),
            CliError::Config(_) | CliError::Setup(SetupError::Config(_)) => "ConfigError",
            _ => "RuntimeError",
        };
        serde_json::json!({
            "errorType": kind,
            "errorMessage": self.to_string(),
        })
    }
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match &cli {
        CliCommand::Invoke { config, event } => invoke(config.as_deref(), event.as_deref()),
        CliCommand::Validate { event } => validate(event.as_deref()),
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.report());
            ExitCode::FAILURE
        }
    }
}

fn invoke(config_path: Option<&Path>, event_path: Option<&Path>) -> Result<String, CliError> {
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    let _telemetry = telemetry::init(&config.common, &config.notifier.log_level)?;

    let event = read_event(event_path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let relay = Relay::from_config(&config.notifier).await?;
        tracing::info!(channel = relay.channel(), "relaying event");
        Ok::<_, CliError>(relay.handle_raw(&event).await?)
    })?;

    Ok(serde_json::to_string(&result)?)
}

fn validate(event_path: Option<&Path>) -> Result<String, CliError> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".into());
    let _telemetry = telemetry::init(&CommonConfig::default(), &log_level)?;

    let event = read_event(event_path)?;
    let envelope = InboundEnvelope::from_slice(&event).map_err(RelayError::from)?;
    let message = prepare_message(&envelope)?;

    Ok(serde_json::to_string_pretty(&message)?)
}

fn read_event(path: Option<&Path>) -> Result<Vec<u8>, std::io::Error> {
    match path {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

//! Webhook sender CLI.
//!
//! ```text
//! webhook-sender send --url https://example.com/hook --data '{"event":"ping"}'
//! webhook-sender sign --secret s --data '{"a":1}'
//! webhook-sender verify --secret s --data '{"a":1}' --signature <HEX> --timestamp <T>
//! ```
//!
//! `send` and `verify` read their defaults from `--config` (TOML) when
//! given; flags win over the file. Ctrl-C cancels an in-flight delivery.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use webhook_sender::config::{load_config, SenderConfig};
use webhook_sender::delivery::{SendOptions, Sender};
use webhook_sender::lifecycle::signals::cancel_on_ctrl_c;
use webhook_sender::lifecycle::Context;
use webhook_sender::observability::logging::init_logging;
use webhook_sender::security::{sign_payload, sign_payload_at, verify_signature, SignatureHeaders};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "webhook-sender", version)]
#[command(about = "Deliver signed JSON webhooks with retries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver one JSON payload
    Send(SendArgs),
    /// Print the signature headers for a payload
    Sign {
        #[arg(long)]
        secret: String,
        /// Exact payload bytes to sign
        #[arg(long)]
        data: String,
        /// Unix seconds; defaults to now
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Verify a received signature
    Verify {
        #[arg(long)]
        secret: String,
        /// Exact payload bytes as received
        #[arg(long)]
        data: String,
        #[arg(long)]
        signature: String,
        #[arg(long)]
        timestamp: i64,
        /// 0 disables the age check; defaults to `signing.max_age_secs`
        #[arg(long)]
        max_age_secs: Option<u64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SendArgs {
    #[arg(long)]
    url: String,

    /// JSON payload
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    data: Option<String>,

    /// Read the JSON payload from a file
    #[arg(long)]
    file: Option<PathBuf>,

    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra header, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Send(args) => send(args).await,
        Commands::Sign {
            secret,
            data,
            timestamp,
        } => sign(&secret, &data, timestamp),
        Commands::Verify {
            secret,
            data,
            signature,
            timestamp,
            max_age_secs,
            config,
        } => load_or_default(config.as_deref()).and_then(|config| {
            let max_age = config.signing.verification_max_age(max_age_secs);
            verify(&secret, &data, signature, timestamp, max_age)
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn send(args: SendArgs) -> CliResult {
    let config = load_or_default(args.config.as_deref())?;
    init_logging(&config.observability);

    let payload: serde_json::Value = match (&args.data, &args.file) {
        (Some(data), _) => serde_json::from_str(data)?,
        (None, Some(path)) => read_payload(path)?,
        (None, None) => return Err("either --data or --file is required".into()),
    };

    let sender = Sender::from_config(&config)?;
    let mut options = SendOptions::new().with_headers(args.headers);
    if let Some(max_retries) = args.max_retries {
        options = options.with_max_retries(max_retries);
    }
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    options = options.on_delivery(|result| {
        tracing::info!(
            attempt = result.attempt,
            status = result.status_code,
            duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            success = result.success,
            "Attempt complete"
        );
    });

    let ctx = Context::background();
    let interrupt = cancel_on_ctrl_c(&ctx);
    let outcome = sender.send(&ctx, &args.url, &payload, options).await;
    interrupt.abort();

    outcome?;
    println!("Delivered to {}", args.url);
    Ok(())
}

fn sign(secret: &str, data: &str, timestamp: Option<i64>) -> CliResult {
    let headers = match timestamp {
        Some(ts) => sign_payload_at(secret, data.as_bytes(), ts, Uuid::new_v4().to_string())?,
        None => sign_payload(secret, data.as_bytes())?,
    };
    for (name, value) in headers.to_pairs() {
        println!("{}: {}", name, value);
    }
    Ok(())
}

fn verify(
    secret: &str,
    data: &str,
    signature: String,
    timestamp: i64,
    max_age: Duration,
) -> CliResult {
    let headers = SignatureHeaders {
        signature,
        timestamp,
        id: String::new(),
    };
    verify_signature(secret, data.as_bytes(), &headers, max_age)?;
    println!("Signature valid");
    Ok(())
}

fn load_or_default(path: Option<&Path>) -> Result<SenderConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(SenderConfig::default()),
    }
}

fn read_payload(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME:VALUE, got {:?}", raw)),
    }
}

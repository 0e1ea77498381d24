//! Token Auth CLI
//!
//! Signs and verifies tokens using the environment configuration.
//!
//! ```text
//! token-auth sign                                  # claims JSON object on stdin
//! token-auth verify <token> [--ignore-expiration]
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::Read;
use token_auth::{Claims, Rs256, Rs256Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sign and verify RS256 tokens
#[derive(Parser, Debug)]
#[command(name = "token-auth", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign the claims JSON object read from stdin
    Sign,

    /// Verify a token and print its claims
    Verify {
        /// Compact serialized token
        token: String,

        /// Accept tokens past their expiry, reporting them as expired
        #[arg(long)]
        ignore_expiration: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Rs256Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        key_id = %config.key_id,
        issuer = %config.issuer,
        audience = %config.audience,
        max_age_seconds = config.max_age.as_secs(),
        "Configuration loaded successfully"
    );

    let rs256 = Rs256::from_config(config)?;

    match cli.command {
        Command::Sign => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            let value: serde_json::Value = serde_json::from_str(&input)?;
            let claims =
                Claims::from_json(value).map_err(|_| "claims must be a JSON object".to_string())?;

            let signed = rs256.sign(claims)?;
            println!(
                "{}",
                json!({ "token": signed.token, "expiry": signed.expiry.to_rfc3339() })
            );
        }
        Command::Verify {
            token,
            ignore_expiration,
        } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });

            let verified = rs256
                .parse_with_cancellation(&token, ignore_expiration, &cancel)
                .await?;
            println!(
                "{}",
                json!({
                    "claims": verified.claims,
                    "expiry": verified.expiry.to_rfc3339(),
                    "expired": verified.expired,
                })
            );
        }
    }

    Ok(())
}

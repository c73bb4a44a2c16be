use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use windowgate::config::{LoggingConfig, WindowgateConfig};
use windowgate::ratelimit::{LimiterSet, Profile};

#[derive(Parser, Debug)]
#[command(name = "windowgate", version, about = "Fixed-window rate limiter")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective quota for every profile
    Profiles,

    /// Run a burst of checks against one profile and report each decision
    Simulate {
        /// Profile to exercise (api, auth, search, upload)
        #[arg(long)]
        profile: Profile,

        /// Key to throttle
        #[arg(long, default_value = "demo")]
        key: String,

        /// Number of checks to issue
        #[arg(long, default_value_t = 10)]
        requests: u32,

        /// Pause between checks in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
}

#[derive(Serialize)]
struct ProfileRow {
    profile: Profile,
    max_requests: u32,
    window_ms: u64,
}

#[derive(Serialize)]
struct Attempt<'a> {
    attempt: u32,
    key: &'a str,
    allowed: bool,
    remaining: u32,
    retry_after_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WindowgateConfig::from_file(path)?,
        None => WindowgateConfig::from_env()?,
    };

    init_tracing(&config.logging);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Configuration loaded from defaults and environment"),
    }

    match cli.command {
        Command::Profiles => print_profiles(&config, cli.json)?,
        Command::Simulate {
            profile,
            key,
            requests,
            interval_ms,
        } => simulate(&config, profile, &key, requests, interval_ms, cli.json).await?,
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_profiles(config: &WindowgateConfig, json: bool) -> anyhow::Result<()> {
    for profile in Profile::ALL {
        let limit = config.limits.get(profile);
        if json {
            let row = ProfileRow {
                profile,
                max_requests: limit.max_requests,
                window_ms: limit.window_ms,
            };
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!(
                "{:<8} {:>6} requests / {} ms",
                profile, limit.max_requests, limit.window_ms
            );
        }
    }
    Ok(())
}

async fn simulate(
    config: &WindowgateConfig,
    profile: Profile,
    key: &str,
    requests: u32,
    interval_ms: u64,
    json: bool,
) -> anyhow::Result<()> {
    let limiters = LimiterSet::new(&config.limits);
    let limiter = limiters.get(profile);

    info!(profile = %profile, key = %key, requests = requests, "Starting simulation");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    for attempt in 1..=requests {
        let allowed = limiter.check_limit(key);
        let report = Attempt {
            attempt,
            key,
            allowed,
            remaining: limiter.get_remaining(key),
            retry_after_secs: if allowed { 0 } else { limiter.retry_after_secs(key) },
        };

        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else if allowed {
            println!(
                "#{:<4} {} allowed  (remaining {})",
                report.attempt, key, report.remaining
            );
        } else {
            println!(
                "#{:<4} {} denied   (retry in {}s)",
                report.attempt, key, report.retry_after_secs
            );
        }

        if attempt < requests && interval_ms > 0 {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
            }
        }
    }

    info!("Simulation finished");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping simulation");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping simulation");
        }
    }
}

//! Zentinel CAS Authentication
//!
//! Runs the CAS strategy for a single request URL against a live CAS server
//! and prints the outcome as JSON. Useful for checking a CAS deployment
//! before wiring the strategy into a host.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use zentinel_cas_auth::{
    AuthOutcome, CasConfig, CasProfile, CasStrategy, Completion, LogHooks, RequestParts,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "zentinel-cas-auth")]
#[command(about = "Evaluate a request against a CAS server")]
struct Args {
    /// Request URL to evaluate (path and query, or absolute)
    request_url: String,

    /// JSON config file (alternative to the individual CAS flags)
    #[arg(long, env = "CAS_CONFIG")]
    config: Option<PathBuf>,

    /// CAS server base URL
    #[arg(long, env = "CAS_BASE_URL")]
    base: Option<String>,

    /// CAS login route
    #[arg(long, env = "CAS_LOGIN_ROUTE")]
    login_route: Option<String>,

    /// CAS ticket validation route
    #[arg(long, env = "CAS_VALIDATE_ROUTE")]
    validate_route: Option<String>,

    /// CAS logout route
    #[arg(long, env = "CAS_LOGOUT_ROUTE")]
    logout_route: Option<String>,

    /// Public URL of this service
    #[arg(long, env = "CAS_SERVER_URL")]
    server_url: Option<String>,

    /// Accept every profile the CAS server validates
    #[arg(long)]
    accept: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "CAS_VERBOSE")]
    verbose: bool,
}

impl Args {
    fn cas_config(&self) -> Result<CasConfig> {
        if let Some(ref path) = self.config {
            return CasConfig::from_json_file(path);
        }

        let required = |value: &Option<String>, flag: &str| {
            value
                .clone()
                .ok_or_else(|| anyhow!("--{} is required without --config", flag))
        };

        Ok(CasConfig {
            base: required(&self.base, "base")?,
            login_route: required(&self.login_route, "login-route")?,
            validate_route: required(&self.validate_route, "validate-route")?,
            logout_route: required(&self.logout_route, "logout-route")?,
            server_url: required(&self.server_url, "server-url")?,
        })
    }
}

/// Challenge reported when `--accept` is not given.
const NOT_ACCEPTED: &str = "not accepted";

fn verify_hook(accept: bool) -> impl Fn(CasProfile, Completion<CasProfile, ()>) + Send + Sync {
    move |profile: CasProfile, done: Completion<CasProfile, ()>| {
        if accept {
            done.success(profile, None);
        } else {
            done.fail(Some(NOT_ACCEPTED.to_string()));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("{}={}", env!("CARGO_CRATE_NAME"), log_level))
        .json()
        .init();

    let config = args.cas_config()?;
    info!(base = %config.base, server_url = %config.server_url, "Configuration loaded");

    let strategy = CasStrategy::new(config, verify_hook(args.accept))?
    .with_log_hooks(LogHooks::new().with_error(|message, error| match error {
        Some(e) => eprintln!("{}: {:#}", message, e),
        None => eprintln!("{}", message),
    }));

    let mut request = RequestParts::new(args.request_url.clone());
    let outcome: AuthOutcome<CasProfile, ()> = strategy.authenticate(&mut request).await;

    if request.logged_out() {
        info!("Local session ended");
    }

    let rendered = serde_json::to_string_pretty(&outcome).context("Failed to render outcome")?;
    println!("{}", rendered);

    Ok(())
}

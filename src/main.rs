//!
//! authkeep command-line client
//! ----------------------------
//! Logs in against the configured API, keeps the session in the state directory,
//! and issues authenticated calls through the shared session.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use authkeep::identity::SessionState;
use authkeep::surface::{MemoryNavigator, Navigator, TracingNotifier};
use authkeep::{AuthRuntime, ClientConfig};

const USAGE: &str = "authkeep\n\nUSAGE:\n  authkeep [OPTIONS] <COMMAND>\n\nCOMMANDS:\n  login --email E [--password P] [--no-remember]   Sign in (password also read from AUTHKEEP_PASSWORD)\n  logout                                           Sign out and clear stored session\n  status                                           Show the restored session\n  embed <dashboard>                                Fetch an analytics embed URL\n\nOPTIONS:\n  --config PATH        JSON config file (default: none)\n  --api-url URL        Main API base URL (env: AUTHKEEP_API_URL)\n  --analytics-url URL  Analytics API base URL (env: AUTHKEEP_ANALYTICS_URL)\n  --state-dir PATH     Persistent session directory (env: AUTHKEEP_STATE_DIR)\n\n--no-remember keeps the session in memory only, so it ends with this process.\n";

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool { args.iter().any(|a| a == flag) }

/// Arguments that are neither flags nor flag values.
fn positionals(args: &[String]) -> Vec<String> {
    const WITH_VALUE: [&str; 6] = ["--config", "--api-url", "--analytics-url", "--state-dir", "--email", "--password"];
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        if WITH_VALUE.contains(&a.as_str()) {
            i += 2;
            continue;
        }
        if !a.starts_with('-') {
            out.push(a.clone());
        }
        i += 1;
    }
    out
}

fn load_config(args: &[String]) -> Result<ClientConfig> {
    let path = arg_value(args, "--config").map(PathBuf::from);
    let mut cfg = ClientConfig::load(path.as_deref())?;
    // CLI arguments override environment
    if let Some(v) = arg_value(args, "--api-url") { cfg.api_url = v; }
    if let Some(v) = arg_value(args, "--analytics-url") { cfg.analytics_url = v; }
    if let Some(v) = arg_value(args, "--state-dir") { cfg.state_dir = PathBuf::from(v); }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let cfg = load_config(&args)?;
    let navigator = Arc::new(MemoryNavigator::new("/"));
    let runtime = AuthRuntime::from_config(cfg, navigator.clone(), Arc::new(TracingNotifier))?;
    let restored = runtime.session.bootstrap();

    let pos = positionals(&args);
    let command = pos.first().map(String::as_str).unwrap_or("");
    match command {
        "login" => {
            let email = arg_value(&args, "--email").ok_or_else(|| anyhow!("login requires --email"))?;
            let password = arg_value(&args, "--password")
                .or_else(|| env::var("AUTHKEEP_PASSWORD").ok())
                .ok_or_else(|| anyhow!("login requires --password or AUTHKEEP_PASSWORD"))?;
            let remember = !has_flag(&args, "--no-remember");
            let identity = runtime.session.login(&email, &password, remember).await?;
            println!("signed in as {} <{}> (role: {})", identity.name, identity.email, identity.role);
        }
        "logout" => {
            runtime.session.logout().await;
            println!("signed out");
        }
        "status" => match restored {
            SessionState::Authenticated(id) => {
                let mode = if runtime.core().tokens().is_persistent() { "persistent" } else { "ephemeral" };
                println!("signed in as {} <{}> id={} role={} ({})", id.name, id.email, id.id, id.role, mode);
            }
            _ => println!("not signed in"),
        },
        "embed" => {
            let dashboard = pos.get(1).ok_or_else(|| anyhow!("embed requires a dashboard name"))?;
            let resp = runtime.analytics.embed_url(dashboard).await;
            if let Some(err) = resp.error {
                if navigator.current_path() == runtime.config.login_path {
                    println!("session expired, sign in again");
                }
                return Err(anyhow!(err));
            }
            println!("{}", resp.iframe_url);
        }
        other => {
            println!("{}", USAGE);
            return Err(anyhow!("unknown command '{}'", other));
        }
    }
    info!(target: "authkeep", "done: {}", command);
    Ok(())
}

/*
newsfed - interactive client for a federation of news agencies.
Looks agencies up in the directory, fans `news` queries out to all of them, and posts/deletes
stories on the one agency the user is logged into.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsfed::aggregator::Aggregator;
use newsfed::clients::agency::AgencyClient;
use newsfed::clients::directory::HttpDirectory;
use newsfed::session::SessionManager;
use newsfed::shell::{Flow, Shell};

#[derive(Parser, Debug)]
#[command(name = "newsfed", about = "Query and post stories across news agencies")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the directory service base URL
    #[arg(long, value_name = "URL")]
    directory: Option<String>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Run one command (e.g. `news -cat=tech`) instead of the interactive loop
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout belongs to the shell.
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let mut config = match Config::load_with_defaults(Some(default_path.as_path()), override_path.as_deref()).await {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    if let Some(url) = args.directory {
        config.directory.url = Some(url);
    }
    info!(default = ?default_path, override = ?override_path, directory = %config.directory_url(), "configuration loaded");

    let agency = Arc::new(AgencyClient::new(&config)?);
    let directory = Arc::new(HttpDirectory::new(&config)?);
    let aggregator = Aggregator::new(directory, agency.clone()).with_config(&config);
    let sessions = SessionManager::new(config.clone());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut shell = Shell::new(stdin, std::io::stdout(), sessions, agency, aggregator);

    if args.command.is_empty() {
        shell.run().await?;
    } else {
        let line = args.command.join(" ");
        if shell.execute(&line).await? == Flow::Exit {
            info!("exit requested");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

mod api;
mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod datasource;
mod debounce;
mod event;
mod logging;
mod notify;
mod session;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "crmdesk")]
#[command(about = "A terminal back-office for paginated CRM REST APIs")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./crmdesk.yaml or $XDG_CONFIG_HOME/crmdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Resource to open on startup
  #[arg(short, long)]
  resource: Option<String>,

  #[command(subcommand)]
  action: Option<cli::Action>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  let config = config::Config::load(args.config.as_deref())?;

  // Override the startup resource if specified on command line
  let config = match args.resource {
    Some(resource) => {
      config.resource(&resource)?;
      config::Config {
        default_resource: Some(resource),
        ..config
      }
    }
    None => config,
  };

  let session = session::SessionStore::open_default()?;
  let cache = cache::PageCache::from_config(&config.cache)?;

  match args.action {
    Some(action) => cli::run(action, config, session, cache).await,
    None => {
      tracing::info!("Starting TUI");
      let mut app = app::App::new(config, session, cache)?;
      app.run().await
    }
  }
}

mod api;
mod app;
mod config;
mod event;
mod query;
mod routes;
mod ui;

use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "A terminal front-end for a student roster REST backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/roster/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Location to open, e.g. /students?page=2 or /students/5
  #[arg(short, long, default_value = "/students")]
  route: String,
}

/// Send logs to a file in the data directory; the terminal belongs to the UI
fn init_logging() -> Result<WorkerGuard> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  let log_dir = data_dir.join("roster");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
    &log_dir,
    "roster.log",
  ));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roster=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let route = routes::Route::parse(&args.route);

  // Initialize and run the app
  let mut app = app::App::new(&config, route)?;
  app.run().await?;

  Ok(())
}

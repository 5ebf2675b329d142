pub mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::commands::AppState;
use crate::services::notifier::ConsoleNotifier;
use crate::services::occupancy_api::ApiConfig;

/// Study space occupancy: best location, current occupancy, and image estimates.
#[derive(Debug, Parser)]
#[command(name = "jett", version, about)]
pub struct Cli {
    /// Occupancy service base URL (overrides JETT_API_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Image of your study area to estimate occupancy for
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Print the view as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub async fn run() {
    if let Err(error) = try_run(Cli::parse()).await {
        eprintln!("failed to launch application: {error}");
    }
}

async fn try_run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    crate::utils::logger::init_logging(&crate::utils::logger::log_dir_from_env())?;

    let mut config = ApiConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }

    let state = AppState::new(config, Arc::new(ConsoleNotifier))?;

    crate::commands::session::session_initialize(&state)
        .await
        .map_err(|err| err.message)?;

    if let Some(path) = cli.image {
        // the view still renders after a failed upload
        if let Err(err) = crate::commands::session::image_upload(&state, Some(path)).await {
            eprintln!("! {}", err.message);
        }
    }

    let view = crate::commands::session::session_view(&state).map_err(|err| err.message)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", view.render_text());
    }

    Ok(())
}

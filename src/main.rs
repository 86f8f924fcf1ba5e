use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use usagebar::commands;
use usagebar::config::{Command, Config, Settings};
use usagebar::ui::App;
use usagebar_core::credentials::KeyringStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    // Setup logging
    if cli.is_interactive() {
        let log_file = settings.log_file.clone().or_else(default_log_file);
        setup_file_logging(cli.debug, log_file)?;
    } else {
        setup_logging(cli.debug);
    }

    match &cli.command {
        None => {
            let service = commands::build_service(&settings, commands::credential_store());
            let mut app = App::new(settings, service);
            app.run().await
        }
        Some(Command::Status { json }) => {
            let service = commands::build_service(&settings, commands::credential_store());
            commands::status(&service, *json).await
        }
        Some(Command::Login { org_id }) => {
            commands::login(&KeyringStore::new(), org_id, io::stdin().lock())
        }
        Some(Command::Logout) => commands::logout(&KeyringStore::new()),
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("usagebar=debug,usagebar_core=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("usagebar=info,usagebar_core=info"))
    }
}

/// Log to stderr for one-shot commands
fn setup_logging(debug: bool) {
    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

/// Log to a file while the terminal UI owns the screen
fn setup_file_logging(debug: bool, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("usagebar/usagebar.log"))
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml_edit::DocumentMut;
use tracing::info;

use usagebar_core::scheduler::Cadence;
use usagebar_core::usage::DEFAULT_API_ROOT;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "claude.ai plan usage monitor")]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API root (e.g. https://claude.ai/api)
    #[arg(long, global = true)]
    pub api_root: Option<String>,

    /// Poll interval in seconds while the usage panel is closed
    #[arg(long)]
    pub slow_interval: Option<u64>,

    /// Poll interval in seconds while the usage panel is open
    #[arg(long)]
    pub fast_interval: Option<u64>,

    /// Longest stretch of fast polling in seconds
    #[arg(long)]
    pub fast_window: Option<u64>,

    /// Log file for the terminal UI
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch usage once and print it
    Status {
        /// Print the whole snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store credentials; the session key is read from stdin
    Login {
        /// claude.ai organization ID
        #[arg(long)]
        org_id: String,
    },
    /// Remove stored credentials
    Logout,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if running the terminal UI
    pub fn is_interactive(&self) -> bool {
        self.command.is_none()
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the claude.ai API
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// Per-request timeout in seconds (no timeout when unset)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Poll cadence
    #[serde(default)]
    pub poll: PollSettings,

    /// UI settings
    #[serde(default)]
    pub ui: UiSettings,

    /// Log file for the terminal UI
    #[serde(skip)]
    pub log_file: Option<PathBuf>,

    /// File the settings came from, or where they would be written
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

/// Poll cadence in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Interval while the usage panel is closed
    #[serde(default = "default_slow_secs")]
    pub slow_secs: u64,

    /// Interval while the usage panel is open
    #[serde(default = "default_fast_secs")]
    pub fast_secs: u64,

    /// Longest stretch of fast polling after the panel opens
    #[serde(default = "default_fast_window_secs")]
    pub fast_window_secs: u64,
}

fn default_slow_secs() -> u64 {
    300
}

fn default_fast_secs() -> u64 {
    30
}

fn default_fast_window_secs() -> u64 {
    300
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            slow_secs: default_slow_secs(),
            fast_secs: default_fast_secs(),
            fast_window_secs: default_fast_window_secs(),
        }
    }
}

/// UI-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Show the session percentage next to the bar glyph
    #[serde(default)]
    pub show_percentage: bool,

    /// Enable color output
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_color() -> bool {
    true
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_percentage: false,
            color: default_color(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            request_timeout_secs: None,
            poll: PollSettings::default(),
            ui: UiSettings::default(),
            log_file: None,
            path: None,
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read(p);
            }
            return Ok(Self {
                path: Some(p.clone()),
                ..Self::default()
            });
        }

        // Try default config locations
        let default_paths = Self::default_paths();
        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self {
            path: default_paths.into_iter().flatten().next(),
            ..Self::default()
        })
    }

    fn default_paths() -> [Option<PathBuf>; 3] {
        [
            dirs::config_dir().map(|p| p.join("usagebar/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/usagebar/config.toml")),
            dirs::home_dir().map(|p| p.join(".usagebar.toml")),
        ]
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        settings.path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(api_root) = &cli.api_root {
            self.api_root = api_root.clone();
        }
        if let Some(secs) = cli.slow_interval {
            self.poll.slow_secs = secs;
        }
        if let Some(secs) = cli.fast_interval {
            self.poll.fast_secs = secs;
        }
        if let Some(secs) = cli.fast_window {
            self.poll.fast_window_secs = secs;
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = Some(log_file.clone());
        }
    }

    /// Validate and normalize settings values
    ///
    /// Intervals are between one second and one day, and the fast window
    /// covers at least one fast interval.
    pub fn validate(&mut self) {
        const MIN_INTERVAL_SECS: u64 = 1;
        const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

        self.poll.slow_secs = self
            .poll
            .slow_secs
            .clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        self.poll.fast_secs = self
            .poll
            .fast_secs
            .clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        self.poll.fast_window_secs = self
            .poll
            .fast_window_secs
            .clamp(self.poll.fast_secs, MAX_INTERVAL_SECS);
        if let Some(secs) = self.request_timeout_secs {
            self.request_timeout_secs = Some(secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS));
        }

        let trimmed = self.api_root.trim().trim_end_matches('/');
        self.api_root = if trimmed.is_empty() {
            default_api_root()
        } else {
            trimmed.to_string()
        };
    }

    /// Poll cadence for the scheduler
    pub fn cadence(&self) -> Cadence {
        Cadence {
            slow: Duration::from_secs(self.poll.slow_secs),
            fast: Duration::from_secs(self.poll.fast_secs),
            fast_window: Duration::from_secs(self.poll.fast_window_secs),
        }
    }

    /// Request timeout for the HTTP agent
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Update the show-percentage preference and persist it to the config file
    pub fn set_show_percentage(&mut self, show: bool) -> Result<()> {
        self.ui.show_percentage = show;
        match &self.path {
            Some(path) => write_show_percentage(path, show),
            None => Ok(()),
        }
    }
}

/// Set `ui.show_percentage` in a config file, keeping the rest of it as-is
pub fn write_show_percentage(path: &Path, show: bool) -> Result<()> {
    let mut doc = match fs::read_to_string(path) {
        Ok(content) => content
            .parse::<DocumentMut>()
            .with_context(|| format!("Failed to parse config file: {:?}", path))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DocumentMut::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config file: {:?}", path))
        }
    };

    let ui = doc.entry("ui").or_insert(toml_edit::table());
    if !ui.is_table_like() {
        *ui = toml_edit::table();
    }
    if let Some(table) = ui.as_table_like_mut() {
        table.insert("show_percentage", toml_edit::value(show));
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
    }

    // Write atomically using temp file
    let temp_path = path.with_extension("toml.tmp");
    let _ = fs::remove_file(&temp_path);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp config file: {:?}", temp_path))?;
    file.write_all(doc.to_string().as_bytes())
        .with_context(|| format!("Failed to write temp config file: {:?}", temp_path))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync temp config file: {:?}", temp_path))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename config file: {:?}", path))?;

    info!("Saved show_percentage = {} to {:?}", show, path);
    Ok(())
}

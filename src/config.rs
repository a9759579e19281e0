use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::resource::{DEFAULT_PAGE_SIZE, ResourceConfig};

const DEFAULT_PORT: u16 = 8088;
const DEFAULT_DATABASE: &str = "puka.db";
const DEFAULT_MAX_SESSIONS: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "puka")]
#[command(about = "Runs the puka bookmark service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// JSON array of bookmarks to bulk-load before serving
    #[arg(long = "seed")]
    pub seed_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".puka")
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for App {
    fn default() -> Self {
        App {
            port: DEFAULT_PORT,
            base_url: None,
            database: default_database(),
            auth_token: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Falls back to `http://localhost:<port>` when unset or blank.
    pub fn get_base_url(&self) -> String {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://localhost:{}", self.port),
        }
    }

    pub fn get_auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn get_max_sessions(&self) -> usize {
        self.max_sessions.max(1)
    }

    pub fn resource_config(&self) -> ResourceConfig {
        ResourceConfig {
            default_page_size: self.page_size.max(1),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Configuration from `PORT`, `BASE_URL`, `PUKA_DATABASE` and
    /// `PUKA_TOKEN`, logging each default that gets used.
    pub fn from_env() -> Result<Self> {
        let mut app = App::default();

        match env::var("PORT") {
            Ok(port) if !port.is_empty() => {
                app.port = port
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid $PORT {port:?}: {e}"))?;
            }
            _ => tracing::info!("$PORT not set, using: {}", DEFAULT_PORT),
        }

        match env::var("BASE_URL") {
            Ok(url) if !url.is_empty() => app.base_url = Some(url),
            _ => tracing::info!("$BASE_URL not set, using: {}", app.get_base_url()),
        }

        match env::var("PUKA_DATABASE") {
            Ok(db) if !db.is_empty() => app.database = db,
            _ => tracing::info!("$PUKA_DATABASE not set, using: {}", DEFAULT_DATABASE),
        }

        match env::var("PUKA_TOKEN") {
            Ok(token) if !token.is_empty() => app.auth_token = Some(token),
            _ => tracing::info!("$PUKA_TOKEN not set, will not authenticate"),
        }

        Ok(Config { app })
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

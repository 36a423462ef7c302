use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure that can be loaded from CLI args, a TOML
/// config file, or both (CLI wins).
///
/// Example configuration file content
/// # Video Rebrander Configuration
///
/// # Server configuration
/// listen_on_port = 8000
/// max_concurrent_jobs = 2
/// workspace = "/tmp/video-rebrander"
///
/// # Upload limits (megabytes)
/// max_video_size_mb = 100
/// max_image_size_mb = 10
///
/// # CORS
/// allowed_origins = "http://localhost:5173,http://localhost:8080"
///
/// # Assets (optional override for the logo search path)
/// logo_dir = "/app/assets/logos"
///
/// # Background removal delegate (optional)
/// removal_service_url = "http://localhost:7000/remove"
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Number of transforms that may run simultaneously
    #[arg(short = 'j', long, default_value_t = 2)]
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Working directory for temporary upload/output files
    #[arg(short = 'w', long, default_value = "/tmp/video-rebrander")]
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Maximum accepted video upload, in megabytes
    #[arg(long, default_value_t = 100)]
    #[serde(default = "default_max_video_size_mb")]
    pub max_video_size_mb: u64,

    /// Maximum accepted image upload, in megabytes
    #[arg(long, default_value_t = 10)]
    #[serde(default = "default_max_image_size_mb")]
    pub max_image_size_mb: u64,

    /// Comma-separated CORS origins allowed to call the API
    #[arg(long, default_value = "http://localhost:5173,http://localhost:8080")]
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Logo asset directory override (searched before the built-in candidates)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_dir: Option<String>,

    /// Background-removal service endpoint (unset disables the endpoint)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_service_url: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            workspace: default_workspace(),
            max_video_size_mb: default_max_video_size_mb(),
            max_image_size_mb: default_max_image_size_mb(),
            allowed_origins: default_allowed_origins(),
            logo_dir: None,
            removal_service_url: None,
            config: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If the CLI value is its default, the file value wins.
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.max_concurrent_jobs == default_max_concurrent_jobs() {
            self.max_concurrent_jobs = file_config.max_concurrent_jobs;
        }
        if self.workspace == default_workspace() {
            self.workspace = file_config.workspace;
        }
        if self.max_video_size_mb == default_max_video_size_mb() {
            self.max_video_size_mb = file_config.max_video_size_mb;
        }
        if self.max_image_size_mb == default_max_image_size_mb() {
            self.max_image_size_mb = file_config.max_image_size_mb;
        }
        if self.allowed_origins == default_allowed_origins() {
            self.allowed_origins = file_config.allowed_origins;
        }

        // For Option fields, CLI takes precedence if Some
        if self.logo_dir.is_none() {
            self.logo_dir = file_config.logo_dir;
        }
        if self.removal_service_url.is_none() {
            self.removal_service_url = file_config.removal_service_url;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!("max_concurrent_jobs must be at least 1"));
        }
        if self.max_video_size_mb == 0 {
            return Err(anyhow::anyhow!("max_video_size_mb must be at least 1"));
        }
        if self.max_image_size_mb == 0 {
            return Err(anyhow::anyhow!("max_image_size_mb must be at least 1"));
        }

        if let Some(url) = &self.removal_service_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "Removal service URL must start with http:// or https://"
                ));
            }
        }

        Ok(())
    }

    pub fn max_video_bytes(&self) -> u64 {
        self.max_video_size_mb * 1024 * 1024
    }

    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_size_mb * 1024 * 1024
    }

    /// Parsed CORS origin list, whitespace trimmed, empty entries dropped.
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// Default value functions
fn default_port() -> u16 {
    8000
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_workspace() -> String {
    "/tmp/video-rebrander".to_string()
}

fn default_max_video_size_mb() -> u64 {
    100
}

fn default_max_image_size_mb() -> u64 {
    10
}

fn default_allowed_origins() -> String {
    "http://localhost:5173,http://localhost:8080".to_string()
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::info;

use crate::config::Config;
use crate::logo::LogoLibrary;
use crate::removal::RemovalClient;

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";

async fn init_workspace(workspace: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(workspace.join(UPLOADS_DIR)).await?;
    tokio::fs::create_dir_all(workspace.join(OUTPUTS_DIR)).await?;
    Ok(())
}

/// Shared service state. The semaphore and the resolved logo directory are
/// the only state concurrent jobs share; temp filenames are per-job unique.
#[derive(Clone)]
pub struct AppState {
    pub permits: Arc<Semaphore>,
    pub logos: Arc<LogoLibrary>,
    pub removal: Option<Arc<RemovalClient>>,

    pub uploads_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub max_video_bytes: u64,
    pub max_image_bytes: u64,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let workspace = PathBuf::from(&config.workspace);
        init_workspace(&workspace).await?;

        let logos = LogoLibrary::locate(config.logo_dir.as_deref().map(Path::new));

        let removal = match &config.removal_service_url {
            Some(url) => Some(Arc::new(RemovalClient::new(url.clone())?)),
            None => {
                info!("No removal service configured, background removal disabled");
                None
            }
        };

        info!(
            permits = config.max_concurrent_jobs,
            workspace = %workspace.display(),
            "Application state initialized"
        );

        Ok(Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            logos: Arc::new(logos),
            removal,
            uploads_dir: workspace.join(UPLOADS_DIR),
            outputs_dir: workspace.join(OUTPUTS_DIR),
            max_video_bytes: config.max_video_bytes(),
            max_image_bytes: config.max_image_bytes(),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Wipe and recreate both temp subtrees. Operator maintenance only;
    /// in-flight jobs may lose their files, which their cleanup tolerates.
    pub async fn reset_workspace(&self) -> std::io::Result<()> {
        for dir in [&self.uploads_dir, &self.outputs_dir] {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(error),
            }
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

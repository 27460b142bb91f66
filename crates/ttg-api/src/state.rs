//! Application state.

use std::sync::Arc;

use ttg_hf_client::{HfClient, HfClientConfig};
use ttg_storage::VideoStorage;
use ttg_worker::{
    DownloadManager, LocalModelRegistry, LocalPipeline, UnavailablePipeline, VideoGenerator,
    WorkerConfig,
};

use crate::config::ApiConfig;
use crate::services::HardwareProbe;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<VideoStorage>,
    pub hf: Arc<HfClient>,
    pub registry: Arc<LocalModelRegistry>,
    pub generator: VideoGenerator,
    pub downloads: DownloadManager,
    pub hardware: HardwareProbe,
}

impl AppState {
    /// Create state from the environment, without a local inference backend.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::build(
            config,
            HfClientConfig::from_env(),
            WorkerConfig::from_env(),
            Arc::new(UnavailablePipeline),
        )
        .await
    }

    /// Create state from explicit parts.
    pub async fn build(
        config: ApiConfig,
        hf_config: HfClientConfig,
        worker_config: WorkerConfig,
        pipeline: Arc<dyn LocalPipeline>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let storage = Arc::new(VideoStorage::open(&config.storage_base_path).await?);
        let hf = Arc::new(HfClient::new(hf_config)?);

        let registry = Arc::new(LocalModelRegistry::new(&worker_config.models_dir));
        registry.ensure_base_dir().await?;

        let generator = VideoGenerator::new(
            Arc::clone(&storage),
            Arc::clone(&hf),
            Arc::clone(&registry),
            pipeline,
            worker_config,
        );
        let downloads = DownloadManager::new(Arc::clone(&registry), Arc::clone(&hf));

        Ok(Self {
            config,
            storage,
            hf,
            registry,
            generator,
            downloads,
            hardware: HardwareProbe::new(),
        })
    }
}

//! Background model snapshot downloads.

use std::collections::HashMap;
use std::path::{Component, Path};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};
use ttg_hf_client::{HfClient, RepoFile};
use ttg_models::{validate_repo_id, DownloadId, DownloadProgress, DownloadStatus};

use crate::error::{WorkerError, WorkerResult};
use crate::models::{LocalModelRegistry, MODEL_INDEX_FILE};

type DownloadMap = HashMap<DownloadId, DownloadProgress>;

/// Starts snapshot downloads and tracks their progress in memory.
#[derive(Clone)]
pub struct DownloadManager {
    registry: Arc<LocalModelRegistry>,
    hf: Arc<HfClient>,
    downloads: Arc<Mutex<DownloadMap>>,
}

impl DownloadManager {
    pub fn new(registry: Arc<LocalModelRegistry>, hf: Arc<HfClient>) -> Self {
        Self {
            registry,
            hf,
            downloads: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin downloading `repo_id`, or return the download already running
    /// for it.
    pub async fn start(&self, repo_id: &str) -> WorkerResult<DownloadProgress> {
        validate_repo_id(repo_id)?;
        let downloaded = self.registry.is_downloaded(repo_id).await?;

        // Lookup and insert happen under one lock so concurrent starts for
        // the same repo share a single task.
        let record = {
            let mut downloads = self.lock();
            if let Some(running) = downloads
                .values()
                .find(|p| p.repo_id == repo_id && !p.status.is_terminal())
            {
                info!(repo_id, download_id = %running.download_id, "Download already in progress");
                return Ok(running.clone());
            }

            let mut record = DownloadProgress::new(repo_id);
            if downloaded {
                record.complete();
            }
            downloads.insert(record.download_id.clone(), record.clone());
            record
        };

        if downloaded {
            return Ok(record);
        }

        info!(repo_id, download_id = %record.download_id, "Starting model download");
        let manager = self.clone();
        let download_id = record.download_id.clone();
        let repo = repo_id.to_string();
        tokio::spawn(async move { manager.run(download_id, repo).await });

        Ok(record)
    }

    pub fn progress(&self, download_id: &DownloadId) -> Option<DownloadProgress> {
        self.lock().get(download_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, DownloadMap> {
        self.downloads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, download_id: &DownloadId, f: impl FnOnce(&mut DownloadProgress)) {
        update_in(&self.downloads, download_id, f);
    }

    async fn run(self, download_id: DownloadId, repo_id: String) {
        match self.fetch_snapshot(&download_id, &repo_id).await {
            Ok(()) => {
                self.update(&download_id, DownloadProgress::complete);
                crate::metrics::record_model_download("completed");
                info!(repo_id, download_id = %download_id, "Model download completed");
            }
            Err(e) => {
                let message = e.to_string();
                warn!(repo_id, download_id = %download_id, "Model download failed: {}", message);
                self.update(&download_id, |p| p.fail(message));
                crate::metrics::record_model_download("failed");
            }
        }
    }

    async fn fetch_snapshot(&self, download_id: &DownloadId, repo_id: &str) -> WorkerResult<()> {
        let files = order_for_download(self.hf.list_repo_files(repo_id).await?)?;
        let total_bytes: u64 = files.iter().filter_map(|f| f.size).sum();
        let files_total = files.len() as u32;

        self.update(download_id, |p| {
            p.status = DownloadStatus::Downloading;
            p.files_total = files_total;
            p.total_bytes = total_bytes;
        });

        let model_dir = self.registry.model_dir(repo_id)?;
        for file in &files {
            let downloads = Arc::clone(&self.downloads);
            let id = download_id.clone();
            self.hf
                .download_file(repo_id, &file.path, &model_dir.join(&file.path), move |n| {
                    update_in(&downloads, &id, |p| p.add_bytes(n));
                })
                .await?;
            self.update(download_id, DownloadProgress::finish_file);
        }
        Ok(())
    }
}

fn update_in(
    downloads: &Mutex<DownloadMap>,
    download_id: &DownloadId,
    f: impl FnOnce(&mut DownloadProgress),
) {
    let mut map = downloads.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(progress) = map.get_mut(download_id) {
        f(progress);
    }
}

/// Check every path and move `model_index.json` to the end, so a snapshot
/// only counts as downloaded once all other files are on disk.
fn order_for_download(files: Vec<RepoFile>) -> WorkerResult<Vec<RepoFile>> {
    if let Some(bad) = files.iter().find(|f| !is_safe_relative(&f.path)) {
        return Err(WorkerError::download_failed(format!(
            "Refusing to write outside the model directory: {}",
            bad.path
        )));
    }

    let (mut ordered, index): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|f| f.path != MODEL_INDEX_FILE);
    if index.is_empty() {
        return Err(WorkerError::IncompleteSnapshot(format!(
            "repository has no {}",
            MODEL_INDEX_FILE
        )));
    }
    ordered.extend(index);
    Ok(ordered)
}

fn is_safe_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ttg_hf_client::HfClientConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const REPO: &str = "acme/tiny-t2v";

    fn setup(server_uri: &str, models_dir: &Path) -> (DownloadManager, Arc<LocalModelRegistry>) {
        let registry = Arc::new(LocalModelRegistry::new(models_dir));
        let hf = HfClient::new(HfClientConfig {
            hub_url: server_uri.to_string(),
            ..HfClientConfig::default()
        })
        .unwrap();
        (DownloadManager::new(Arc::clone(&registry), Arc::new(hf)), registry)
    }

    async fn mount_listing(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("/api/models/{}", REPO)))
            .and(query_param("blobs", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "siblings": [
                    {"rfilename": "model_index.json", "size": 2},
                    {"rfilename": "unet/weights.bin", "size": 4}
                ]
            })))
            .mount(server)
            .await;
    }

    async fn mount_file(server: &MockServer, file: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/resolve/main/{}", REPO, file)))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn wait_terminal(manager: &DownloadManager, id: &DownloadId) -> DownloadProgress {
        for _ in 0..250 {
            let p = manager.progress(id).unwrap();
            if p.status.is_terminal() {
                return p;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("download did not finish");
    }

    #[tokio::test]
    async fn test_download_completes_and_registers() {
        let server = MockServer::start().await;
        mount_listing(&server).await;
        mount_file(&server, "unet/weights.bin", ResponseTemplate::new(200).set_body_bytes(b"abcd".to_vec())).await;
        mount_file(&server, "model_index.json", ResponseTemplate::new(200).set_body_bytes(b"{}".to_vec())).await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, registry) = setup(&server.uri(), dir.path());

        let started = manager.start(REPO).await.unwrap();
        assert_eq!(started.status, DownloadStatus::Pending);

        let done = wait_terminal(&manager, &started.download_id).await;
        assert_eq!(done.status, DownloadStatus::Completed);
        assert_eq!(done.progress, 100);
        assert_eq!(done.files_completed, 2);
        assert_eq!(done.downloaded_bytes, 6);
        assert_eq!(done.total_bytes, 6);

        let info = registry.model_info(REPO).await.unwrap();
        assert!(info.downloaded);
        assert_eq!(info.size_bytes, 6);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_model_unregistered() {
        let server = MockServer::start().await;
        mount_listing(&server).await;
        mount_file(&server, "unet/weights.bin", ResponseTemplate::new(200).set_body_bytes(b"abcd".to_vec())).await;
        mount_file(&server, "model_index.json", ResponseTemplate::new(500)).await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, registry) = setup(&server.uri(), dir.path());

        let started = manager.start(REPO).await.unwrap();
        let done = wait_terminal(&manager, &started.download_id).await;
        assert_eq!(done.status, DownloadStatus::Failed);
        assert!(done.error.is_some());

        // Weights landed, but without the index the snapshot is not usable.
        let weights = registry.model_dir(REPO).unwrap().join("unet/weights.bin");
        assert!(weights.exists());
        assert!(!registry.is_downloaded(REPO).await.unwrap());
    }

    #[tokio::test]
    async fn test_start_reuses_running_download() {
        let server = MockServer::start().await;
        mount_listing(&server).await;
        mount_file(
            &server,
            "unet/weights.bin",
            ResponseTemplate::new(200)
                .set_body_bytes(b"abcd".to_vec())
                .set_delay(Duration::from_millis(500)),
        )
        .await;
        mount_file(&server, "model_index.json", ResponseTemplate::new(200).set_body_bytes(b"{}".to_vec())).await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = setup(&server.uri(), dir.path());

        let first = manager.start(REPO).await.unwrap();
        let second = manager.start(REPO).await.unwrap();
        assert_eq!(first.download_id, second.download_id);

        wait_terminal(&manager, &first.download_id).await;
    }

    #[tokio::test]
    async fn test_concurrent_starts_share_one_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/models/{}", REPO)))
            .and(query_param("blobs", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "siblings": [
                    {"rfilename": "model_index.json", "size": 2},
                    {"rfilename": "unet/weights.bin", "size": 4}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_file(
            &server,
            "unet/weights.bin",
            ResponseTemplate::new(200)
                .set_body_bytes(b"abcd".to_vec())
                .set_delay(Duration::from_millis(300)),
        )
        .await;
        mount_file(&server, "model_index.json", ResponseTemplate::new(200).set_body_bytes(b"{}".to_vec())).await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, registry) = setup(&server.uri(), dir.path());

        let (first, second) = tokio::join!(manager.start(REPO), manager.start(REPO));
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.download_id, second.download_id);

        let done = wait_terminal(&manager, &first.download_id).await;
        assert_eq!(done.status, DownloadStatus::Completed);
        assert!(registry.is_downloaded(REPO).await.unwrap());
        // Dropping the server verifies the listing was fetched exactly once.
    }

    #[tokio::test]
    async fn test_already_downloaded_completes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, registry) = setup("http://127.0.0.1:9", dir.path());

        let model_dir = registry.model_dir(REPO).unwrap();
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join(MODEL_INDEX_FILE), b"{}").unwrap();

        let record = manager.start(REPO).await.unwrap();
        assert_eq!(record.status, DownloadStatus::Completed);
        assert_eq!(manager.progress(&record.download_id).unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_rejects_invalid_repo_id() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = setup("http://127.0.0.1:9", dir.path());
        assert!(matches!(
            manager.start("../escape").await,
            Err(WorkerError::InvalidRepoId(_))
        ));
    }

    #[test]
    fn test_order_puts_index_last_and_rejects_traversal() {
        let file = |p: &str| RepoFile {
            path: p.to_string(),
            size: None,
        };
        let ordered =
            order_for_download(vec![file("model_index.json"), file("a.bin"), file("b/c.bin")]).unwrap();
        assert_eq!(ordered.last().unwrap().path, "model_index.json");
        assert_eq!(ordered.len(), 3);

        assert!(order_for_download(vec![file("../x"), file("model_index.json")]).is_err());
        assert!(order_for_download(vec![file("/etc/passwd"), file("model_index.json")]).is_err());
        assert!(matches!(
            order_for_download(vec![file("a.bin")]),
            Err(WorkerError::IncompleteSnapshot(_))
        ));
    }
}

//! Hugging Face HTTP client.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use ttg_models::{TrendingModel, VideoParams};

use crate::error::{HfError, HfResult};
use crate::types::{HubModel, InferencePayload, RepoFile, RepoInfo, TokenValidation};

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);
const TRENDING_TIMEOUT: Duration = Duration::from_secs(15);
const LIST_FILES_TIMEOUT: Duration = Duration::from_secs(30);
const TRENDING_LIMIT: u32 = 30;
const ERROR_BODY_CHARS: usize = 200;
const VIDEO_ACCEPT: &str = "video/mp4, application/octet-stream, application/json";

/// Configuration for the Hugging Face client.
#[derive(Debug, Clone)]
pub struct HfClientConfig {
    /// Hub base URL (whoami, model search, file downloads)
    pub hub_url: String,
    /// Inference router base URL
    pub router_url: String,
    /// Timeout for a generation request
    pub timeout: Duration,
    /// Repo used when a request names none
    pub default_model_repo: String,
}

impl Default for HfClientConfig {
    fn default() -> Self {
        Self {
            hub_url: "https://huggingface.co".to_string(),
            router_url: "https://router.huggingface.co/hf-inference".to_string(),
            timeout: Duration::from_secs(180),
            default_model_repo: "damo-vilab/text-to-video-ms-1.7b".to_string(),
        }
    }
}

impl HfClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hub_url: std::env::var("TTG_HF_HUB_URL").unwrap_or(defaults.hub_url),
            router_url: std::env::var("TTG_HF_ROUTER_URL").unwrap_or(defaults.router_url),
            timeout: std::env::var("TTG_HF_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            default_model_repo: std::env::var("TTG_HF_MODEL_REPO")
                .unwrap_or(defaults.default_model_repo),
        }
    }
}

/// Client for the Hugging Face Hub and inference router.
pub struct HfClient {
    http: Client,
    config: HfClientConfig,
}

impl HfClient {
    /// Create a new client. Timeouts are applied per request, since
    /// snapshot downloads can legitimately run for a long time.
    pub fn new(config: HfClientConfig) -> HfResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("ttg-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HfError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> HfResult<Self> {
        Self::new(HfClientConfig::from_env())
    }

    pub fn config(&self) -> &HfClientConfig {
        &self.config
    }

    fn hub(&self) -> &str {
        self.config.hub_url.trim_end_matches('/')
    }

    /// Generate a video through the hosted inference router.
    ///
    /// The router root is tried first with the model named in a header;
    /// on 404 the per-model endpoint is used instead.
    pub async fn generate_video(&self, params: &VideoParams, token: &str) -> HfResult<Vec<u8>> {
        if !token.starts_with("hf_") {
            return Err(HfError::InvalidToken);
        }

        let repo = params
            .hf_model_repo
            .as_deref()
            .unwrap_or(&self.config.default_model_repo);
        let payload = InferencePayload::from_params(params);
        let root = self.config.router_url.trim_end_matches('/');

        debug!(repo, "Posting generation request to inference router");
        let response = self.post_inference(root, token, &payload, Some(repo)).await?;

        let response = if response.status() == StatusCode::NOT_FOUND {
            let model_url = format!("{}/models/{}", root, repo);
            debug!(url = %model_url, "Router root returned 404, trying model endpoint");
            let fallback = self.post_inference(&model_url, token, &payload, None).await?;
            if fallback.status() == StatusCode::NOT_FOUND {
                return Err(HfError::api(
                    404,
                    "Not Found (both router root and model endpoints)",
                ));
            }
            fallback
        } else {
            response
        };

        let bytes = read_video_response(response).await?;
        info!(repo, bytes = bytes.len(), "Received generated video");
        Ok(bytes)
    }

    async fn post_inference(
        &self,
        url: &str,
        token: &str,
        payload: &InferencePayload,
        requested_model: Option<&str>,
    ) -> HfResult<Response> {
        let mut request = self
            .http
            .post(url)
            .timeout(self.config.timeout)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, VIDEO_ACCEPT)
            .json(payload);
        if let Some(model) = requested_model {
            request = request.header("X-Requested-Model", model);
        }
        Ok(request.send().await?)
    }

    /// Check a token against `whoami-v2`. Never fails; problems are reported
    /// in the returned message.
    pub async fn validate_token(&self, token: &str) -> TokenValidation {
        let url = format!("{}/api/whoami-v2", self.hub());

        let response = self
            .http
            .get(&url)
            .timeout(VALIDATE_TIMEOUT)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await;

        match response {
            Ok(r) => match r.status() {
                StatusCode::OK => TokenValidation::valid(),
                StatusCode::UNAUTHORIZED => TokenValidation::invalid("Invalid token: Unauthorized"),
                StatusCode::FORBIDDEN => TokenValidation::invalid("Invalid token: Forbidden"),
                other => TokenValidation::invalid(format!("Invalid token: {}", other.as_u16())),
            },
            Err(e) => {
                warn!("Token validation request failed: {}", e);
                TokenValidation::invalid(format!("Validation failed: {}", e))
            }
        }
    }

    /// Most downloaded text-to-video models on the Hub.
    pub async fn trending_models(&self) -> HfResult<Vec<TrendingModel>> {
        let url = format!("{}/api/models", self.hub());
        let limit = TRENDING_LIMIT.to_string();

        let response = self
            .http
            .get(&url)
            .timeout(TRENDING_TIMEOUT)
            .query(&[
                ("pipeline_tag", "text-to-video"),
                ("sort", "downloads"),
                ("direction", "-1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let models: Vec<HubModel> = serde_json::from_slice(&response.bytes().await?)?;
        Ok(models.into_iter().filter_map(HubModel::into_trending).collect())
    }

    /// Files of the `main` snapshot of a model repository.
    pub async fn list_repo_files(&self, repo_id: &str) -> HfResult<Vec<RepoFile>> {
        let url = format!("{}/api/models/{}", self.hub(), repo_id);

        let response = self
            .http
            .get(&url)
            .timeout(LIST_FILES_TIMEOUT)
            .query(&[("blobs", "true")])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let info: RepoInfo = serde_json::from_slice(&response.bytes().await?)?;
        Ok(info.siblings)
    }

    /// Stream one snapshot file to `dest`.
    ///
    /// Data goes to a `.part` file that is renamed on success.
    /// `on_chunk` receives the size of every chunk written.
    pub async fn download_file<F>(
        &self,
        repo_id: &str,
        file: &str,
        dest: &Path,
        mut on_chunk: F,
    ) -> HfResult<u64>
    where
        F: FnMut(u64) + Send,
    {
        let url = format!("{}/{}/resolve/main/{}", self.hub(), repo_id, file);
        let response = ensure_success(self.http.get(&url).send().await?).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = dest.with_extension(match dest.extension() {
            Some(ext) => format!("{}.part", ext.to_string_lossy()),
            None => "part".to_string(),
        });

        let mut out = tokio::fs::File::create(&partial).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    drop(out);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(e.into());
                }
            };
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_chunk(chunk.len() as u64);
        }
        out.flush().await?;
        drop(out);
        tokio::fs::rename(&partial, dest).await?;

        debug!(repo_id, file, bytes = written, "Downloaded snapshot file");
        Ok(written)
    }
}

async fn read_video_response(response: Response) -> HfResult<Vec<u8>> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if status == StatusCode::OK
        && (content_type.starts_with("video/") || content_type.starts_with("application/octet-stream"))
    {
        return Ok(response.bytes().await?.to_vec());
    }

    Err(error_from_body(status, &response.text().await.unwrap_or_default()))
}

async fn ensure_success(response: Response) -> HfResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status, &body))
}

/// Prefer the `error` field of a JSON body; otherwise quote the start of the body.
fn error_from_body(status: StatusCode, body: &str) -> HfError {
    let json_error = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("error")? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });

    let message = json_error.unwrap_or_else(|| body.chars().take(ERROR_BODY_CHARS).collect());
    HfError::api(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(repo: Option<&str>) -> VideoParams {
        VideoParams {
            prompt: "a paper boat".to_string(),
            num_frames: 16,
            fps: 8,
            width: 512,
            height: 512,
            num_inference_steps: 25,
            guidance_scale: 7.5,
            negative_prompt: None,
            seed: None,
            local_model_key: None,
            hf_model_repo: repo.map(str::to_string),
            use_hf_api: true,
        }
    }

    fn client_for(server: &MockServer) -> HfClient {
        HfClient::new(HfClientConfig {
            hub_url: server.uri(),
            router_url: format!("{}/hf-inference", server.uri()),
            timeout: Duration::from_secs(5),
            default_model_repo: "owner/default-model".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_malformed_token_without_request() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client.generate_video(&params(None), "abc").await.unwrap_err();
        assert!(matches!(err, HfError::InvalidToken));
        assert_eq!(err.to_string(), "Invalid Hugging Face API token");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_router_root_returns_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hf-inference"))
            .and(header("X-Requested-Model", "owner/default-model"))
            .and(header("Authorization", "Bearer hf_test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(b"MP4DATA".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .generate_video(&params(None), "hf_test")
            .await
            .unwrap();
        assert_eq!(bytes, b"MP4DATA");
    }

    #[tokio::test]
    async fn test_falls_back_to_model_endpoint_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hf-inference"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hf-inference/models/acme/t2v"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .generate_video(&params(Some("acme/t2v")), "hf_x")
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_both_endpoints_404() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_video(&params(None), "hf_x")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "HF API error: 404: Not Found (both router root and model endpoints)"
        );
    }

    #[tokio::test]
    async fn test_json_error_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hf-inference"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_json(serde_json::json!({"error": "Model is currently loading"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_video(&params(None), "hf_x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HF API error: 503: Model is currently loading");
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_plain_error_body_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hf-inference"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(500)))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_video(&params(None), "hf_x")
            .await
            .unwrap_err();
        match err {
            HfError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_validate_token_status_mapping() {
        let server = MockServer::start().await;
        for (token, status) in [("hf_ok", 200), ("hf_unauth", 401), ("hf_forbid", 403), ("hf_teapot", 418)] {
            Mock::given(method("GET"))
                .and(path("/api/whoami-v2"))
                .and(header("Authorization", format!("Bearer {}", token).as_str()))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        let client = client_for(&server);

        assert_eq!(client.validate_token("hf_ok").await, TokenValidation::valid());
        assert_eq!(
            client.validate_token("hf_unauth").await.message,
            "Invalid token: Unauthorized"
        );
        assert_eq!(
            client.validate_token("hf_forbid").await.message,
            "Invalid token: Forbidden"
        );
        let other = client.validate_token("hf_teapot").await;
        assert!(!other.valid);
        assert_eq!(other.message, "Invalid token: 418");
    }

    #[tokio::test]
    async fn test_validate_token_network_failure() {
        let client = HfClient::new(HfClientConfig {
            hub_url: "http://127.0.0.1:1".to_string(),
            ..HfClientConfig::default()
        })
        .unwrap();

        let result = client.validate_token("hf_x").await;
        assert!(!result.valid);
        assert!(result.message.starts_with("Validation failed: "));
    }

    #[tokio::test]
    async fn test_trending_models_query_and_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .and(query_param("pipeline_tag", "text-to-video"))
            .and(query_param("sort", "downloads"))
            .and(query_param("direction", "-1"))
            .and(query_param("limit", "30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "a/one", "likes": 5, "downloads": 100, "tags": ["text-to-video"], "lastModified": "2024-02-01T00:00:00.000Z"},
                {"modelId": "b/two", "downloadsAllTime": 7},
                {"likes": 1}
            ])))
            .mount(&server)
            .await;

        let models = client_for(&server).trending_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "a/one");
        assert_eq!(models[0].updated_at.as_deref(), Some("2024-02-01T00:00:00.000Z"));
        assert_eq!(models[1].id, "b/two");
        assert_eq!(models[1].downloads, Some(7));
    }

    #[tokio::test]
    async fn test_list_files_and_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models/acme/t2v"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "acme/t2v",
                "siblings": [
                    {"rfilename": "model_index.json", "size": 12},
                    {"rfilename": "unet/config.json"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/acme/t2v/resolve/main/unet/config.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{\"a\":1}".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let files = client.list_repo_files("acme/t2v").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].size, Some(12));
        assert_eq!(files[1].path, "unet/config.json");

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("unet/config.json");
        let mut seen = 0u64;
        let written = client
            .download_file("acme/t2v", "unet/config.json", &dest, |n| seen += n)
            .await
            .unwrap();
        assert_eq!(written, 7);
        assert_eq!(seen, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"{\"a\":1}");
        assert!(!dir.path().join("unet/config.json.part").exists());
    }

    #[tokio::test]
    async fn test_download_missing_file_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Entry not found"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client_for(&server)
            .download_file("acme/t2v", "nope.bin", &dir.path().join("nope.bin"), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}

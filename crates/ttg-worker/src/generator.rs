//! Generation job orchestration.
//!
//! Each accepted request becomes one background task. The task walks the
//! stages below and reports them through the [`JobRegistry`]:
//!
//! 1. Optional local model run
//! 2. Hosted inference (when `use_hf_api`), or placeholder frames
//! 3. Frame PNGs, thumbnail and `output.mp4`
//! 4. Frame count persisted, job completed

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, Instrument};
use ttg_hf_client::HfClient;
use ttg_media::{
    create_placeholder_frames, create_thumbnail, extract_frames, frames_to_mp4, save_frames,
    RgbImage,
};
use ttg_models::{
    resolve_local_model, GenerateRequest, GenerateResponse, JobId, JobStatus, JobStatusRecord,
    VideoId, VideoParams,
};
use ttg_storage::VideoStorage;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::local::{LocalGenerationRequest, LocalPipeline};
use crate::logging::JobLogger;
use crate::models::LocalModelRegistry;
use crate::status::JobRegistry;

/// Starts generation jobs and answers status polls.
#[derive(Clone)]
pub struct VideoGenerator {
    storage: Arc<VideoStorage>,
    hf: Arc<HfClient>,
    registry: Arc<LocalModelRegistry>,
    pipeline: Arc<dyn LocalPipeline>,
    jobs: Arc<JobRegistry>,
    config: WorkerConfig,
}

impl VideoGenerator {
    pub fn new(
        storage: Arc<VideoStorage>,
        hf: Arc<HfClient>,
        registry: Arc<LocalModelRegistry>,
        pipeline: Arc<dyn LocalPipeline>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            storage,
            hf,
            registry,
            pipeline,
            jobs: Arc::new(JobRegistry::new()),
            config,
        }
    }

    /// Accept a request and spawn its job.
    ///
    /// Rejected requests still get a job id with a `failed` record, so the
    /// client can poll it like any other job.
    pub async fn start(&self, request: GenerateRequest) -> GenerateResponse {
        let job_id = JobId::new();

        if !request.has_prompt() {
            self.jobs
                .insert(job_id.clone(), JobStatusRecord::rejected("Empty prompt"));
            return GenerateResponse {
                job_id,
                status: JobStatus::Failed,
                video_id: None,
            };
        }

        let entry = match self.storage.create_video_entry(request.normalized_params()).await {
            Ok(entry) => entry,
            Err(e) => {
                error!(job_id = %job_id, "Failed to create video entry: {}", e);
                self.jobs
                    .insert(job_id.clone(), JobStatusRecord::rejected("storage init failed"));
                return GenerateResponse {
                    job_id,
                    status: JobStatus::Failed,
                    video_id: None,
                };
            }
        };

        self.jobs
            .insert(job_id.clone(), JobStatusRecord::pending(entry.id.clone()));

        let generator = self.clone();
        let token = request.hf_token;
        tokio::spawn(generator.run_job(job_id.clone(), entry.id.clone(), entry.params, token));

        GenerateResponse {
            job_id,
            status: JobStatus::Pending,
            video_id: Some(entry.id),
        }
    }

    pub fn status(&self, job_id: &JobId) -> Option<JobStatusRecord> {
        self.jobs.get(job_id)
    }

    pub fn storage(&self) -> &Arc<VideoStorage> {
        &self.storage
    }

    async fn run_job(
        self,
        job_id: JobId,
        video_id: VideoId,
        params: VideoParams,
        token: Option<String>,
    ) {
        let mode = generation_mode(&params);
        let logger = JobLogger::new(&job_id, &video_id, mode);
        let span = logger.create_span();

        async move {
            let started = Instant::now();
            logger.log_start(params.prompt.chars().count());
            crate::metrics::record_job_started(mode);

            let result = self
                .generate(&job_id, &video_id, &params, token.as_deref(), &logger)
                .await;
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(frames) => {
                    self.jobs.update(&job_id, |r| r.complete(elapsed));
                    logger.log_completion(frames, elapsed);
                    crate::metrics::record_job_completed(mode, elapsed, frames);
                }
                Err(e) => {
                    let message = e.to_string();
                    logger.log_failure(&message, elapsed);
                    self.jobs.update(&job_id, |r| r.fail(message, elapsed));
                    crate::metrics::record_job_failed(mode, elapsed);
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn generate(
        &self,
        job_id: &JobId,
        video_id: &VideoId,
        params: &VideoParams,
        token: Option<&str>,
        logger: &JobLogger,
    ) -> WorkerResult<u32> {
        self.stage(job_id, logger, 10, "Preparing request");
        let dir = self.storage.video_dir(video_id)?;

        let mut frames = None;
        let mut local_error = None;
        if let Some(key) = params.local_model_key.as_deref() {
            self.stage(job_id, logger, 20, "Loading local model");
            match self.run_local(key, params).await {
                Ok(generated) => frames = Some(generated),
                Err(e) => {
                    logger.log_warning(&format!("Local generation failed: {}", e));
                    local_error = Some(e);
                }
            }
        }

        let frame_count = match frames {
            Some(frames) => {
                self.write_frames(job_id, logger, video_id, &dir, frames, params.fps)
                    .await?
            }
            None if params.use_hf_api => {
                let message = if local_error.is_some() {
                    "Local model unavailable, falling back to Hugging Face"
                } else {
                    "Contacting Hugging Face Inference API"
                };
                self.stage(job_id, logger, 30, message);
                self.generate_hosted(job_id, logger, video_id, &dir, params, token.unwrap_or_default())
                    .await?
            }
            None => {
                if let Some(e) = local_error {
                    return Err(e);
                }
                self.stage(job_id, logger, 30, "Using placeholder local generator");
                let (width, height, count) = (params.width, params.height, params.num_frames);
                let prompt = params.prompt.clone();
                let seed = params.seed;
                let frames = tokio::task::spawn_blocking(move || {
                    create_placeholder_frames(width, height, count, &prompt, seed)
                })
                .await?;
                self.write_frames(job_id, logger, video_id, &dir, frames, params.fps)
                    .await?
            }
        };

        if let Err(e) = self.storage.update_video_frames(video_id, frame_count).await {
            logger.log_warning(&format!("Failed to persist frame count: {}", e));
        }
        Ok(frame_count)
    }

    async fn run_local(&self, key: &str, params: &VideoParams) -> WorkerResult<Vec<RgbImage>> {
        let repo_id =
            resolve_local_model(key).ok_or_else(|| WorkerError::UnknownModelKey(key.to_string()))?;
        if !self.registry.is_downloaded(repo_id).await? {
            return Err(WorkerError::ModelNotDownloaded(repo_id.to_string()));
        }

        let model_dir = self.registry.model_dir(repo_id)?;
        let request = LocalGenerationRequest::from_params(key, params)?;
        let frames = self.pipeline.generate(&model_dir, &request).await?;
        if frames.is_empty() {
            return Err(WorkerError::NoFrames);
        }
        Ok(frames)
    }

    async fn generate_hosted(
        &self,
        job_id: &JobId,
        logger: &JobLogger,
        video_id: &VideoId,
        dir: &Path,
        params: &VideoParams,
        token: &str,
    ) -> WorkerResult<u32> {
        let bytes = self.hf.generate_video(params, token).await?;

        self.stage(job_id, logger, 60, "Downloading and saving video");
        if !self.video_exists(logger, video_id).await {
            return Ok(0);
        }
        self.storage
            .save_video_bytes(video_id, &bytes)
            .await
            .map_err(WorkerError::VideoSaveFailed)?;

        self.stage(job_id, logger, 75, "Extracting frames");
        let count = match extract_frames(dir, params.fps).await {
            Ok(count) => count,
            Err(e) => {
                logger.log_warning(&format!("Frame extraction failed: {}", e));
                0
            }
        };
        if count > 0 {
            if let Err(e) = create_thumbnail(dir).await {
                logger.log_warning(&format!("Thumbnail creation failed: {}", e));
            }
        }
        Ok(count)
    }

    async fn write_frames(
        &self,
        job_id: &JobId,
        logger: &JobLogger,
        video_id: &VideoId,
        dir: &Path,
        frames: Vec<RgbImage>,
        fps: u32,
    ) -> WorkerResult<u32> {
        self.stage(job_id, logger, 80, "Saving frames");
        if !self.video_exists(logger, video_id).await {
            return Ok(0);
        }
        let written = save_frames(dir, frames, self.config.max_frame_writers).await?;
        if written == 0 {
            return Err(WorkerError::NoFrames);
        }

        if let Err(e) = create_thumbnail(dir).await {
            logger.log_warning(&format!("Thumbnail creation failed: {}", e));
        }
        if let Err(e) = frames_to_mp4(dir, fps).await {
            logger.log_warning(&format!("Video stitching failed: {}", e));
        }
        Ok(written)
    }

    /// A video deleted mid-job gets no files written for it.
    async fn video_exists(&self, logger: &JobLogger, video_id: &VideoId) -> bool {
        let exists = self.storage.get_video(video_id).await.is_some();
        if !exists {
            logger.log_warning("Video was deleted during generation, discarding output");
        }
        exists
    }

    fn stage(&self, job_id: &JobId, logger: &JobLogger, progress: u8, message: &str) {
        self.jobs.update(job_id, |r| r.set_stage(progress, message));
        logger.log_stage(progress, message);
    }
}

fn generation_mode(params: &VideoParams) -> &'static str {
    if params.local_model_key.is_some() {
        "local"
    } else if params.use_hf_api {
        "cloud"
    } else {
        "placeholder"
    }
}

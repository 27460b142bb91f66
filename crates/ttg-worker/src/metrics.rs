//! Job metrics. Recorded through the global `metrics` recorder; no-ops
//! when the API has not installed one.

use metrics::{counter, histogram};

pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "ttg_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "ttg_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "ttg_jobs_failed_total";
    pub const GENERATION_DURATION_SECONDS: &str = "ttg_generation_duration_seconds";
    pub const FRAMES_WRITTEN_TOTAL: &str = "ttg_frames_written_total";
    pub const MODEL_DOWNLOADS_TOTAL: &str = "ttg_model_downloads_total";
}

pub fn record_job_started(mode: &'static str) {
    counter!(names::JOBS_STARTED_TOTAL, "mode" => mode).increment(1);
}

pub fn record_job_completed(mode: &'static str, duration_secs: f64, frames: u32) {
    counter!(names::JOBS_COMPLETED_TOTAL, "mode" => mode).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, "mode" => mode).record(duration_secs);
    counter!(names::FRAMES_WRITTEN_TOTAL).increment(u64::from(frames));
}

pub fn record_job_failed(mode: &'static str, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "mode" => mode).increment(1);
    histogram!(names::GENERATION_DURATION_SECONDS, "mode" => mode).record(duration_secs);
}

pub fn record_model_download(outcome: &'static str) {
    counter!(names::MODEL_DOWNLOADS_TOTAL, "outcome" => outcome).increment(1);
}

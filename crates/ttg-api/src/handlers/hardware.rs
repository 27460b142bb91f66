//! Hardware report handlers.

use axum::extract::State;
use axum::Json;
use ttg_models::{estimate_performance, HardwareInfo, PerformanceEstimate};

use crate::state::AppState;

pub async fn get_hardware(State(state): State<AppState>) -> Json<HardwareInfo> {
    Json(state.hardware.info().await)
}

pub async fn get_performance(State(state): State<AppState>) -> Json<PerformanceEstimate> {
    let info = state.hardware.info().await;
    Json(estimate_performance(&info))
}

//! Hardware report and generation performance estimate.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CpuInfo {
    /// Physical cores
    pub cores: usize,
    /// Logical threads
    pub threads: usize,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GpuMemory {
    /// Total memory in bytes
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GpuDevice {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub memory: GpuMemory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct GpuInfo {
    pub cuda_available: bool,
    pub gpu_count: usize,
    pub gpus: Vec<GpuDevice>,
    pub versions: BTreeMap<String, Option<String>>,
}

impl GpuInfo {
    /// Sum of reported device memory, in bytes.
    pub fn total_memory(&self) -> u64 {
        self.gpus.iter().filter_map(|g| g.memory.total).sum()
    }
}

/// Response of `GET /hardware`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HardwareInfo {
    pub cpu: CpuInfo,
    pub gpu: GpuInfo,
}

/// Response of `GET /performance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PerformanceEstimate {
    pub performance_level: String,
    pub estimated_time: String,
}

impl PerformanceEstimate {
    fn new(level: &str, time: &str) -> Self {
        Self {
            performance_level: level.to_string(),
            estimated_time: time.to_string(),
        }
    }
}

/// Rough generation-time estimate from available hardware.
pub fn estimate_performance(hw: &HardwareInfo) -> PerformanceEstimate {
    if hw.gpu.cuda_available && hw.gpu.gpu_count > 0 {
        let vram = hw.gpu.total_memory();
        return if vram >= 16 * GIB {
            PerformanceEstimate::new("high", "30-60 seconds")
        } else if vram >= 8 * GIB {
            PerformanceEstimate::new("medium", "1-2 minutes")
        } else {
            PerformanceEstimate::new("low", "2-5 minutes")
        };
    }

    match hw.cpu.cores {
        c if c >= 8 => PerformanceEstimate::new("low-medium", "5-10 minutes"),
        c if c >= 4 => PerformanceEstimate::new("low", "10-20 minutes"),
        _ => PerformanceEstimate::new("very-low", "20+ minutes"),
    }
}

//! Host hardware inspection.
//!
//! CPU details come from `sysinfo`; GPU details from `nvidia-smi` when it is
//! on the PATH. Both are read fresh on every call.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use sysinfo::System;
use tokio::process::Command;
use tracing::{debug, warn};
use ttg_models::{CpuInfo, GpuDevice, GpuInfo, GpuMemory, HardwareInfo};

const NVIDIA_SMI: &str = "nvidia-smi";
const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(3);
const MIB: u64 = 1024 * 1024;

/// Reports CPU and GPU capabilities of the host.
#[derive(Debug, Clone)]
pub struct HardwareProbe {
    timeout: Duration,
}

impl Default for HardwareProbe {
    fn default() -> Self {
        Self {
            timeout: NVIDIA_SMI_TIMEOUT,
        }
    }
}

impl HardwareProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn info(&self) -> HardwareInfo {
        let cpu = match tokio::task::spawn_blocking(cpu_info).await {
            Ok(cpu) => cpu,
            Err(e) => {
                warn!("CPU inspection task failed: {}", e);
                CpuInfo {
                    cores: 0,
                    threads: 0,
                    model: None,
                }
            }
        };
        HardwareInfo {
            cpu,
            gpu: self.gpu_info().await,
        }
    }

    async fn gpu_info(&self) -> GpuInfo {
        let Ok(binary) = which::which(NVIDIA_SMI) else {
            debug!("nvidia-smi not found, reporting no GPU");
            return GpuInfo::default();
        };

        let mut cmd = Command::new(binary);
        cmd.args([
            "--query-gpu=name,memory.total,driver_version",
            "--format=csv,noheader,nounits",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

        let stdout = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(out)) if out.status.success() => String::from_utf8_lossy(&out.stdout).to_string(),
            Ok(Ok(out)) => {
                warn!(status = %out.status, "nvidia-smi exited unsuccessfully");
                return GpuInfo::default();
            }
            Ok(Err(e)) => {
                warn!("Failed to run nvidia-smi: {}", e);
                return GpuInfo::default();
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "nvidia-smi timed out");
                return GpuInfo::default();
            }
        };

        gpu_info_from_devices(parse_nvidia_smi(&stdout))
    }
}

fn cpu_info() -> CpuInfo {
    let mut sys = System::new();
    sys.refresh_cpu_all();

    let threads = sys.cpus().len();
    let model = sys
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|b| !b.is_empty());

    CpuInfo {
        cores: System::physical_core_count().unwrap_or(threads),
        threads,
        model,
    }
}

/// Parse `name, memory.total (MiB), driver_version` lines.
fn parse_nvidia_smi(stdout: &str) -> Vec<GpuDevice> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(id, line)| {
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next().unwrap_or_default().to_string();
            let total = fields
                .next()
                .and_then(|m| m.parse::<u64>().ok())
                .map(|mib| mib * MIB);
            let driver = fields.next().filter(|d| !d.is_empty()).map(str::to_string);
            GpuDevice {
                id: id as u32,
                name,
                driver,
                memory: GpuMemory { total },
            }
        })
        .collect()
}

fn gpu_info_from_devices(gpus: Vec<GpuDevice>) -> GpuInfo {
    let mut versions = BTreeMap::new();
    versions.insert(
        "driver".to_string(),
        gpus.first().and_then(|g| g.driver.clone()),
    );
    GpuInfo {
        cuda_available: !gpus.is_empty(),
        gpu_count: gpus.len(),
        gpus,
        versions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nvidia_smi() {
        let out = "NVIDIA GeForce RTX 4090, 24564, 550.54.14\nNVIDIA A10G, 23028, 550.54.14\n\n";
        let gpus = parse_nvidia_smi(out);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].name, "NVIDIA GeForce RTX 4090");
        assert_eq!(gpus[0].memory.total, Some(24564 * MIB));
        assert_eq!(gpus[1].id, 1);
        assert_eq!(gpus[1].driver.as_deref(), Some("550.54.14"));

        let info = gpu_info_from_devices(gpus);
        assert!(info.cuda_available);
        assert_eq!(info.gpu_count, 2);
        assert_eq!(info.versions["driver"].as_deref(), Some("550.54.14"));
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        let gpus = parse_nvidia_smi("Tesla T4, [N/A]");
        assert_eq!(gpus[0].memory.total, None);
        assert!(gpus[0].driver.is_none());
    }

    #[test]
    fn test_no_devices_means_no_cuda() {
        let info = gpu_info_from_devices(Vec::new());
        assert!(!info.cuda_available);
        assert_eq!(info.gpu_count, 0);
    }

    #[tokio::test]
    async fn test_info_reports_cpu() {
        let info = HardwareProbe::new().info().await;
        assert!(info.cpu.threads >= 1);
        assert!(info.cpu.cores >= 1);
    }
}

//! Telemetry providers sampled by the present-hook rate gate.
//!
//! Providers are point-in-time samplers; nothing here spawns threads or
//! caches across calls beyond the counter baselines the deltas need.

mod cpu;
mod gpu;

pub use cpu::CpuStats;
pub use gpu::AmdGpuStats;

use crate::config::OverlayConfig;

/// One GPU sample. Every field is independently optional; a missing sensor
/// is not an error, its overlay line is simply omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuMetrics {
    pub core_clock_mhz: Option<u32>,
    pub mem_clock_mhz: Option<u32>,
    pub core_temp_c: Option<u32>,
    pub mem_temp_c: Option<u32>,
    pub busy_percent: Option<u32>,
    pub fan_rpm: Option<u32>,
}

/// Capability interface for GPU stat sources.
pub trait GpuTelemetry {
    fn sample(&self) -> GpuMetrics;
}

/// The GPU source is picked once at device creation and never changes.
pub enum GpuSource {
    Amd(AmdGpuStats),
    None,
}

impl GpuSource {
    /// Resolve the configured source. A missing or malformed index, or a
    /// card with no hwmon node, selects `None`.
    pub fn select(cfg: &OverlayConfig) -> Self {
        match cfg.gpu_index {
            Some(index) => match AmdGpuStats::new(index) {
                Some(stats) => GpuSource::Amd(stats),
                None => {
                    log::warn!("no amdgpu hwmon for card{index}, GPU telemetry disabled");
                    GpuSource::None
                }
            },
            None => GpuSource::None,
        }
    }

    pub fn sample(&self) -> Option<GpuMetrics> {
        match self {
            GpuSource::Amd(stats) => Some(stats.sample()),
            GpuSource::None => None,
        }
    }
}

//! amdgpu sensors via sysfs hwmon.
//!
//! Discovery walks `/sys/class/drm/card{i}/device/hwmon` to find the hwmon
//! node, then matches sensor indices by their `*_label` files: `sclk` and
//! `mclk` frequency channels, `edge` and `mem` temperature channels. All of
//! that happens once at device creation; sampling is plain file reads.

use std::path::{Path, PathBuf};

use super::{GpuMetrics, GpuTelemetry};

pub struct AmdGpuStats {
    hwmon: PathBuf,
    sclk: Option<u32>,
    mclk: Option<u32>,
    core_temp: Option<u32>,
    mem_temp: Option<u32>,
    fan: Option<u32>,
}

impl AmdGpuStats {
    /// Discover the hwmon node of `/sys/class/drm/card{index}`.
    pub fn new(index: u32) -> Option<Self> {
        Self::with_root(Path::new("/sys"), index)
    }

    /// Discovery against an arbitrary sysfs root, for tests.
    pub fn with_root(root: &Path, index: u32) -> Option<Self> {
        let hwmon_parent = root.join(format!("class/drm/card{index}/device/hwmon"));
        let name = std::fs::read_dir(&hwmon_parent)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .find(|n| n.starts_with("hwmon"))?;
        let hwmon = root.join(format!("class/hwmon/{name}"));
        log::info!("using {} for card{index}", hwmon.display());

        let mut stats = Self {
            hwmon,
            sclk: None,
            mclk: None,
            core_temp: None,
            mem_temp: None,
            fan: None,
        };
        stats.scan_labels();
        Some(stats)
    }

    /// Match channel indices by label content. Unlabeled or unknown
    /// channels are skipped; the matching field stays `None`.
    fn scan_labels(&mut self) {
        let Ok(entries) = std::fs::read_dir(&self.hwmon) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(idx) = channel_index(&name, "freq", "_label") {
                match read_line(&entry.path()).as_deref() {
                    Some("sclk") => self.sclk = Some(idx),
                    Some("mclk") => self.mclk = Some(idx),
                    _ => {}
                }
            } else if let Some(idx) = channel_index(&name, "temp", "_label") {
                match read_line(&entry.path()).as_deref() {
                    // Polaris only exposes 'edge'; vega and later add
                    // 'junction' and 'mem'.
                    Some("edge") => self.core_temp = Some(idx),
                    Some("mem") => self.mem_temp = Some(idx),
                    _ => {}
                }
            } else if let Some(idx) = channel_index(&name, "fan", "_input") {
                if self.fan.is_none() {
                    self.fan = Some(idx);
                }
            }
        }
    }

    fn read_input(&self, sensor: &str, idx: Option<u32>) -> Option<u64> {
        let idx = idx?;
        read_u64(&self.hwmon.join(format!("{sensor}{idx}_input")))
    }

    pub fn core_clock_mhz(&self) -> Option<u32> {
        self.read_input("freq", self.sclk).map(|hz| (hz / 1_000_000) as u32)
    }

    pub fn mem_clock_mhz(&self) -> Option<u32> {
        self.read_input("freq", self.mclk).map(|hz| (hz / 1_000_000) as u32)
    }

    pub fn core_temp_c(&self) -> Option<u32> {
        self.read_input("temp", self.core_temp).map(|mc| (mc / 1000) as u32)
    }

    pub fn mem_temp_c(&self) -> Option<u32> {
        self.read_input("temp", self.mem_temp).map(|mc| (mc / 1000) as u32)
    }

    pub fn fan_rpm(&self) -> Option<u32> {
        self.read_input("fan", self.fan).map(|v| v as u32)
    }

    pub fn busy_percent(&self) -> Option<u32> {
        read_u64(&self.hwmon.join("device/gpu_busy_percent")).map(|v| v.min(100) as u32)
    }
}

impl GpuTelemetry for AmdGpuStats {
    fn sample(&self) -> GpuMetrics {
        GpuMetrics {
            core_clock_mhz: self.core_clock_mhz(),
            mem_clock_mhz: self.mem_clock_mhz(),
            core_temp_c: self.core_temp_c(),
            mem_temp_c: self.mem_temp_c(),
            busy_percent: self.busy_percent(),
            fan_rpm: self.fan_rpm(),
        }
    }
}

/// `freq1_label` with ("freq", "_label") => 1.
fn channel_index(name: &str, prefix: &str, suffix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok()
}

fn read_line(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    Some(content.trim_end().to_owned())
}

fn read_u64(path: &Path) -> Option<u64> {
    read_line(path)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_sysfs(card: u32, hwmon: u32) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(format!("class/drm/card{card}/device/hwmon/hwmon{hwmon}")))
            .unwrap();
        let node = root.join(format!("class/hwmon/hwmon{hwmon}"));
        fs::create_dir_all(node.join("device")).unwrap();

        fs::write(node.join("freq1_label"), "sclk\n").unwrap();
        fs::write(node.join("freq1_input"), "1850000000\n").unwrap();
        fs::write(node.join("freq2_label"), "mclk\n").unwrap();
        fs::write(node.join("freq2_input"), "875000000\n").unwrap();
        fs::write(node.join("temp1_label"), "edge\n").unwrap();
        fs::write(node.join("temp1_input"), "64000\n").unwrap();
        fs::write(node.join("temp2_label"), "mem\n").unwrap();
        fs::write(node.join("temp2_input"), "70000\n").unwrap();
        fs::write(node.join("fan1_input"), "1200\n").unwrap();
        fs::write(node.join("device/gpu_busy_percent"), "37\n").unwrap();
        dir
    }

    #[test]
    fn discovery_and_full_sample() {
        let dir = fake_sysfs(0, 3);
        let stats = AmdGpuStats::with_root(dir.path(), 0).unwrap();
        let m = stats.sample();
        assert_eq!(m.core_clock_mhz, Some(1850));
        assert_eq!(m.mem_clock_mhz, Some(875));
        assert_eq!(m.core_temp_c, Some(64));
        assert_eq!(m.mem_temp_c, Some(70));
        assert_eq!(m.busy_percent, Some(37));
        assert_eq!(m.fan_rpm, Some(1200));
    }

    #[test]
    fn missing_card_is_none() {
        let dir = fake_sysfs(0, 3);
        assert!(AmdGpuStats::with_root(dir.path(), 5).is_none());
    }

    #[test]
    fn missing_sensors_sample_as_none() {
        let dir = fake_sysfs(1, 0);
        let node = dir.path().join("class/hwmon/hwmon0");
        fs::remove_file(node.join("temp2_label")).unwrap();
        fs::remove_file(node.join("temp2_input")).unwrap();
        fs::remove_file(node.join("device/gpu_busy_percent")).unwrap();

        let stats = AmdGpuStats::with_root(dir.path(), 1).unwrap();
        let m = stats.sample();
        assert_eq!(m.mem_temp_c, None);
        assert_eq!(m.busy_percent, None);
        assert_eq!(m.core_clock_mhz, Some(1850));
    }

    #[test]
    fn unreadable_input_is_none_not_error() {
        let dir = fake_sysfs(0, 0);
        let node = dir.path().join("class/hwmon/hwmon0");
        fs::write(node.join("freq1_input"), "not-a-number\n").unwrap();
        let stats = AmdGpuStats::with_root(dir.path(), 0).unwrap();
        assert_eq!(stats.core_clock_mhz(), None);
    }
}

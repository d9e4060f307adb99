//! Per-core CPU load from `/proc/stat` counter deltas.

use std::path::{Path, PathBuf};

/// Jiffy counters from one `cpuN` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CoreTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
    guest: u64,
    guest_nice: u64,
}

impl CoreTimes {
    /// Guest time is already accounted inside user/nice.
    fn normalized(mut self) -> Self {
        self.user = self.user.saturating_sub(self.guest);
        self.nice = self.nice.saturating_sub(self.guest_nice);
        self
    }

    fn idle_all(&self) -> u64 {
        self.idle + self.iowait
    }

    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.irq
            + self.softirq
            + self.idle_all()
            + self.steal
            + self.guest
            + self.guest_nice
    }
}

/// Instance-scoped CPU sampler. `update` reads the stat file and refreshes
/// the per-core busy percentages from the deltas against the previous read.
pub struct CpuStats {
    path: PathBuf,
    prev: Vec<CoreTimes>,
    percents: Vec<f32>,
}

impl CpuStats {
    pub fn new() -> Self {
        Self::with_path("/proc/stat")
    }

    /// Sampler over an arbitrary stat file. Tests point this at a fixture.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let mut stats = Self {
            path: path.into(),
            prev: Vec::new(),
            percents: Vec::new(),
        };
        // Baseline read so the first update produces meaningful deltas.
        stats.update();
        stats
    }

    /// Re-read the stat file. Returns false (keeping the previous
    /// percentages) if the file is unreadable or malformed.
    pub fn update(&mut self) -> bool {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("failed to read {}: {e}", self.path.display());
                return false;
            }
        };
        let cores = parse_stat(&content);
        if cores.is_empty() {
            log::warn!("no per-cpu lines in {}", self.path.display());
            return false;
        }

        if self.prev.len() != cores.len() {
            // First read, or a hotplug resize; restart the baselines.
            self.prev = cores;
            self.percents = vec![0.0; self.prev.len()];
            return true;
        }

        self.percents = cores
            .iter()
            .zip(&self.prev)
            .map(|(now, prev)| {
                // Counters can go backwards after rounding in the kernel;
                // guard every subtraction.
                let total = now.total().saturating_sub(prev.total());
                let idle = now.idle_all().saturating_sub(prev.idle_all());
                if total == 0 {
                    0.0
                } else {
                    let busy = total.saturating_sub(idle);
                    (busy as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
                }
            })
            .collect();
        self.prev = cores;
        true
    }

    /// Busy percent per core, in core-id order.
    pub fn core_percents(&self) -> &[f32] {
        &self.percents
    }

    pub fn num_cores(&self) -> usize {
        self.percents.len()
    }

    #[cfg(test)]
    fn stat_path(&self) -> &Path {
        &self.path
    }
}

impl Default for CpuStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-core lines only; the aggregate `cpu ` line is skipped.
fn parse_stat(content: &str) -> Vec<CoreTimes> {
    let mut cores = Vec::new();
    for line in content.lines() {
        let Some((id, times)) = parse_stat_line(line) else {
            continue;
        };
        if id.is_none() {
            continue;
        }
        cores.push(times.normalized());
    }
    cores
}

/// Parse a `cpu`/`cpuN` line. Returns `None` for non-cpu lines; the core id
/// is `None` for the aggregate line.
fn parse_stat_line(line: &str) -> Option<(Option<usize>, CoreTimes)> {
    let rest = line.strip_prefix("cpu")?;
    // The character after "cpu" decides the kind: whitespace is the
    // aggregate line, a digit starts a core id. The aggregate's first field
    // is a jiffy count, so parse success alone cannot tell them apart.
    let mut fields = rest.split_ascii_whitespace();
    let id = match rest.chars().next()? {
        c if c.is_ascii_whitespace() => None,
        c if c.is_ascii_digit() => Some(fields.next()?.parse::<usize>().ok()?),
        _ => return None,
    };

    let mut values = [0u64; 10];
    for (i, slot) in values.iter_mut().enumerate() {
        // Old kernels omit steal/guest; treat missing trailing fields as 0.
        match fields.next() {
            Some(f) => *slot = f.parse().ok()?,
            None if i >= 7 => break,
            None => return None,
        }
    }

    Some((
        id,
        CoreTimes {
            user: values[0],
            nice: values[1],
            system: values[2],
            idle: values[3],
            iowait: values[4],
            irq: values[5],
            softirq: values[6],
            steal: values[7],
            guest: values[8],
            guest_nice: values[9],
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_stat(file: &mut std::fs::File, cores: &[[u64; 10]]) {
        let agg: [u64; 10] = {
            let mut agg = [0u64; 10];
            for c in cores {
                for (a, v) in agg.iter_mut().zip(c) {
                    *a += v;
                }
            }
            agg
        };
        let line = |name: String, v: &[u64; 10]| {
            format!(
                "{name} {} {} {} {} {} {} {} {} {} {}\n",
                v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8], v[9]
            )
        };
        let mut out = line("cpu ".into(), &agg);
        for (i, c) in cores.iter().enumerate() {
            out.push_str(&line(format!("cpu{i}"), c));
        }
        out.push_str("intr 12345 0 0\nbtime 1700000000\n");
        file.set_len(0).unwrap();
        file.write_all(out.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn parses_aggregate_and_core_lines() {
        let (id, t) = parse_stat_line("cpu  10 2 3 100 4 0 1 0 0 0").unwrap();
        assert_eq!(id, None);
        assert_eq!(t.user, 10);
        let (id, t) = parse_stat_line("cpu3 5 0 2 50 1 0 0 0 0 0").unwrap();
        assert_eq!(id, Some(3));
        assert_eq!(t.idle, 50);
    }

    #[test]
    fn ignores_non_cpu_lines() {
        assert!(parse_stat_line("intr 1 2 3").is_none());
        assert!(parse_stat_line("btime 1700000000").is_none());
        assert!(parse_stat_line("").is_none());
    }

    #[test]
    fn aggregate_line_is_not_counted_as_a_core() {
        let content = "cpu  30 0 6 200 2 0 2 0 0 0\n\
                       cpu0 10 0 2 100 1 0 1 0 0 0\n\
                       cpu1 20 0 4 100 1 0 1 0 0 0\n\
                       intr 12345 0 0\n";
        let cores = parse_stat(content);
        assert_eq!(cores.len(), 2);
        assert_eq!(cores[0].user, 10);
        assert_eq!(cores[1].user, 20);
    }

    #[test]
    fn short_lines_from_old_kernels_parse() {
        // Only 7 fields, no steal/guest.
        let (_, t) = parse_stat_line("cpu0 1 2 3 4 5 6 7").unwrap();
        assert_eq!(t.softirq, 7);
        assert_eq!(t.steal, 0);
    }

    #[test]
    fn percent_from_counter_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat");
        let mut file = std::fs::File::create(&path).unwrap();

        write_stat(&mut file, &[[100, 0, 50, 850, 0, 0, 0, 0, 0, 0]]);
        let mut stats = CpuStats::with_path(&path);
        assert_eq!(stats.num_cores(), 1);
        assert_eq!(stats.core_percents()[0], 0.0);

        // +150 busy, +50 idle => 75%.
        write_stat(&mut file, &[[200, 0, 100, 900, 0, 0, 0, 0, 0, 0]]);
        assert!(stats.update());
        assert!((stats.core_percents()[0] - 75.0).abs() < 0.01);
    }

    #[test]
    fn backwards_counters_clamp_instead_of_wrapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat");
        let mut file = std::fs::File::create(&path).unwrap();

        write_stat(&mut file, &[[100, 0, 0, 100, 0, 0, 0, 0, 0, 0]]);
        let mut stats = CpuStats::with_path(&path);
        write_stat(&mut file, &[[90, 0, 0, 100, 0, 0, 0, 0, 0, 0]]);
        assert!(stats.update());
        let p = stats.core_percents()[0];
        assert!((0.0..=100.0).contains(&p));
    }

    #[test]
    fn unreadable_file_keeps_previous_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat");
        let mut file = std::fs::File::create(&path).unwrap();
        write_stat(&mut file, &[[10, 0, 0, 90, 0, 0, 0, 0, 0, 0]]);

        let mut stats = CpuStats::with_path(&path);
        assert_eq!(stats.num_cores(), 1);
        std::fs::remove_file(stats.stat_path()).unwrap();
        assert!(!stats.update());
        assert_eq!(stats.num_cores(), 1);
    }
}

//! Telemetry-to-text formatting for the overlay.

use super::{TextAlign, TextWriter};
use crate::config::OverlayConfig;
use crate::telemetry::GpuMetrics;

const LINE_SPACING: f32 = 20.0;
const STAT_SCALE: f32 = 0.9;

/// Regenerate the whole overlay into `writer`: wall clock, FPS, then the
/// GPU and CPU stat lines. Lines whose metric is unavailable are omitted
/// entirely.
pub fn write_overlay_text(
    writer: &mut TextWriter,
    cfg: &OverlayConfig,
    fps: f32,
    cpu_percents: &[f32],
    gpu: Option<GpuMetrics>,
) {
    let x = cfg.pos_x;
    let mut y = cfg.pos_y;

    let clock = chrono::Local::now().format("%T").to_string();
    writer.add_text(&clock, x, y, 1.0, TextAlign::Left);

    y += LINE_SPACING;
    writer.add_text(&format!("FPS: {fps:.0}"), x, y, STAT_SCALE, TextAlign::Left);

    if let Some(gpu) = gpu {
        if let Some(line) = clock_temp_line("Core:", gpu.core_clock_mhz, gpu.core_temp_c) {
            y += LINE_SPACING;
            writer.add_text(&line, x, y, STAT_SCALE, TextAlign::Left);
        }
        if let Some(line) = clock_temp_line("Mem: ", gpu.mem_clock_mhz, gpu.mem_temp_c) {
            y += LINE_SPACING;
            writer.add_text(&line, x, y, STAT_SCALE, TextAlign::Left);
        }
        if let Some(busy) = gpu.busy_percent {
            y += LINE_SPACING;
            writer.add_text(&format!("Busy: {busy}%"), x, y, STAT_SCALE, TextAlign::Left);
        }
    }

    if cfg.avg_cpus {
        if !cpu_percents.is_empty() {
            let avg = cpu_percents.iter().sum::<f32>() / cpu_percents.len() as f32;
            y += LINE_SPACING * STAT_SCALE;
            writer.add_text(&format!("CPU: {avg:.0}%"), x, y, STAT_SCALE, TextAlign::Left);
        }
    } else {
        for (id, p) in cpu_percents.iter().enumerate() {
            y += LINE_SPACING * STAT_SCALE;
            writer.add_text(&format!("CPU{id}: {p:.0}%"), x, y, STAT_SCALE, TextAlign::Left);
        }
    }
}

/// `"Core: 1850MHz 64°C"`, dropping whichever half is unavailable;
/// `None` when both are.
fn clock_temp_line(label: &str, clock_mhz: Option<u32>, temp_c: Option<u32>) -> Option<String> {
    if clock_mhz.is_none() && temp_c.is_none() {
        return None;
    }
    let mut line = format!("{label} ");
    if let Some(clk) = clock_mhz {
        line.push_str(&format!("{clk}MHz "));
    }
    if let Some(t) = temp_c {
        line.push_str(&format!("{t}°C"));
    }
    Some(line.trim_end().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayBuffer;

    fn render(cfg: &OverlayConfig, cpu: &[f32], gpu: Option<GpuMetrics>) -> usize {
        let buf = OverlayBuffer::new(1920, 1080, [1.0; 3]);
        let mut w = buf.begin_write();
        write_overlay_text(&mut w, cfg, 60.0, cpu, gpu);
        let glyphs = w.glyph_count();
        buf.end_write(w);
        glyphs
    }

    #[test]
    fn clock_temp_line_partial_availability() {
        assert_eq!(
            clock_temp_line("Core:", Some(1850), Some(64)).as_deref(),
            Some("Core: 1850MHz 64°C")
        );
        assert_eq!(
            clock_temp_line("Core:", Some(1850), None).as_deref(),
            Some("Core: 1850MHz")
        );
        assert_eq!(
            clock_temp_line("Core:", None, Some(64)).as_deref(),
            Some("Core: 64°C")
        );
        assert_eq!(clock_temp_line("Core:", None, None), None);
    }

    #[test]
    fn gpu_lines_omitted_without_gpu_source() {
        let cfg = OverlayConfig::default();
        let with_gpu = render(
            &cfg,
            &[10.0],
            Some(GpuMetrics {
                core_clock_mhz: Some(1850),
                busy_percent: Some(40),
                ..Default::default()
            }),
        );
        let without = render(&cfg, &[10.0], None);
        assert!(with_gpu > without);
    }

    #[test]
    fn per_core_vs_averaged_line_count() {
        let mut cfg = OverlayConfig::default();
        let cpu = [10.0, 90.0, 50.0, 50.0];

        cfg.avg_cpus = false;
        let per_core = render(&cfg, &cpu, None);
        cfg.avg_cpus = true;
        let averaged = render(&cfg, &cpu, None);
        // Four CPUn lines collapse to one CPU line.
        assert!(per_core > averaged);
    }

    #[test]
    fn empty_cpu_data_renders_clock_and_fps_only() {
        let cfg = OverlayConfig {
            avg_cpus: true,
            ..Default::default()
        };
        // "HH:MM:SS" is 8 glyphs, "FPS: 60" is 7.
        assert_eq!(render(&cfg, &[], None), 15);
    }
}

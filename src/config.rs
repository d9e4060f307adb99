//! Runtime configuration, read once when the instance is created.
//!
//! Every knob is an environment variable. Malformed or missing values fall
//! back to the built-in defaults without failing instance creation.

/// Overlay settings captured at instance-creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Overlay anchor in framebuffer pixels.
    pub pos_x: f32,
    pub pos_y: f32,
    /// Font tint, 0.0..=1.0 per channel.
    pub rgba: [f32; 4],
    /// One averaged CPU line instead of one line per core.
    pub avg_cpus: bool,
    /// DRM card index for the GPU stats source. None disables GPU telemetry.
    pub gpu_index: Option<u32>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            pos_x: 25.0,
            pos_y: 25.0,
            rgba: [1.0, 1.0, 1.0, 1.0],
            avg_cpus: false,
            gpu_index: None,
        }
    }
}

impl OverlayConfig {
    /// Read `VKTELEM_*` variables from the process environment.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("VKTELEM_POS") {
            if let Some((x, y)) = parse_pos(&v) {
                cfg.pos_x = x;
                cfg.pos_y = y;
            } else {
                log::debug!("VKTELEM_POS ignored: {:?}", v);
            }
        }
        if let Ok(v) = std::env::var("VKTELEM_RGBA") {
            if let Some(rgba) = parse_rgba(&v) {
                cfg.rgba = rgba;
            } else {
                log::debug!("VKTELEM_RGBA ignored: {:?}", v);
            }
        }
        if let Ok(v) = std::env::var("VKTELEM_AVG_CPU") {
            cfg.avg_cpus = matches!(v.trim(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("VKTELEM_GPU_INDEX") {
            cfg.gpu_index = v.trim().parse().ok();
            if cfg.gpu_index.is_none() {
                log::debug!("VKTELEM_GPU_INDEX ignored: {:?}", v);
            }
        }
        cfg
    }
}

/// `"x,y"` with `,`, `:`, `.` or space as separator.
fn parse_pos(s: &str) -> Option<(f32, f32)> {
    let mut it = s.split(|c: char| matches!(c, ',' | ':' | '.' | ' ')).filter(|t| !t.is_empty());
    let x: i32 = it.next()?.trim().parse().ok()?;
    let y: i32 = it.next()?.trim().parse().ok()?;
    Some((x as f32, y as f32))
}

/// `"r,g,b"` or `"r,g,b,a"`, each 0..=255. Alpha defaults to opaque.
fn parse_rgba(s: &str) -> Option<[f32; 4]> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let mut rgba = [1.0f32; 4];
    for (i, p) in parts.iter().enumerate() {
        let v: u32 = p.parse().ok()?;
        if v > 255 {
            return None;
        }
        rgba[i] = v as f32 / 255.0;
    }
    Some(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_accepts_common_separators() {
        assert_eq!(parse_pos("10,20"), Some((10.0, 20.0)));
        assert_eq!(parse_pos("10:20"), Some((10.0, 20.0)));
        assert_eq!(parse_pos("10 20"), Some((10.0, 20.0)));
    }

    #[test]
    fn pos_rejects_garbage() {
        assert_eq!(parse_pos("ten,20"), None);
        assert_eq!(parse_pos(""), None);
        assert_eq!(parse_pos("10"), None);
    }

    #[test]
    fn rgba_three_components_defaults_alpha() {
        let c = parse_rgba("255,128,0").unwrap();
        assert_eq!(c[0], 1.0);
        assert!((c[1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[2], 0.0);
        assert_eq!(c[3], 1.0);
    }

    #[test]
    fn rgba_rejects_out_of_range_and_wrong_arity() {
        assert_eq!(parse_rgba("256,0,0"), None);
        assert_eq!(parse_rgba("1,2"), None);
        assert_eq!(parse_rgba("1,2,3,4,5"), None);
        assert_eq!(parse_rgba("a,b,c"), None);
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = OverlayConfig::default();
        assert_eq!(cfg.pos_x, 25.0);
        assert!(!cfg.avg_cpus);
        assert_eq!(cfg.gpu_index, None);
    }
}

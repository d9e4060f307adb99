//! Glyph layout contract for the overlay text.
//!
//! A fixed monospace grid over the printable ASCII range, plus the degree
//! sign in the spare cell: every glyph occupies one atlas cell and advances
//! the pen by the same amount. The rasterized coverage the backend uploads
//! only has to honor this grid; the layout code never looks at pixels.

pub const FIRST_CHAR: u8 = 0x20;
pub const NUM_CHARS: u32 = 95;
/// The 16x6 grid has one cell beyond the ASCII range; the temperature
/// lines use it for the degree sign.
const DEGREE_INDEX: u32 = NUM_CHARS;

pub const ATLAS_COLUMNS: u32 = 16;
pub const ATLAS_ROWS: u32 = 6;
/// Atlas cell size in texels.
pub const CELL_WIDTH: u32 = 16;
pub const CELL_HEIGHT: u32 = 24;

pub const ATLAS_WIDTH: u32 = ATLAS_COLUMNS * CELL_WIDTH;
pub const ATLAS_HEIGHT: u32 = ATLAS_ROWS * CELL_HEIGHT;

/// Pen advance per glyph at scale 1.0, in framebuffer pixels.
pub const ADVANCE: f32 = 12.0;
/// Quad extent above/below the pen position at scale 1.0.
pub const ASCENT: f32 = 18.0;
pub const DESCENT: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    /// Quad corners relative to the pen, framebuffer pixels at scale 1.0.
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Atlas uv rect.
    pub s0: f32,
    pub t0: f32,
    pub s1: f32,
    pub t1: f32,
    pub advance: f32,
}

/// Metrics for `c`, or `None` for characters outside the atlas range.
/// Callers skip unmapped characters; they never fail on them.
pub fn glyph(c: char) -> Option<GlyphMetrics> {
    let index = glyph_index(c)?;
    let col = index % ATLAS_COLUMNS;
    let row = index / ATLAS_COLUMNS;
    Some(GlyphMetrics {
        x0: 0.0,
        y0: -ASCENT,
        x1: ADVANCE,
        y1: DESCENT,
        s0: (col * CELL_WIDTH) as f32 / ATLAS_WIDTH as f32,
        t0: (row * CELL_HEIGHT) as f32 / ATLAS_HEIGHT as f32,
        s1: ((col + 1) * CELL_WIDTH) as f32 / ATLAS_WIDTH as f32,
        t1: ((row + 1) * CELL_HEIGHT) as f32 / ATLAS_HEIGHT as f32,
        advance: ADVANCE,
    })
}

fn glyph_index(c: char) -> Option<u32> {
    if c == '°' {
        return Some(DEGREE_INDEX);
    }
    let index = (c as u32).checked_sub(FIRST_CHAR as u32)?;
    (index < NUM_CHARS).then_some(index)
}

/// Sum of advances for the mapped characters of `text`, at scale 1.0.
/// This is the pre-pass alignment works from.
pub fn text_width(text: &str) -> f32 {
    text.chars().filter_map(glyph).map(|g| g.advance).sum()
}

/// R8 coverage for the whole atlas.
///
/// Placeholder: each cell gets an inset filled block so glyph extents are
/// visible on screen. TODO: bake a real monospace coverage bitmap into the
/// grid (cell layout above is already the contract for it).
pub fn build_atlas() -> Vec<u8> {
    let mut pixels = vec![0u8; (ATLAS_WIDTH * ATLAS_HEIGHT) as usize];
    for index in 0..=DEGREE_INDEX {
        // Space stays empty.
        if index == 0 {
            continue;
        }
        let cx = (index % ATLAS_COLUMNS) * CELL_WIDTH;
        let cy = (index / ATLAS_COLUMNS) * CELL_HEIGHT;
        for y in 3..CELL_HEIGHT - 5 {
            for x in 2..CELL_WIDTH - 4 {
                pixels[((cy + y) * ATLAS_WIDTH + cx + x) as usize] = 0xff;
            }
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_ascii_and_degree_map_others_do_not() {
        assert!(glyph(' ').is_some());
        assert!(glyph('~').is_some());
        assert!(glyph('°').is_some());
        assert!(glyph('\n').is_none());
        assert!(glyph('\u{1f600}').is_none());
        assert!(glyph('µ').is_none());
    }

    #[test]
    fn uv_rects_stay_inside_the_atlas() {
        let mut glyphs: Vec<GlyphMetrics> = (FIRST_CHAR..FIRST_CHAR + NUM_CHARS as u8)
            .map(|code| glyph(code as char).unwrap())
            .collect();
        glyphs.push(glyph('°').unwrap());
        for g in glyphs {
            assert!(g.s0 >= 0.0 && g.s1 <= 1.0 && g.s0 < g.s1);
            assert!(g.t0 >= 0.0 && g.t1 <= 1.0 && g.t0 < g.t1);
        }
    }

    #[test]
    fn degree_sign_gets_the_spare_cell() {
        let degree = glyph('°').unwrap();
        let last_ascii = glyph('~').unwrap();
        assert_ne!((degree.s0, degree.t0), (last_ascii.s0, last_ascii.t0));
        assert_eq!(degree.advance, ADVANCE);
    }

    #[test]
    fn width_counts_only_mapped_chars() {
        assert_eq!(text_width("abc"), 3.0 * ADVANCE);
        assert_eq!(text_width("64°C"), 4.0 * ADVANCE);
        assert_eq!(text_width("aµc"), 2.0 * ADVANCE);
        assert_eq!(text_width(""), 0.0);
    }

    #[test]
    fn atlas_has_expected_size_and_blank_space_cell() {
        let atlas = build_atlas();
        assert_eq!(atlas.len(), (ATLAS_WIDTH * ATLAS_HEIGHT) as usize);
        // The space cell is the top-left one and must be fully transparent.
        for y in 0..CELL_HEIGHT {
            for x in 0..CELL_WIDTH {
                assert_eq!(atlas[(y * ATLAS_WIDTH + x) as usize], 0);
            }
        }
        assert!(atlas.iter().any(|&p| p != 0));
    }
}

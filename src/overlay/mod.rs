//! Double-buffered glyph staging for the overlay.
//!
//! Text formatting fills the write-side buffer while the render backend may
//! still be consuming the read side for the previous frame. The only
//! cross-thread synchronization is the index swap in [`OverlayBuffer::end_write`];
//! the buffer lock is never held while text is formatted or vertices are
//! copied out.

pub mod font;
mod text;

pub use text::write_overlay_text;

use std::sync::Mutex;

/// Upper bound on glyphs per frame. Writes past it are dropped, not grown;
/// the overlay is diagnostics, not a text editor.
pub const MAX_GLYPHS: usize = 2048;

pub const VERTICES_PER_GLYPH: usize = 4;

/// Matches the vertex input layout of the overlay pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphVertex {
    /// Clip-space position.
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

struct State {
    /// Index the next write goes to; the read side is `1 - write`.
    write: usize,
    buffers: [Vec<GlyphVertex>; 2],
}

pub struct OverlayBuffer {
    fb_width: f32,
    fb_height: f32,
    tint: [f32; 3],
    state: Mutex<State>,
}

impl OverlayBuffer {
    pub fn new(fb_width: u32, fb_height: u32, tint: [f32; 3]) -> Self {
        Self {
            fb_width: fb_width as f32,
            fb_height: fb_height as f32,
            tint,
            // The read side starts at 0 and alternates on every swap.
            state: Mutex::new(State {
                write: 1,
                buffers: [
                    Vec::with_capacity(MAX_GLYPHS * VERTICES_PER_GLYPH),
                    Vec::with_capacity(MAX_GLYPHS * VERTICES_PER_GLYPH),
                ],
            }),
        }
    }

    /// Detach the write-side buffer for formatting. The lock is dropped
    /// before this returns; formatting never blocks the read side.
    pub fn begin_write(&self) -> TextWriter {
        let (index, mut verts) = {
            let mut state = self.state.lock().unwrap();
            let index = state.write;
            (index, std::mem::take(&mut state.buffers[index]))
        };
        verts.clear();
        TextWriter {
            verts,
            index,
            glyphs: 0,
            truncated: false,
            fb_width: self.fb_width,
            fb_height: self.fb_height,
            tint: self.tint,
        }
    }

    /// Publish the written buffer: reattach it and swap read/write. This is
    /// the index exchange, O(1) under the lock.
    pub fn end_write(&self, writer: TextWriter) {
        if writer.truncated {
            log::warn!("overlay text overflowed {MAX_GLYPHS} glyphs, truncated");
        }
        let mut state = self.state.lock().unwrap();
        state.buffers[writer.index] = writer.verts;
        state.write = 1 - writer.index;
    }

    /// Run `f` over the read-side vertices. The buffer is detached under
    /// the lock and reattached afterwards, so `f` runs unlocked.
    pub fn with_read<R>(&self, f: impl FnOnce(&[GlyphVertex]) -> R) -> R {
        let (index, verts) = {
            let mut state = self.state.lock().unwrap();
            let index = 1 - state.write;
            (index, std::mem::take(&mut state.buffers[index]))
        };
        let result = f(&verts);
        self.state.lock().unwrap().buffers[index] = verts;
        result
    }

    /// Read-side glyph count for the draw loop.
    pub fn read_glyphs(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.buffers[1 - state.write].len() / VERTICES_PER_GLYPH
    }

    #[cfg(test)]
    fn read_index(&self) -> usize {
        1 - self.state.lock().unwrap().write
    }
}

/// Write-side handle; brackets all `add_text` calls between
/// `begin_write` and `end_write`.
pub struct TextWriter {
    verts: Vec<GlyphVertex>,
    index: usize,
    glyphs: usize,
    truncated: bool,
    fb_width: f32,
    fb_height: f32,
    tint: [f32; 3],
}

impl TextWriter {
    /// Append quads for `text` anchored at framebuffer pixel `(x, y)`
    /// (the text baseline). Alignment shifts the start pen by the summed
    /// glyph advances; characters outside the atlas range are skipped.
    pub fn add_text(&mut self, text: &str, x: f32, y: f32, scale: f32, align: TextAlign) {
        let width = font::text_width(text) * scale;
        let mut pen_x = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - width / 2.0,
            TextAlign::Right => x - width,
        };

        for g in text.chars().filter_map(font::glyph) {
            if self.glyphs >= MAX_GLYPHS {
                self.truncated = true;
                return;
            }
            let x0 = self.clip_x(pen_x + g.x0 * scale);
            let x1 = self.clip_x(pen_x + g.x1 * scale);
            let y0 = self.clip_y(y + g.y0 * scale);
            let y1 = self.clip_y(y + g.y1 * scale);

            // Triangle-strip order: TL, TR, BL, BR.
            self.verts.push(self.vertex(x0, y0, g.s0, g.t0));
            self.verts.push(self.vertex(x1, y0, g.s1, g.t0));
            self.verts.push(self.vertex(x0, y1, g.s0, g.t1));
            self.verts.push(self.vertex(x1, y1, g.s1, g.t1));

            pen_x += g.advance * scale;
            self.glyphs += 1;
        }
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs
    }

    fn vertex(&self, x: f32, y: f32, u: f32, v: f32) -> GlyphVertex {
        GlyphVertex {
            pos: [x, y],
            uv: [u, v],
            color: self.tint,
        }
    }

    fn clip_x(&self, px: f32) -> f32 {
        px / self.fb_width * 2.0 - 1.0
    }

    fn clip_y(&self, px: f32) -> f32 {
        px / self.fb_height * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> OverlayBuffer {
        OverlayBuffer::new(800, 600, [1.0, 1.0, 1.0])
    }

    #[test]
    fn swap_parity_after_n_swaps() {
        let buf = buffer();
        assert_eq!(buf.read_index(), 0);
        for n in 1..=6 {
            let w = buf.begin_write();
            buf.end_write(w);
            assert_eq!(buf.read_index(), n % 2);
        }
    }

    #[test]
    fn write_lands_on_read_side_after_swap() {
        let buf = buffer();
        let mut w = buf.begin_write();
        w.add_text("FPS: 60", 25.0, 25.0, 1.0, TextAlign::Left);
        let glyphs = w.glyph_count();
        assert_eq!(glyphs, 7);
        buf.end_write(w);

        assert_eq!(buf.read_glyphs(), glyphs);
        buf.with_read(|verts| {
            assert_eq!(verts.len(), glyphs * VERTICES_PER_GLYPH);
        });

        // The next write must not disturb the published read side.
        let mut w = buf.begin_write();
        w.add_text("x", 0.0, 0.0, 1.0, TextAlign::Left);
        assert_eq!(buf.read_glyphs(), glyphs);
        buf.end_write(w);
        assert_eq!(buf.read_glyphs(), 1);
    }

    #[test]
    fn right_alignment_equals_left_shifted_by_width() {
        let buf = buffer();
        let text = "FPS: 60";
        let width = font::text_width(text);

        let mut right = buf.begin_write();
        right.add_text(text, 100.0, 50.0, 1.0, TextAlign::Right);
        let right_verts = right.verts.clone();
        buf.end_write(right);

        let mut left = buf.begin_write();
        left.add_text(text, 100.0 - width, 50.0, 1.0, TextAlign::Left);
        assert_eq!(left.verts, right_verts);
        buf.end_write(left);
    }

    #[test]
    fn center_alignment_splits_the_width() {
        let buf = buffer();
        let mut center = buf.begin_write();
        center.add_text("ab", 400.0, 50.0, 1.0, TextAlign::Center);
        let first_x = center.verts[0].pos[0];
        buf.end_write(center);

        let mut left = buf.begin_write();
        left.add_text("ab", 400.0 - font::ADVANCE, 50.0, 1.0, TextAlign::Left);
        assert_eq!(left.verts[0].pos[0], first_x);
        buf.end_write(left);
    }

    #[test]
    fn unmapped_chars_are_skipped_not_fatal() {
        let buf = buffer();
        let mut w = buf.begin_write();
        w.add_text("64°C", 0.0, 0.0, 1.0, TextAlign::Left);
        assert_eq!(w.glyph_count(), 4);
        w.add_text("αβ", 0.0, 20.0, 1.0, TextAlign::Left);
        assert_eq!(w.glyph_count(), 4);
        buf.end_write(w);
    }

    #[test]
    fn capacity_truncates_without_failing() {
        let buf = buffer();
        let long = "x".repeat(MAX_GLYPHS + 100);
        let mut w = buf.begin_write();
        w.add_text(&long, 0.0, 0.0, 1.0, TextAlign::Left);
        assert_eq!(w.glyph_count(), MAX_GLYPHS);
        assert!(w.truncated);
        // Further writes stay dropped.
        w.add_text("more", 0.0, 20.0, 1.0, TextAlign::Left);
        assert_eq!(w.glyph_count(), MAX_GLYPHS);
        buf.end_write(w);
        assert_eq!(buf.read_glyphs(), MAX_GLYPHS);
    }

    #[test]
    fn vertices_are_clip_space() {
        let buf = OverlayBuffer::new(100, 100, [1.0, 0.0, 0.0]);
        let mut w = buf.begin_write();
        w.add_text("a", 50.0, 50.0, 1.0, TextAlign::Left);
        let v = w.verts[0];
        assert!((v.pos[0] - 0.0).abs() < 0.5);
        assert!(v.pos[0] >= -1.0 && v.pos[0] <= 1.0);
        assert_eq!(v.color, [1.0, 0.0, 0.0]);
        buf.end_write(w);
    }
}

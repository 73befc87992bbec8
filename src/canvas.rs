use std::io::{self, Write};

use crate::surface::{Rgb, Rgba, Surface};

/// A software framebuffer shown as half-block cells: every terminal cell holds
/// two vertically stacked pixels, so a `cols x rows` terminal is a
/// `cols x rows * 2` surface.
pub struct TerminalCanvas {
    width: usize,
    height: usize,
    background: Rgb,
    pixels: Vec<[f32; 3]>,
    glow: Option<(f32, Rgba)>,
    labels: Vec<Label>,
    output_buf: Vec<u8>,
}

struct Label {
    col: usize,
    row: usize,
    text: String,
    color: Rgba,
}

impl TerminalCanvas {
    pub fn new(width: usize, height: usize, background: Rgb) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![to_f32(background); width * height],
            glow: None,
            labels: Vec::new(),
            output_buf: Vec::with_capacity(width * height * 25),
        }
    }

    #[cfg(test)]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        (x < self.width && y < self.height).then(|| to_rgb(self.pixels[y * self.width + x]))
    }

    fn blend(&mut self, x: usize, y: usize, rgb: Rgb, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let alpha = alpha.min(1.0);
        let src = to_f32(rgb);
        let dst = &mut self.pixels[y * self.width + x];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = *d * (1.0 - alpha) + s * alpha;
        }
    }

    /// Pixel range `[lo, hi)` touched by the span `[from, to]`, clipped to `len`.
    fn span(from: f32, to: f32, len: usize) -> (usize, usize) {
        let lo = from.floor().max(0.0) as usize;
        let hi = (to.ceil().max(0.0) as usize).min(len);
        (lo.min(hi), hi)
    }

    /// Writes the frame with cursor-home, half-block cells and 24-bit colors,
    /// then forgets this frame's text labels.
    pub fn present<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let cols = self.width;
        let mut cells: Vec<Option<(char, Rgba)>> = vec![None; cols * self.height.div_ceil(2)];
        for label in &self.labels {
            for (i, ch) in label.text.chars().enumerate() {
                let col = label.col + i;
                if col < cols && label.row * cols + col < cells.len() {
                    cells[label.row * cols + col] = Some((ch, label.color));
                }
            }
        }

        for y in (0..self.height).step_by(2) {
            let mut prev_bg: Option<Rgb> = None;
            let mut prev_fg: Option<Rgb> = None;

            for x in 0..cols {
                let top = to_rgb(self.pixels[y * cols + x]);
                let bot = if y + 1 < self.height {
                    to_rgb(self.pixels[(y + 1) * cols + x])
                } else {
                    top
                };

                let (glyph, fg) = match cells[(y / 2) * cols + x] {
                    Some((ch, color)) => (ch, mix(top, color.rgb, color.alpha)),
                    None => ('▄', bot),
                };

                if prev_bg != Some(top) {
                    write!(self.output_buf, "\x1b[48;2;{};{};{}m", top.0, top.1, top.2)?;
                    prev_bg = Some(top);
                }
                if prev_fg != Some(fg) {
                    write!(self.output_buf, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2)?;
                    prev_fg = Some(fg);
                }
                let mut utf8 = [0u8; 4];
                self.output_buf
                    .extend_from_slice(glyph.encode_utf8(&mut utf8).as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");

            if y + 2 < self.height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        self.labels.clear();
        out.write_all(&self.output_buf)?;
        out.flush()
    }
}

impl Surface for TerminalCanvas {
    fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels = vec![to_f32(self.background); width * height];
        self.labels.clear();
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        let (x0, x1) = Self::span(x, x + width, self.width);
        let (y0, y1) = Self::span(y, y + height, self.height);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color.rgb, color.alpha);
            }
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        if radius <= 0.0 {
            return;
        }
        let blur = self.glow.map_or(0.0, |(blur, _)| blur);
        let reach = radius + blur + 1.0;
        let (x0, x1) = Self::span(cx - reach, cx + reach, self.width);
        let (y0, y1) = Self::span(cy - reach, cy + reach, self.height);

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let dist = (dx * dx + dy * dy).sqrt();

                if let Some((blur, glow)) = self.glow {
                    let falloff = if dist <= radius {
                        1.0
                    } else if blur > 0.0 {
                        1.0 - (dist - radius) / blur
                    } else {
                        0.0
                    };
                    self.blend(px, py, glow.rgb, glow.alpha * falloff.max(0.0));
                }

                // antialiased edge so sub-pixel particles still show up
                let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
                self.blend(px, py, color.rgb, color.alpha * coverage);
            }
        }
    }

    fn set_glow(&mut self, blur: f32, color: Rgba) {
        self.glow = Some((blur.max(0.0), color));
    }

    fn clear_glow(&mut self) {
        self.glow = None;
    }

    fn fill_text(&mut self, x: f32, y: f32, text: &str, color: Rgba) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        self.labels.push(Label {
            col: x as usize,
            row: y as usize / 2,
            text: text.to_owned(),
            color,
        });
    }
}

fn to_f32(rgb: Rgb) -> [f32; 3] {
    [rgb.0 as f32, rgb.1 as f32, rgb.2 as f32]
}

fn to_rgb(px: [f32; 3]) -> Rgb {
    Rgb(px[0].round() as u8, px[1].round() as u8, px[2].round() as u8)
}

fn mix(under: Rgb, over: Rgb, alpha: f32) -> Rgb {
    let a = alpha.clamp(0.0, 1.0);
    let channel = |u: u8, o: u8| (u as f32 * (1.0 - a) + o as f32 * a).round() as u8;
    Rgb(
        channel(under.0, over.0),
        channel(under.1, over.1),
        channel(under.2, over.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translucent_rect_fades_instead_of_clearing() {
        let mut canvas = TerminalCanvas::new(4, 4, Rgb::BLACK);
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Rgb::WHITE.with_alpha(1.0));
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Rgb::BLACK.with_alpha(0.2));
        assert_eq!(canvas.pixel(0, 0), Some(Rgb(204, 204, 204)));
        assert_eq!(canvas.pixel(3, 3), Some(Rgb(204, 204, 204)));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn rect_is_clipped_to_surface() {
        let mut canvas = TerminalCanvas::new(4, 4, Rgb::BLACK);
        canvas.fill_rect(-10.0, 2.0, 100.0, 100.0, Rgb::WHITE.with_alpha(1.0));
        assert_eq!(canvas.pixel(0, 1), Some(Rgb::BLACK));
        assert_eq!(canvas.pixel(0, 2), Some(Rgb::WHITE));
        assert_eq!(canvas.pixel(3, 3), Some(Rgb::WHITE));
    }

    #[test]
    fn circle_covers_center_not_far_pixels() {
        let mut canvas = TerminalCanvas::new(20, 20, Rgb::BLACK);
        canvas.fill_circle(10.0, 10.0, 2.0, Rgb(255, 0, 0).with_alpha(1.0));
        assert_eq!(canvas.pixel(10, 10), Some(Rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(9, 9), Some(Rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(15, 10), Some(Rgb::BLACK));
    }

    #[test]
    fn glow_reaches_past_the_circle_until_cleared() {
        let mut canvas = TerminalCanvas::new(20, 20, Rgb::BLACK);
        canvas.set_glow(4.0, Rgb(0, 255, 0).with_alpha(0.5));
        canvas.fill_circle(10.0, 10.0, 1.0, Rgb(0, 255, 0).with_alpha(1.0));
        let halo = canvas.pixel(12, 10).unwrap();
        assert!(halo.1 > 0 && halo.1 < 255, "halo = {halo:?}");

        canvas.clear_glow();
        canvas.fill_circle(3.0, 3.0, 1.0, Rgb(0, 255, 0).with_alpha(1.0));
        assert_eq!(canvas.pixel(5, 3), Some(Rgb::BLACK));
    }

    #[test]
    fn circles_off_surface_are_ignored() {
        let mut canvas = TerminalCanvas::new(8, 8, Rgb::BLACK);
        canvas.fill_circle(-50.0, 200.0, 3.0, Rgb::WHITE.with_alpha(1.0));
        canvas.fill_circle(4.0, 4.0, 0.0, Rgb::WHITE.with_alpha(1.0));
        assert!((0..8).all(|y| (0..8).all(|x| canvas.pixel(x, y) == Some(Rgb::BLACK))));
    }

    #[test]
    fn resize_resets_to_background() {
        let bg = Rgb(10, 20, 30);
        let mut canvas = TerminalCanvas::new(2, 2, bg);
        canvas.fill_rect(0.0, 0.0, 2.0, 2.0, Rgb::WHITE.with_alpha(1.0));
        canvas.resize(5, 3);
        assert_eq!(canvas.size(), (5.0, 3.0));
        assert_eq!(canvas.pixel(4, 2), Some(bg));
    }

    #[test]
    fn present_emits_half_blocks_and_labels() {
        let mut canvas = TerminalCanvas::new(6, 4, Rgb::BLACK);
        canvas.fill_rect(0.0, 1.0, 1.0, 1.0, Rgb(255, 0, 0).with_alpha(1.0));
        canvas.fill_text(2.0, 2.0, "Hi", Rgb::WHITE.with_alpha(1.0));

        let mut out = Vec::new();
        canvas.present(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("\x1b[H"));
        assert!(text.contains("\x1b[38;2;255;0;0m▄"));
        assert!(text.contains("\x1b[38;2;255;255;255mHi"));
        assert_eq!(text.matches("\r\n").count(), 1);

        // labels last one frame
        let mut out = Vec::new();
        canvas.present(&mut out).unwrap();
        assert!(!String::from_utf8(out).unwrap().contains("Hi"));
    }
}

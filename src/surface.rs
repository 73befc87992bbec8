/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            rgb: self,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Parses `RRGGBB`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Rgb(r, g, b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f32,
}

/// The drawing primitives the simulation renders with.
///
/// Coordinates are in surface pixels with the origin at the top-left corner.
/// Implementations composite every fill over what is already there, so a
/// translucent full-surface `fill_rect` fades the previous frame instead of
/// erasing it.
pub trait Surface {
    fn size(&self) -> (f32, f32);
    fn resize(&mut self, width: usize, height: usize);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba);
    /// Glow applies to circle fills until `clear_glow` is called.
    fn set_glow(&mut self, blur: f32, color: Rgba);
    fn clear_glow(&mut self);
    fn fill_text(&mut self, x: f32, y: f32, text: &str, color: Rgba);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Rgb::from_hex("1a1b26"), Some(Rgb(0x1a, 0x1b, 0x26)));
        assert_eq!(Rgb::from_hex("#FFFFFF"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("fff"), None);
        assert_eq!(Rgb::from_hex("zz0000"), None);
    }

    #[test]
    fn alpha_is_clamped() {
        assert_eq!(Rgb::BLACK.with_alpha(-0.5).alpha, 0.0);
        assert_eq!(Rgb::BLACK.with_alpha(3.0).alpha, 1.0);
    }
}

//! Cover-art color extraction.
//!
//! Sample every third pixel, skip mostly transparent ones, quantize each
//! channel to steps of 16 and rank the buckets by count. Anything that goes
//! wrong (network, status, decode, timeout) resolves to [`FALLBACK`].

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};
use vinyl_proto::track::ThemeColors;

/// Neutral palette used whenever extraction fails.
pub const FALLBACK: [Rgb; 3] = [Rgb(0x1a, 0x1a, 0x1a), Rgb(0x2a, 0x2a, 0x2a), Rgb(0x3a, 0x3a, 0x3a)];

pub const MAX_COLORS: usize = 7;
/// RGBA bytes between samples (every third pixel).
const SAMPLE_STRIDE: usize = 12;
const QUANT_STEP: u8 = 16;
const ALPHA_CUTOFF: u8 = 128;
/// Brightness factors for the primary / secondary / accent background roles.
const ROLE_SCALE: [f32; 3] = [0.2, 0.3, 0.4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Multiply every channel by `factor`, rounding down.
    pub fn scale(self, factor: f32) -> Self {
        let f = |c: u8| (f32::from(c) * factor).floor().clamp(0.0, 255.0) as u8;
        Rgb(f(self.0), f(self.1), f(self.2))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    #[error("image request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no opaque pixels sampled")]
    Empty,
    #[error("extraction timed out")]
    Timeout,
    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Ranked colors, most frequent first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
    fallback: bool,
}

impl Palette {
    pub fn fallback() -> Self {
        Self {
            colors: FALLBACK.to_vec(),
            fallback: true,
        }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Background roles: the three leading colors darkened for use as
    /// tints. Missing ranks and the fallback palette use the neutral colors
    /// as-is.
    pub fn theme(&self) -> ThemeColors {
        let role = |i: usize| -> String {
            match self.colors.get(i) {
                Some(c) if !self.fallback => c.scale(ROLE_SCALE[i]).to_hex(),
                _ => FALLBACK[i].to_hex(),
            }
        };
        ThemeColors {
            primary: role(0),
            secondary: role(1),
            accent: role(2),
        }
    }
}

/// Rank the quantized colors of raw RGBA8 pixels.
pub fn rank_pixels(rgba: &[u8]) -> Vec<Rgb> {
    // bucket -> (count, first seen)
    let mut buckets: HashMap<Rgb, (usize, usize)> = HashMap::new();
    for (order, px) in rgba.chunks_exact(4).step_by(SAMPLE_STRIDE / 4).enumerate() {
        if px[3] <= ALPHA_CUTOFF {
            continue;
        }
        let q = |c: u8| c / QUANT_STEP * QUANT_STEP;
        let entry = buckets.entry(Rgb(q(px[0]), q(px[1]), q(px[2]))).or_insert((0, order));
        entry.0 += 1;
    }

    let mut ranked: Vec<(Rgb, (usize, usize))> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(MAX_COLORS).map(|(c, _)| c).collect()
}

pub fn palette_from_bytes(bytes: &[u8]) -> Result<Palette, PaletteError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let colors = rank_pixels(img.as_raw());
    if colors.is_empty() {
        return Err(PaletteError::Empty);
    }
    Ok(Palette {
        colors,
        fallback: false,
    })
}

async fn try_extract(http: &reqwest::Client, url: &str) -> Result<Palette, PaletteError> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(PaletteError::Status(response.status()));
    }
    let bytes = response.bytes().await?;
    tokio::task::spawn_blocking(move || palette_from_bytes(&bytes)).await?
}

/// Extract the palette of the image at `url`. Never fails; bounded by
/// `timeout`.
pub async fn extract(http: &reqwest::Client, url: &str, timeout: Duration) -> Palette {
    if url.is_empty() {
        return Palette::fallback();
    }
    let result = match tokio::time::timeout(timeout, try_extract(http, url)).await {
        Ok(r) => r,
        Err(_) => Err(PaletteError::Timeout),
    };
    match result {
        Ok(palette) => {
            debug!("palette: {} -> {:?}", url, palette.colors);
            palette
        }
        Err(e) => {
            warn!("palette: {} -> fallback ({})", url, e);
            Palette::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_hex_round_trip_and_scale() {
        let c = Rgb::from_hex("#6a1b9a").unwrap();
        assert_eq!(c, Rgb(0x6a, 0x1b, 0x9a));
        assert_eq!(c.to_hex(), "#6a1b9a");
        assert_eq!(Rgb(200, 100, 50).scale(0.2), Rgb(40, 20, 10));
        assert!(Rgb::from_hex("6a1b9a").is_none());
        assert!(Rgb::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn test_rank_quantizes_and_orders() {
        // 9 pixels: every third is sampled (indices 0, 3, 6).
        let mut rgba = Vec::new();
        let pixels = [
            [250, 10, 10, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [17, 33, 49, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
            [31, 47, 63, 255],
            [0, 0, 0, 255],
            [0, 0, 0, 255],
        ];
        for p in pixels {
            rgba.extend_from_slice(&p);
        }
        let ranked = rank_pixels(&rgba);
        assert_eq!(ranked, vec![Rgb(16, 32, 48), Rgb(240, 0, 0)]);
    }

    #[test]
    fn test_rank_skips_transparent() {
        let rgba = [255, 255, 255, 128, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(rank_pixels(&rgba).is_empty());
    }

    #[test]
    fn test_rank_caps_at_seven() {
        let mut img = RgbaImage::new(30, 1);
        for x in 0..30 {
            img.put_pixel(x, 0, Rgba([(x * 8) as u8, 0, 0, 255]));
        }
        assert_eq!(rank_pixels(img.as_raw()).len(), MAX_COLORS);
    }

    #[test]
    fn test_palette_from_png() {
        let mut img = RgbaImage::from_pixel(12, 12, Rgba([200, 100, 50, 255]));
        for x in 0..4 {
            img.put_pixel(x, 0, Rgba([0, 0, 255, 255]));
        }
        let palette = palette_from_bytes(&png(&img)).unwrap();
        assert!(!palette.is_fallback());
        assert_eq!(palette.colors()[0], Rgb(192, 96, 48));

        let theme = palette.theme();
        assert_eq!(theme.primary, Rgb(192, 96, 48).scale(0.2).to_hex());
        assert_eq!(theme.secondary, Rgb(0, 0, 240).scale(0.3).to_hex());
        assert_eq!(theme.accent, "#3a3a3a");
    }

    #[test]
    fn test_transparent_image_is_error() {
        let img = RgbaImage::from_pixel(6, 6, Rgba([10, 10, 10, 0]));
        assert!(matches!(palette_from_bytes(&png(&img)), Err(PaletteError::Empty)));
    }

    #[test]
    fn test_garbage_bytes_is_error() {
        assert!(matches!(palette_from_bytes(b"not an image"), Err(PaletteError::Decode(_))));
    }

    #[test]
    fn test_fallback_theme() {
        let theme = Palette::fallback().theme();
        assert_eq!(theme.primary, "#1a1a1a");
        assert_eq!(theme.secondary, "#2a2a2a");
        assert_eq!(theme.accent, "#3a3a3a");
    }

    #[tokio::test]
    async fn test_unreachable_url_resolves_to_fallback() {
        let http = reqwest::Client::new();
        let timeout = Duration::from_secs(2);
        let started = std::time::Instant::now();
        let palette = extract(&http, "http://127.0.0.1:9/cover.jpg", timeout).await;
        assert!(palette.is_fallback());
        assert!(started.elapsed() < timeout + Duration::from_secs(1));
    }
}

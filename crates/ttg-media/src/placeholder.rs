//! Placeholder frame synthesis.
//!
//! Produces a short, gently moving clip without any ML inference. A base
//! image is derived from the prompt (dark backdrop, a violet glow and one
//! bar per prompt word), then every frame applies a small camera drift,
//! zoom and roll, an exposure flicker, a white-balance wobble and film grain.

use std::f32::consts::{FRAC_PI_4, TAU};

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const BACKGROUND: [f32; 3] = [10.0, 10.0, 15.0];
const ACCENT: [f32; 3] = [139.0, 92.0, 246.0];

const MAX_WORD_BARS: usize = 8;
const DRIFT_PX: f32 = 2.0;
const ZOOM_AMPLITUDE: f32 = 0.01;
const ROLL_DEGREES: f32 = 1.5;
const EXPOSURE_AMPLITUDE: f32 = 0.04;
const TEMPERATURE_AMPLITUDE: f32 = 4.0;
const GRAIN: f32 = 3.0;

/// Synthesize `num_frames` frames of `width` x `height` for `prompt`.
///
/// The output is deterministic for a given prompt and seed.
pub fn create_placeholder_frames(
    width: u32,
    height: u32,
    num_frames: u32,
    prompt: &str,
    seed: Option<u64>,
) -> Vec<RgbImage> {
    let width = width.max(1);
    let height = height.max(1);
    let hash = prompt_hash(prompt);
    let pixels = base_image(width, height, prompt, hash);
    let base = Base {
        pixels: &pixels,
        width,
        height,
    };
    let seed = seed.unwrap_or(hash);

    (0..num_frames)
        .into_par_iter()
        .map(|i| {
            let t = if num_frames > 1 {
                i as f32 / num_frames as f32
            } else {
                0.0
            };
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(i)));
            render_frame(&base, t, &mut rng)
        })
        .collect()
}

/// FNV-1a over the prompt bytes.
fn prompt_hash(prompt: &str) -> u64 {
    prompt.bytes().fold(0xcbf29ce484222325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x100000001b3)
    })
}

fn base_image(width: u32, height: u32, prompt: &str, hash: u64) -> Vec<[f32; 3]> {
    let w = width as f32;
    let h = height as f32;

    // Glow center wanders with the prompt so different prompts look different.
    let gx = w * (0.35 + 0.3 * ((hash & 0xff) as f32 / 255.0));
    let gy = h * (0.35 + 0.3 * (((hash >> 8) & 0xff) as f32 / 255.0));
    let radius = 0.6 * w.min(h);

    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - gx;
            let dy = y as f32 - gy;
            let glow = (1.0 - (dx * dx + dy * dy).sqrt() / radius).clamp(0.0, 1.0);
            let glow = glow * glow * 0.45;
            pixels.push(mix(BACKGROUND, ACCENT, glow));
        }
    }

    // One bar per word, stacked around the middle like lines of a caption.
    let words: Vec<&str> = prompt.split_whitespace().take(MAX_WORD_BARS).collect();
    if !words.is_empty() {
        let bar_h = (h / 40.0).max(2.0);
        let gap = bar_h * 1.2;
        let block = words.len() as f32 * (bar_h + gap) - gap;
        let mut top = (h - block) / 2.0;
        for word in words {
            let len = (word.chars().count() as f32 / 12.0).min(1.0);
            let bar_w = w * (0.15 + 0.55 * len);
            let left = (w - bar_w) / 2.0;
            fill_rect(&mut pixels, width, height, left, top, bar_w, bar_h);
            top += bar_h + gap;
        }
    }

    // Light contrast lift.
    for px in pixels.iter_mut() {
        for c in px.iter_mut() {
            *c = ((*c - 128.0) * 1.08 + 128.0 + 4.0).clamp(0.0, 255.0);
        }
    }

    pixels
}

fn fill_rect(pixels: &mut [[f32; 3]], width: u32, height: u32, left: f32, top: f32, w: f32, h: f32) {
    let x0 = left.max(0.0) as u32;
    let y0 = top.max(0.0) as u32;
    let x1 = ((left + w) as u32).min(width);
    let y1 = ((top + h) as u32).min(height);
    for y in y0..y1 {
        for x in x0..x1 {
            let idx = (y * width + x) as usize;
            pixels[idx] = mix(pixels[idx], ACCENT, 0.85);
        }
    }
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

struct Base<'a> {
    pixels: &'a [[f32; 3]],
    width: u32,
    height: u32,
}

impl Base<'_> {
    fn at(&self, x: i64, y: i64) -> [f32; 3] {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.pixels[(y * self.width + x) as usize]
    }

    fn bilinear(&self, x: f32, y: f32) -> [f32; 3] {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);
        let top = mix(self.at(xi, yi), self.at(xi + 1, yi), fx);
        let bottom = mix(self.at(xi, yi + 1), self.at(xi + 1, yi + 1), fx);
        mix(top, bottom, fy)
    }
}

fn render_frame(base: &Base<'_>, t: f32, rng: &mut StdRng) -> RgbImage {
    let phase = TAU * t;
    let tx = DRIFT_PX * phase.cos();
    let ty = DRIFT_PX * phase.sin();
    let zoom = 1.0 + ZOOM_AMPLITUDE * phase.sin();
    let angle = ROLL_DEGREES.to_radians() * (phase + FRAC_PI_4).sin();
    let exposure = 1.0 + EXPOSURE_AMPLITUDE * (2.0 * phase).sin();
    let warmth = TEMPERATURE_AMPLITUDE * phase.sin();

    let (sin_a, cos_a) = angle.sin_cos();
    let cx = base.width as f32 / 2.0;
    let cy = base.height as f32 / 2.0;

    let mut frame = RgbImage::new(base.width, base.height);
    for (x, y, px) in frame.enumerate_pixels_mut() {
        // Inverse mapping: output pixel -> source coordinate.
        let dx = x as f32 - cx - tx;
        let dy = y as f32 - cy - ty;
        let sx = (cos_a * dx + sin_a * dy) / zoom + cx;
        let sy = (-sin_a * dx + cos_a * dy) / zoom + cy;

        let [r, g, b] = base.bilinear(sx, sy);
        let grain = rng.random_range(-GRAIN..=GRAIN);
        *px = Rgb([
            to_channel(r * exposure + warmth + grain),
            to_channel(g * exposure + grain),
            to_channel(b * exposure - warmth + grain),
        ]);
    }
    frame
}

fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_and_size() {
        let frames = create_placeholder_frames(64, 48, 6, "a cat on a skateboard", Some(1));
        assert_eq!(frames.len(), 6);
        assert!(frames.iter().all(|f| f.dimensions() == (64, 48)));
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let a = create_placeholder_frames(32, 32, 2, "sunset", Some(7));
        let b = create_placeholder_frames(32, 32, 2, "sunset", Some(7));
        assert_eq!(a[0].as_raw(), b[0].as_raw());
        assert_eq!(a[1].as_raw(), b[1].as_raw());
    }

    #[test]
    fn test_frames_move() {
        let frames = create_placeholder_frames(64, 64, 4, "drifting clouds over hills", Some(3));
        assert_ne!(frames[0].as_raw(), frames[2].as_raw());
    }

    #[test]
    fn test_prompts_differ() {
        let a = create_placeholder_frames(48, 48, 1, "ocean", Some(0));
        let b = create_placeholder_frames(48, 48, 1, "a much longer mountain prompt", Some(0));
        assert_ne!(a[0].as_raw(), b[0].as_raw());
    }

    #[test]
    fn test_backdrop_is_dark() {
        let frames = create_placeholder_frames(200, 200, 1, "x", Some(0));
        let corner = frames[0].get_pixel(0, 0).0;
        assert!(corner.iter().all(|c| *c < 60));
    }

    #[test]
    fn test_zero_frames() {
        assert!(create_placeholder_frames(16, 16, 0, "x", None).is_empty());
    }
}

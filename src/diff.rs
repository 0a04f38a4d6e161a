//! Per-pixel difference kernel.
//!
//! Colour distance is measured in YIQ space with semi-transparent pixels blended
//! onto white. A pixel counts as mismatched when its distance exceeds
//! `MAX_YIQ_DELTA * pixel_threshold^2`, unless it looks like an anti-aliased edge
//! in either image.

/// Largest possible YIQ delta between two colours.
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Counts mismatched pixels between two equally sized RGBA buffers.
///
/// Both buffers must hold `width * height * 4` bytes.
pub(crate) fn count_mismatched(
    a: &[u8],
    b: &[u8],
    width: u32,
    height: u32,
    pixel_threshold: f64,
) -> u64 {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), width as usize * height as usize * 4);

    if a == b {
        return 0;
    }

    let max_delta = MAX_YIQ_DELTA * pixel_threshold * pixel_threshold;
    let img_a = Frame { data: a, width, height };
    let img_b = Frame { data: b, width, height };

    let mut mismatched = 0;
    for y in 0..height {
        for x in 0..width {
            let pos = img_a.offset(x, y);
            let delta = color_delta(a, b, pos, pos, false);
            if delta.abs() > max_delta
                && !is_antialiased(&img_a, x, y, &img_b)
                && !is_antialiased(&img_b, x, y, &img_a)
            {
                mismatched += 1;
            }
        }
    }
    mismatched
}

#[derive(Clone, Copy)]
struct Frame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl Frame<'_> {
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let pos = self.offset(x, y);
        &self.data[pos..pos + 4]
    }

    /// Inclusive 3x3 window around `(x, y)`, clipped to the frame.
    fn window(&self, x: u32, y: u32) -> (u32, u32, u32, u32) {
        (
            x.saturating_sub(1),
            y.saturating_sub(1),
            (x + 1).min(self.width - 1),
            (y + 1).min(self.height - 1),
        )
    }
}

/// Signed YIQ distance between pixel `k` of `img1` and pixel `m` of `img2`.
///
/// Negative when the first pixel is brighter. With `y_only`, returns just the
/// luma difference.
fn color_delta(img1: &[u8], img2: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    let p1 = &img1[k..k + 4];
    let p2 = &img2[m..m + 4];
    if p1 == p2 {
        return 0.0;
    }

    let (r1, g1, b1) = blend_onto_white(p1);
    let (r2, g2, b2) = blend_onto_white(p2);

    let y1 = rgb_to_y(r1, g1, b1);
    let y2 = rgb_to_y(r2, g2, b2);
    let y = y1 - y2;

    if y_only {
        return y;
    }

    let i = rgb_to_i(r1, g1, b1) - rgb_to_i(r2, g2, b2);
    let q = rgb_to_q(r1, g1, b1) - rgb_to_q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 {
        -delta
    } else {
        delta
    }
}

fn blend_onto_white(px: &[u8]) -> (f64, f64, f64) {
    let (r, g, b, a) = (
        f64::from(px[0]),
        f64::from(px[1]),
        f64::from(px[2]),
        f64::from(px[3]),
    );
    if a >= 255.0 {
        return (r, g, b);
    }
    let a = a / 255.0;
    let blend = |c: f64| 255.0 + (c - 255.0) * a;
    (blend(r), blend(g), blend(b))
}

fn rgb_to_y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}

fn rgb_to_i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}

fn rgb_to_q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}

/// Returns `true` if the pixel at `(x1, y1)` of `img` looks like an anti-aliased edge.
///
/// An edge pixel sits between a darker and a brighter neighbour, has few identical
/// neighbours, and one of those extreme neighbours is part of a flat area in both
/// images.
fn is_antialiased(img: &Frame<'_>, x1: u32, y1: u32, other: &Frame<'_>) -> bool {
    let (x0, y0, x2, y2) = img.window(x1, y1);
    let pos = img.offset(x1, y1);

    let mut zeroes = u32::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);
    let mut min = 0.0;
    let mut max = 0.0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (0, 0, 0, 0);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }

            let delta = color_delta(img.data, img.data, pos, img.offset(x, y), true);

            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_x = x;
                min_y = y;
            } else if delta > max {
                max = delta;
                max_x = x;
                max_y = y;
            }
        }
    }

    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, min_x, min_y) && has_many_siblings(other, min_x, min_y))
        || (has_many_siblings(img, max_x, max_y) && has_many_siblings(other, max_x, max_y))
}

/// Returns `true` if more than two neighbours of `(x1, y1)` share its exact colour.
fn has_many_siblings(img: &Frame<'_>, x1: u32, y1: u32) -> bool {
    let (x0, y0, x2, y2) = img.window(x1, y1);
    let center = img.pixel(x1, y1);

    let mut zeroes = u32::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            if img.pixel(x, y) == center {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
        px.repeat((width * height) as usize)
    }

    #[test]
    fn test_identical_buffers() {
        let a = solid(10, 10, [12, 34, 56, 255]);
        assert_eq!(count_mismatched(&a, &a.clone(), 10, 10, 0.1), 0);
    }

    #[test]
    fn test_black_vs_white_all_mismatch() {
        let a = solid(4, 4, [0, 0, 0, 255]);
        let b = solid(4, 4, [255, 255, 255, 255]);
        assert_eq!(count_mismatched(&a, &b, 4, 4, 0.1), 16);
    }

    #[test]
    fn test_small_colour_shift_within_threshold() {
        let a = solid(4, 4, [100, 100, 100, 255]);
        let b = solid(4, 4, [102, 101, 100, 255]);
        assert_eq!(count_mismatched(&a, &b, 4, 4, 0.1), 0);
        // Zero threshold counts any difference
        assert_eq!(count_mismatched(&a, &b, 4, 4, 0.0), 16);
    }

    #[test]
    fn test_transparent_blends_to_white() {
        let transparent = solid(2, 2, [0, 0, 0, 0]);
        let white = solid(2, 2, [255, 255, 255, 255]);
        assert_eq!(count_mismatched(&transparent, &white, 2, 2, 0.1), 0);
    }

    #[test]
    fn test_color_delta_sign() {
        let dark = [0u8, 0, 0, 255];
        let light = [255u8, 255, 255, 255];
        assert!(color_delta(&light, &dark, 0, 0, false) < 0.0);
        assert!(color_delta(&dark, &light, 0, 0, false) > 0.0);
        assert!(color_delta(&dark, &light, 0, 0, false) <= MAX_YIQ_DELTA);
    }

    #[test]
    fn test_antialiased_edge_pixel_not_counted() {
        // 5x5 white/black split with a grey column between them in `b` only.
        let width = 5;
        let height = 5;
        let mut a = Vec::new();
        let mut b = Vec::new();
        for _y in 0..height {
            for x in 0..width {
                let base: [u8; 4] = if x < 2 { [0, 0, 0, 255] } else { [255, 255, 255, 255] };
                a.extend_from_slice(&base);
                let smoothed = if x == 2 { [128, 128, 128, 255] } else { base };
                b.extend_from_slice(&smoothed);
            }
        }
        assert_eq!(count_mismatched(&a, &b, width, height, 0.1), 0);
    }
}

//! Color space conversions.
//!
//! Formulas follow the ones hosts use for light color handling: Tanner
//! Helland's approximation of the Planckian locus for color temperature,
//! the Philips Hue wide gamut matrix for CIE xy, and channel "max scaling"
//! when splitting white out of RGB.
//!
//! Byte outputs are rounded and clamped to `0..=255`.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use super::{ColorType, ColorValue, MAX_KELVIN, MIN_KELVIN};
use crate::error::ColorError;

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRD: f64 = 2.0 / 3.0;

fn to_byte(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn truncate_byte(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Scale `output` so its largest channel matches the largest of `input`.
fn match_max_scale<const N: usize>(input: &[u8], output: [f64; N]) -> [u8; N] {
    let max_in = f64::from(input.iter().copied().max().unwrap_or(0));
    let max_out = output.iter().copied().fold(0.0, f64::max);
    let factor = if max_out <= 0.0 { 0.0 } else { max_in / max_out };
    output.map(|channel| to_byte(channel * factor))
}

fn kelvin_to_mired(kelvin: f64) -> f64 {
    (1_000_000.0 / kelvin).floor()
}

fn mired_to_kelvin(mired: f64) -> f64 {
    (1_000_000.0 / mired).floor()
}

/// Approximate RGB of a black body at `kelvin`, each channel in `0.0..=255.0`.
///
/// The input is clamped to `1000..=40000` K.
#[must_use]
pub fn color_temperature_to_rgb(kelvin: f64) -> (f64, f64, f64) {
    let t = kelvin.clamp(1000.0, 40_000.0) / 100.0;
    let red = if t <= 66.0 {
        255.0
    } else {
        329.698_727_446 * (t - 60.0).powf(-0.133_204_759_2)
    };
    let green = if t <= 66.0 {
        99.470_802_586_1 * t.ln() - 161.119_568_166_1
    } else {
        288.122_169_528_3 * (t - 60.0).powf(-0.075_514_849_2)
    };
    let blue = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.517_731_223_1 * (t - 10.0).ln() - 305.044_792_730_7
    };
    (
        red.clamp(0.0, 255.0),
        green.clamp(0.0, 255.0),
        blue.clamp(0.0, 255.0),
    )
}

#[must_use]
pub fn rgbw_to_rgb([r, g, b, w]: [u8; 4]) -> [u8; 3] {
    let white = f64::from(w);
    let rgb = [
        f64::from(r) + white,
        f64::from(g) + white,
        f64::from(b) + white,
    ];
    match_max_scale(&[r, g, b, w], rgb)
}

#[must_use]
pub fn rgb_to_rgbw([r, g, b]: [u8; 3]) -> [u8; 4] {
    let w = r.min(g).min(b);
    let rgbw = [
        f64::from(r - w),
        f64::from(g - w),
        f64::from(b - w),
        f64::from(w),
    ];
    match_max_scale(&[r, g, b], rgbw)
}

/// Blend cold and warm white into RGB.
///
/// The white point is picked along the mired scale between `min_kelvin`
/// and `max_kelvin` according to the warm/cold ratio.
#[must_use]
pub fn rgbww_to_rgb([r, g, b, cw, ww]: [u8; 5], min_kelvin: u32, max_kelvin: u32) -> [u8; 3] {
    let max_mireds = kelvin_to_mired(f64::from(min_kelvin));
    let min_mireds = kelvin_to_mired(f64::from(max_kelvin));
    let whites = f64::from(cw) + f64::from(ww);
    let ratio = if whites > 0.0 {
        f64::from(ww) / whites
    } else {
        0.5
    };
    let mired = min_mireds + ratio * (max_mireds - min_mireds);
    let (wr, wg, wb) = color_temperature_to_rgb(mired_to_kelvin(mired));
    let level = f64::from(cw.max(ww)) / 255.0;
    let rgb = [
        f64::from(r) + wr * level,
        f64::from(g) + wg * level,
        f64::from(b) + wb * level,
    ];
    match_max_scale(&[r, g, b, cw, ww], rgb)
}

/// Split as much white as possible out of RGB, evenly between both whites.
#[must_use]
pub fn rgb_to_rgbww([r, g, b]: [u8; 3], min_kelvin: u32, max_kelvin: u32) -> [u8; 5] {
    let max_mireds = kelvin_to_mired(f64::from(min_kelvin));
    let min_mireds = kelvin_to_mired(f64::from(max_kelvin));
    let midpoint = min_mireds + (max_mireds - min_mireds) / 2.0;
    let (wr, wg, wb) = color_temperature_to_rgb(mired_to_kelvin(midpoint));
    let share = |channel: u8, white: f64| {
        if white > 0.0 {
            f64::from(channel) / white
        } else {
            0.0
        }
    };
    let level = share(r, wr).min(share(g, wg)).min(share(b, wb));
    let white = (level * 255.0).round();
    let rgbww = [
        f64::from(r) - wr * level,
        f64::from(g) - wg * level,
        f64::from(b) - wb * level,
        white,
        white,
    ];
    match_max_scale(&[r, g, b], rgbww)
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let range = max - min;
    if range <= 0.0 {
        return (0.0, 0.0, max);
    }
    let saturation = range / max;
    let hue = hue_from_channels(r, g, b, max, range);
    (hue, saturation, max)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

fn hue_from_channels(r: f64, g: f64, b: f64, max: f64, range: f64) -> f64 {
    let rc = (max - r) / range;
    let gc = (max - g) / range;
    let bc = (max - b) / range;
    #[allow(clippy::float_cmp)]
    let hue = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    (hue / 6.0).rem_euclid(1.0)
}

/// RGB in `0.0..=1.0` to hue, lightness, saturation in `0.0..=1.0`.
#[must_use]
pub fn rgb_to_hls(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let sum = max + min;
    let range = max - min;
    let lightness = sum / 2.0;
    if range <= 0.0 {
        return (0.0, lightness, 0.0);
    }
    let saturation = if lightness <= 0.5 {
        range / sum
    } else {
        range / (2.0 - sum)
    };
    let hue = hue_from_channels(r, g, b, max, range);
    (hue, lightness, saturation)
}

/// Inverse of [`rgb_to_hls`].
#[must_use]
pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s <= 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hls_channel(m1, m2, h + ONE_THIRD),
        hls_channel(m1, m2, h),
        hls_channel(m1, m2, h - ONE_THIRD),
    )
}

fn hls_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < TWO_THIRD {
        m1 + (m2 - m1) * (TWO_THIRD - hue) * 6.0
    } else {
        m1
    }
}

/// Hue (`0..=360`) and saturation (`0..=100`) at full value to RGB.
#[must_use]
pub fn hs_to_rgb(hue: f64, saturation: f64) -> [u8; 3] {
    let (r, g, b) = hsv_to_rgb(hue / 360.0, saturation / 100.0, 1.0);
    [to_byte(r * 255.0), to_byte(g * 255.0), to_byte(b * 255.0)]
}

#[must_use]
pub fn rgb_to_hs([r, g, b]: [u8; 3]) -> (f64, f64) {
    let (h, s, _) = rgb_to_hsv(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
    );
    (round_to(h * 360.0, 3), round_to(s * 100.0, 3))
}

/// CIE xy at full brightness to RGB.
#[must_use]
pub fn xy_to_rgb(x: f64, y: f64) -> [u8; 3] {
    let y = if y.abs() <= f64::EPSILON {
        y + 1e-11
    } else {
        y
    };
    let big_y = 1.0;
    let big_x = (big_y / y) * x;
    let big_z = (big_y / y) * (1.0 - x - y);

    let r = big_x * 1.656_492 - big_y * 0.354_851 - big_z * 0.255_038;
    let g = -big_x * 0.707_196 + big_y * 1.655_397 + big_z * 0.036_152;
    let b = big_x * 0.051_713 - big_y * 0.121_364 + big_z * 1.011_530;

    let reverse_gamma = |c: f64| {
        if c <= 0.003_130_8 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };
    let channels = [r, g, b].map(|c| reverse_gamma(c).max(0.0));
    let max = channels.iter().copied().fold(0.0, f64::max);
    let channels = if max > 1.0 {
        channels.map(|c| c / max)
    } else {
        channels
    };
    channels.map(|c| truncate_byte(c * 255.0))
}

#[must_use]
pub fn rgb_to_xy([r, g, b]: [u8; 3]) -> (f64, f64) {
    let gamma = |channel: u8| {
        let c = f64::from(channel) / 255.0;
        if c > 0.040_45 {
            ((c + 0.055) / 1.055).powf(2.4)
        } else {
            c / 12.92
        }
    };
    let (r, g, b) = (gamma(r), gamma(g), gamma(b));
    let big_x = r * 0.664_511 + g * 0.154_324 + b * 0.162_028;
    let big_y = r * 0.283_881 + g * 0.668_433 + b * 0.047_685;
    let big_z = r * 0.000_088 + g * 0.072_310 + b * 0.986_039;
    let sum = big_x + big_y + big_z;
    if sum <= 0.0 {
        return (0.0, 0.0);
    }
    (round_to(big_x / sum, 3), round_to(big_y / sum, 3))
}

/// Closest color temperature in `MIN_KELVIN..=MAX_KELVIN` for an RGB triple.
///
/// Scans in steps of 100 K, then refines by 1 K around the best hit,
/// minimising the Euclidean distance to [`color_temperature_to_rgb`].
#[must_use]
pub fn rgb_to_kelvin([r, g, b]: [u8; 3]) -> u32 {
    let target = (f64::from(r), f64::from(g), f64::from(b));
    let distance = |kelvin: u32| {
        let (cr, cg, cb) = color_temperature_to_rgb(f64::from(kelvin));
        (cr - target.0).powi(2) + (cg - target.1).powi(2) + (cb - target.2).powi(2)
    };

    let closest = |kelvins: &mut dyn Iterator<Item = u32>, start: (u32, f64)| {
        kelvins.fold(start, |best, kelvin| {
            let d = distance(kelvin);
            if d < best.1 { (kelvin, d) } else { best }
        })
    };

    let coarse = closest(
        &mut (MIN_KELVIN..=MAX_KELVIN).step_by(100),
        (MIN_KELVIN, f64::INFINITY),
    );
    let lo = coarse.0.saturating_sub(100).max(MIN_KELVIN);
    let hi = (coarse.0 + 100).min(MAX_KELVIN);
    closest(&mut (lo..=hi), coarse).0
}

/// Convert mireds to kelvin, clamped to `MIN_KELVIN..=MAX_KELVIN`.
///
/// # Errors
///
/// Returns [`ColorError::InvalidMireds`] when `mireds <= 0`.
#[allow(clippy::cast_precision_loss)]
pub fn mireds_to_kelvin(mireds: i64) -> Result<u32, ColorError> {
    if mireds <= 0 {
        return Err(ColorError::InvalidMireds(mireds));
    }
    let kelvin = (1_000_000.0 / mireds as f64).round();
    Ok((kelvin as u32).clamp(MIN_KELVIN, MAX_KELVIN))
}

/// Map any supported color value to 8-bit RGB.
///
/// Returns `None` when the value cannot be converted (non-finite
/// coordinates, non-positive mireds).
#[must_use]
pub fn convert_to_rgb(value: &ColorValue) -> Option<[u8; 3]> {
    match *value {
        ColorValue::Rgb(rgb) => Some(rgb),
        ColorValue::Rgbw(rgbw) => Some(rgbw_to_rgb(rgbw)),
        ColorValue::Rgbww(rgbww) => Some(rgbww_to_rgb(rgbww, MIN_KELVIN, MAX_KELVIN)),
        ColorValue::ColorTempKelvin(kelvin) => Some(kelvin_rgb(kelvin)),
        ColorValue::ColorTempMireds(mireds) => mireds_to_kelvin(mireds).ok().map(kelvin_rgb),
        ColorValue::Hs(h, s) => (h.is_finite() && s.is_finite()).then(|| hs_to_rgb(h, s)),
        ColorValue::Xy(x, y) => (x.is_finite() && y.is_finite()).then(|| xy_to_rgb(x, y)),
    }
}

fn kelvin_rgb(kelvin: u32) -> [u8; 3] {
    let (r, g, b) = color_temperature_to_rgb(f64::from(kelvin));
    [to_byte(r), to_byte(g), to_byte(b)]
}

/// Map 8-bit RGB back into the representation named by `color_type`.
///
/// Kelvin goes through [`rgb_to_kelvin`] and is only approximate.
#[must_use]
pub fn convert_rgb_to_original_type(color_type: ColorType, rgb: [u8; 3]) -> ColorValue {
    match color_type {
        ColorType::RgbColor => ColorValue::Rgb(rgb),
        ColorType::RgbwColor => ColorValue::Rgbw(rgb_to_rgbw(rgb)),
        ColorType::RgbwwColor => ColorValue::Rgbww(rgb_to_rgbww(rgb, MIN_KELVIN, MAX_KELVIN)),
        ColorType::HsColor => {
            let (h, s) = rgb_to_hs(rgb);
            ColorValue::Hs(round_to(h, 1), round_to(s, 1))
        }
        ColorType::XyColor => {
            let (x, y) = rgb_to_xy(rgb);
            ColorValue::Xy(round_to(x, 4), round_to(y, 4))
        }
        ColorType::ColorTempKelvin => ColorValue::ColorTempKelvin(rgb_to_kelvin(rgb)),
        ColorType::ColorTemp => {
            let kelvin = f64::from(rgb_to_kelvin(rgb));
            ColorValue::ColorTempMireds((1_000_000.0 / kelvin).round() as i64)
        }
    }
}

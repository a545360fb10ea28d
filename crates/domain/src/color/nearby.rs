//! Random perturbation of a base color.

use super::{ColorValue, convert_rgb_to_original_type, convert_to_rgb, hls_to_rgb, rgb_to_hls};

/// Return a color close to `value`.
///
/// Hue, lightness and saturation are each moved by a uniform offset in
/// `±range / 100`. Hue wraps around, lightness and saturation are clamped.
/// The result is expressed in the same representation as `value`; when the
/// value cannot be converted it is returned unchanged.
#[must_use]
pub fn find_nearby_color(value: &ColorValue, range: u8, rng: &mut fastrand::Rng) -> ColorValue {
    let Some([r, g, b]) = convert_to_rgb(value) else {
        return *value;
    };
    let (hue, lightness, saturation) = rgb_to_hls(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
    );

    let delta = f64::from(range) / 100.0;
    let mut offset = |channel: f64| channel - delta + rng.f64() * 2.0 * delta;
    let hue = offset(hue).rem_euclid(1.0);
    let lightness = offset(lightness).clamp(0.0, 1.0);
    let saturation = offset(saturation).clamp(0.0, 1.0);

    let (r, g, b) = hls_to_rgb(hue, lightness, saturation);
    let rgb = [r, g, b].map(to_byte);
    convert_rgb_to_original_type(value.color_type(), rgb)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

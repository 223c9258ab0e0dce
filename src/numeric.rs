//! Numeric helpers shared by the frame and latency computations

/// Round `value` to `places` decimal places.
///
/// Non-finite values are returned unchanged.
///
/// # Example
/// ```
/// use renderstats::numeric::round_to;
///
/// assert_eq!(round_to(16.6666, 2), 16.67);
/// assert_eq!(round_to(3.14159, 3), 3.142);
/// ```
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

/// Divide `numerator` by `denominator`, yielding zero when the denominator is zero.
pub fn divide_if_possible_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Arithmetic mean of a series, `None` for an empty one
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

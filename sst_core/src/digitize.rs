//! Histogram digitization: evenly spaced bin edges and value-to-bin lookup.

/// `num` evenly spaced values from `min` to `max` inclusive.
pub fn linspace(min: f64, max: f64, num: usize) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    if num == 1 {
        return vec![min];
    }
    let step = (max - min) / (num - 1) as f64;
    (0..num).map(|i| min + step * i as f64).collect()
}

/// Map each value to the bin index `i` with `edges[i] <= v < edges[i + 1]`.
/// Bins are right-open; values at or beyond the last edge land in the last
/// bin, and values below the first edge clamp to bin 0, so every index is in
/// `[0, edges.len() - 2]`.
pub fn digitize(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let last_bin = edges.len().saturating_sub(2);
    values
        .iter()
        .map(|&v| {
            let upper = edges.partition_point(|&e| e <= v);
            upper.saturating_sub(1).min(last_bin)
        })
        .collect()
}

/// Build a velocity bin grid with spacing `step` and digitize `values` into
/// it. The grid starts half a bin below the floored minimum and ends 1.5
/// bins above the floored maximum, which puts zero at the center of a bin
/// and guarantees every value fits.
pub fn digitize_velocity(values: &[f64], step: f64) -> (Vec<f64>, Vec<usize>) {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return (Vec::new(), Vec::new());
    };
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let mn = ((min / step).floor() - 0.5) * step;
    let mx = ((max / step).floor() + 1.5) * step;
    let num = ((mx - mn) / step).round() as usize + 1;
    let edges = linspace(mn, mx, num);
    let indices = digitize(values, &edges);
    (edges, indices)
}

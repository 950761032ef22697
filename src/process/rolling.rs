//! Per-series window helpers used by the transform.

/// Day-over-day change. The first element has nothing to diff against and is 0.
pub fn diff_from_first(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            out.push(0.0);
        } else {
            out.push(v - values[i - 1]);
        }
    }
    out
}

/// Trailing arithmetic mean over `window` values ending at (and including)
/// each index. `None` until a full window is available.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                let slice = &values[i + 1 - window..=i];
                Some(slice.iter().sum::<f64>() / window as f64)
            }
        })
        .collect()
}

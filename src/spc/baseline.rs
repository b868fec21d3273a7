// XmR baseline calculation: mean of X and mean moving range over an ordered window.

use crate::error::SpcError;
use crate::models::Baseline;

/// Fewest values from which a moving range can be derived.
pub const MIN_BASELINE_VALUES: usize = 2;

/// Derives control limits from `values` (oldest first). Pure; fails rather than
/// producing zero limits when the window is too short.
pub fn compute(values: &[f64]) -> Result<Baseline, SpcError> {
    if values.len() < MIN_BASELINE_VALUES {
        return Err(SpcError::InsufficientData {
            needed: MIN_BASELINE_VALUES,
            got: values.len(),
        });
    }

    let cl_x = mean(values);
    let moving_ranges: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let cl_mr = mean(&moving_ranges);

    Ok(Baseline::from_center(cl_x, cl_mr))
}

fn mean(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}

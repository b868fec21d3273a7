// XmR control limits for one (machine, metric) stream

use serde::{Deserialize, Serialize};

/// d2-derived constant for the individuals chart: 3 / 1.128.
pub const XMR_LIMIT_FACTOR: f64 = 2.66;
/// D4 constant for the moving-range chart (n = 2).
pub const MR_LIMIT_FACTOR: f64 = 3.268;

/// Control limits derived from a window of accepted values.
/// Invariant: 0 <= lcl_x <= cl_x <= ucl_x.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub cl_x: f64,
    pub ucl_x: f64,
    pub lcl_x: f64,
    pub cl_mr: f64,
    pub ucl_mr: f64,
}

impl Baseline {
    /// Builds the limits from a center line and mean moving range.
    pub fn from_center(cl_x: f64, cl_mr: f64) -> Self {
        Self {
            cl_x,
            ucl_x: cl_x + XMR_LIMIT_FACTOR * cl_mr,
            lcl_x: (cl_x - XMR_LIMIT_FACTOR * cl_mr).max(0.0),
            cl_mr,
            ucl_mr: MR_LIMIT_FACTOR * cl_mr,
        }
    }

    /// One sigma of the individuals chart, taken from the upper half-band.
    pub fn sigma(&self) -> f64 {
        (self.ucl_x - self.cl_x) / 3.0
    }
}

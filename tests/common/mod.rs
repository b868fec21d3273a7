// Shared test helpers

#![allow(dead_code)]

use spcmon::models::*;

pub const MACHINE: &str = "m1";

pub fn sample(timestamp: u64, metric: MetricName, value: f64) -> Sample {
    Sample::new(timestamp, MACHINE, metric, value)
}

pub fn cpu_key() -> MetricKey {
    MetricKey::new(MACHINE, MetricName::Cpu)
}

/// Baseline used by the spike scenario: cl 25, ucl 35.8, lcl 14.6.
pub fn spike_baseline() -> Baseline {
    Baseline {
        cl_x: 25.0,
        ucl_x: 35.8,
        lcl_x: 14.6,
        cl_mr: 4.06,
        ucl_mr: 13.27,
    }
}

/// cl 25, mR 2: ucl 30.32, lcl 19.68, sigma ~1.773, ucl_mr 6.536.
pub fn narrow_baseline() -> Baseline {
    Baseline::from_center(25.0, 2.0)
}

/// In-control values around 25 that never form a run, trend or oscillation.
pub fn in_control_cycle(i: usize) -> f64 {
    [24.0, 26.0, 25.0][i % 3]
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

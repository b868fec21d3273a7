// Priority-ordered pattern tests over an XmR chart.
//
// The evaluated window is the trailing history plus the current value. Tests are
// checked in a fixed order and the first match is returned; a test that needs more
// points than the window holds falls through to the next one.

use crate::models::{Baseline, Detection, EvaluationResult, trailing_offsets};

use super::history::LONGEST_TEST_WINDOW;

/// Saturation threshold in percent.
pub const SATURATION_LIMIT: f64 = 100.0;
/// Test 4 run lengths, longest first so the widest run is reported.
pub const RUN_LENGTHS: [usize; 3] = [9, 8, 7];
pub const OSCILLATION_POINTS: usize = 14;
pub const TREND_POINTS: usize = 6;
pub const ZONE_A_POINTS: usize = 3;
pub const ZONE_A_HITS: usize = 2;
pub const ZONE_B_POINTS: usize = 5;
pub const ZONE_B_HITS: usize = 4;

/// Classifies `value` against `baseline`. `trailing_history` holds previously accepted
/// values, oldest first, and must not include `value`.
pub fn evaluate(
    value: f64,
    previous_value: Option<f64>,
    trailing_history: &[f64],
    baseline: &Baseline,
) -> EvaluationResult {
    let start = trailing_history
        .len()
        .saturating_sub(LONGEST_TEST_WINDOW - 1);
    let mut window: Vec<f64> = Vec::with_capacity(LONGEST_TEST_WINDOW);
    window.extend_from_slice(&trailing_history[start..]);
    window.push(value);

    let (detection, involved) = classify(value, previous_value, &window, baseline);
    EvaluationResult::new(detection, trailing_offsets(involved))
}

/// Saturation does not depend on control limits, so it is reported even before a
/// stream has a baseline.
pub fn saturation(value: f64) -> Option<EvaluationResult> {
    (value >= SATURATION_LIMIT).then(|| EvaluationResult::new(Detection::Saturation, trailing_offsets(1)))
}

/// Returns the matched test and how many trailing points of the window it involves.
fn classify(
    value: f64,
    previous_value: Option<f64>,
    window: &[f64],
    baseline: &Baseline,
) -> (Detection, usize) {
    if value >= SATURATION_LIMIT {
        return (Detection::Saturation, 1);
    }

    if value > baseline.ucl_x || value < baseline.lcl_x {
        return (Detection::LimitViolation, 1);
    }

    if let Some(prev) = previous_value
        && (value - prev).abs() > baseline.ucl_mr
    {
        return (Detection::ExcessiveVariability, 2);
    }

    for length in RUN_LENGTHS {
        if let Some(points) = last_n(window, length)
            && is_one_sided_run(points, baseline.cl_x)
        {
            return (Detection::Run { length }, length);
        }
    }

    if let Some(points) = last_n(window, OSCILLATION_POINTS)
        && is_alternating(points)
    {
        return (Detection::Oscillation, OSCILLATION_POINTS);
    }

    if let Some(points) = last_n(window, TREND_POINTS)
        && is_monotonic(points)
    {
        return (Detection::Trend, TREND_POINTS);
    }

    let sigma = baseline.sigma();

    if let Some(points) = last_n(window, ZONE_A_POINTS)
        && beyond_band(points, baseline.cl_x, 2.0 * sigma, ZONE_A_HITS)
    {
        return (Detection::ZoneA, ZONE_A_POINTS);
    }

    if let Some(points) = last_n(window, ZONE_B_POINTS)
        && beyond_band(points, baseline.cl_x, sigma, ZONE_B_HITS)
    {
        return (Detection::ZoneB, ZONE_B_POINTS);
    }

    (Detection::InControl, 0)
}

fn last_n(window: &[f64], n: usize) -> Option<&[f64]> {
    if window.len() < n {
        return None;
    }
    Some(&window[window.len() - n..])
}

fn is_one_sided_run(points: &[f64], cl: f64) -> bool {
    points.iter().all(|v| *v > cl) || points.iter().all(|v| *v < cl)
}

/// Every consecutive step changes direction; a flat step breaks the pattern.
fn is_alternating(points: &[f64]) -> bool {
    let steps: Vec<f64> = points.windows(2).map(|w| w[1] - w[0]).collect();
    if steps.iter().any(|d| *d == 0.0) {
        return false;
    }
    steps.windows(2).all(|s| (s[0] > 0.0) != (s[1] > 0.0))
}

fn is_monotonic(points: &[f64]) -> bool {
    let rising = points.windows(2).all(|w| w[1] > w[0]);
    let falling = points.windows(2).all(|w| w[1] < w[0]);
    rising || falling
}

/// At least `hits` points strictly beyond cl ± band, all on the same side.
fn beyond_band(points: &[f64], cl: f64, band: f64, hits: usize) -> bool {
    let above = points.iter().filter(|v| **v > cl + band).count();
    let below = points.iter().filter(|v| **v < cl - band).count();
    above >= hits || below >= hits
}

// Composite P-Score aggregation

mod common;

use common::approx_eq;
use proptest::prelude::*;
use spcmon::models::{MetricName, Weights};
use spcmon::spc::{MetricScores, aggregate};

fn scores(cpu: Option<f64>, ram: Option<f64>, io_wait: Option<f64>) -> MetricScores {
    MetricScores { cpu, ram, io_wait }
}

#[test]
fn weighted_mean_with_default_weights() {
    let s = scores(Some(1.0), Some(0.6), Some(0.7));
    let p = aggregate(&s, Some(&Weights::default())).unwrap();
    assert!(approx_eq(p, 0.785), "p_score {}", p);
}

#[test]
fn all_in_control_is_one() {
    let s = scores(Some(1.0), Some(1.0), Some(1.0));
    assert_eq!(aggregate(&s, Some(&Weights::default())), Some(1.0));
}

#[test]
fn missing_weights_use_equal_mean() {
    let s = scores(Some(1.0), Some(0.6), Some(0.7));
    let p = aggregate(&s, None).unwrap();
    assert!(approx_eq(p, 0.767), "p_score {}", p);
}

#[test]
fn invalid_weights_use_equal_mean() {
    let s = scores(Some(1.0), Some(0.4), None);
    for bad in [
        Weights { cpu: 1.5, ram: 0.35, io_wait: 0.25 },
        Weights { cpu: -0.1, ram: 0.35, io_wait: 0.25 },
        Weights { cpu: f64::NAN, ram: 0.35, io_wait: 0.25 },
    ] {
        let p = aggregate(&s, Some(&bad)).unwrap();
        assert!(approx_eq(p, 0.7), "weights {:?} gave {}", bad, p);
    }
}

#[test]
fn zero_weights_for_scored_metrics_use_equal_mean() {
    let w = Weights { cpu: 0.0, ram: 0.0, io_wait: 1.0 };
    let s = scores(Some(0.1), Some(0.7), None);
    let p = aggregate(&s, Some(&w)).unwrap();
    assert!(approx_eq(p, 0.4), "p_score {}", p);
}

#[test]
fn zero_weight_metric_is_ignored() {
    let w = Weights { cpu: 0.5, ram: 0.0, io_wait: 0.5 };
    let s = scores(Some(1.0), Some(0.0), Some(0.6));
    let p = aggregate(&s, Some(&w)).unwrap();
    assert!(approx_eq(p, 0.8), "p_score {}", p);
}

#[test]
fn unscored_metrics_are_excluded_and_renormalized() {
    // Only cpu and ram scored: (0.4*1.0 + 0.35*0.2) / 0.75
    let s = scores(Some(1.0), Some(0.2), None);
    let p = aggregate(&s, Some(&Weights::default())).unwrap();
    assert!(approx_eq(p, 0.627), "p_score {}", p);
}

#[test]
fn no_scores_gives_none() {
    assert_eq!(aggregate(&MetricScores::default(), Some(&Weights::default())), None);
    assert_eq!(aggregate(&MetricScores::default(), None), None);
}

#[test]
fn result_is_rounded_to_three_decimals() {
    let s = scores(Some(1.0), Some(0.1), Some(0.2));
    // Equal mean 0.4333...
    assert_eq!(aggregate(&s, None), Some(0.433));
}

#[test]
fn metric_scores_get_and_set() {
    let mut s = MetricScores::default();
    s.set(MetricName::IoWait, Some(0.6));
    assert_eq!(s.get(MetricName::IoWait), Some(0.6));
    assert_eq!(s.get(MetricName::Cpu), None);
    s.set(MetricName::IoWait, None);
    assert_eq!(s, MetricScores::default());
}

fn score_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        prop::sample::select(vec![0.0, 0.1, 0.2, 0.4, 0.6, 0.7, 1.0]).prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn p_score_stays_within_unit_interval(
        cpu in score_strategy(),
        ram in score_strategy(),
        io_wait in score_strategy(),
        wc in 0.0f64..=1.0,
        wr in 0.0f64..=1.0,
        wi in 0.0f64..=1.0,
    ) {
        let s = scores(cpu, ram, io_wait);
        let w = Weights { cpu: wc, ram: wr, io_wait: wi };
        let p = aggregate(&s, Some(&w));
        let any_scored = cpu.is_some() || ram.is_some() || io_wait.is_some();
        prop_assert_eq!(p.is_some(), any_scored);
        if let Some(p) = p {
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}

// Wire shapes of samples, records and monitor events

use serde_json::json;
use spcmon::models::*;

#[test]
fn sample_uses_camel_case_and_snake_case_metric() {
    let s = Sample::new(1_700_000_000_000, "web-1", MetricName::IoWait, 3.5);
    let v = serde_json::to_value(&s).unwrap();
    assert_eq!(
        v,
        json!({
            "timestamp": 1_700_000_000_000u64,
            "machineId": "web-1",
            "metricName": "io_wait",
            "value": 3.5
        })
    );
    let back: Sample = serde_json::from_value(v).unwrap();
    assert_eq!(back, s);
}

#[test]
fn metric_name_parse_and_display() {
    for m in MetricName::ALL {
        assert_eq!(MetricName::parse(m.as_str()), Some(m));
        assert_eq!(m.to_string(), m.as_str());
    }
    assert_eq!(MetricName::parse("disk"), None);
    assert_eq!(MetricKey::new("web-1", MetricName::Ram).to_string(), "web-1/ram");
}

#[test]
fn baseline_from_center_applies_xmr_factors() {
    let b = Baseline::from_center(50.0, 4.0);
    assert!((b.ucl_x - (50.0 + XMR_LIMIT_FACTOR * 4.0)).abs() < 1e-9);
    assert!((b.lcl_x - (50.0 - XMR_LIMIT_FACTOR * 4.0)).abs() < 1e-9);
    assert!((b.ucl_mr - MR_LIMIT_FACTOR * 4.0).abs() < 1e-9);
    assert!((b.sigma() - XMR_LIMIT_FACTOR * 4.0 / 3.0).abs() < 1e-9);
    // Lower limit is floored at zero.
    assert_eq!(Baseline::from_center(2.0, 4.0).lcl_x, 0.0);
}

#[test]
fn detection_scores_and_flags() {
    let cases = [
        (Detection::Saturation, 0.0, true, false, Some("Saturation"), Status::Critical),
        (Detection::LimitViolation, 0.1, true, false, Some("Test 1"), Status::Critical),
        (Detection::ExcessiveVariability, 0.2, true, false, Some("Test mR"), Status::Critical),
        (Detection::Run { length: 8 }, 0.4, false, true, Some("Test 4"), Status::Shift),
        (Detection::Oscillation, 0.4, false, true, Some("Test 7"), Status::Shift),
        (Detection::Trend, 0.4, false, true, Some("Test 8"), Status::Shift),
        (Detection::ZoneA, 0.6, false, false, Some("Test 2"), Status::Warning),
        (Detection::ZoneB, 0.7, false, false, Some("Test 3"), Status::Warning),
        (Detection::InControl, 1.0, false, false, None, Status::InControl),
    ];
    for (d, score, critical, recalc, name, status) in cases {
        assert_eq!(d.score(), score, "{:?}", d);
        assert_eq!(d.is_critical(), critical, "{:?}", d);
        assert_eq!(d.requires_recalc(), recalc, "{:?}", d);
        assert_eq!(d.test_name(), name, "{:?}", d);
        assert_eq!(d.status(), status, "{:?}", d);
    }
}

#[test]
fn evaluation_result_mirrors_detection() {
    let r = EvaluationResult::new(Detection::Trend, trailing_offsets(6));
    assert_eq!(r.score, 0.4);
    assert!(r.requires_recalc);
    assert_eq!(r.involved_offsets, vec![-6, -5, -4, -3, -2, -1]);
    assert!(trailing_offsets(0).is_empty());
}

#[test]
fn detection_serializes_with_kind_tag() {
    let v = serde_json::to_value(Detection::Run { length: 9 }).unwrap();
    assert_eq!(v, json!({"kind": "run", "length": 9}));
    let v = serde_json::to_value(Status::InControl).unwrap();
    assert_eq!(v, json!("in_control"));
}

#[test]
fn monitor_events_are_tagged_by_type() {
    let key = MetricKey::new("m1", MetricName::Cpu);
    let paused = MonitorEvent::Paused {
        key: key.clone(),
        timestamp: 5,
    };
    assert_eq!(
        serde_json::to_value(&paused).unwrap(),
        json!({"type": "paused", "key": {"machineId": "m1", "metricName": "cpu"}, "timestamp": 5})
    );

    let resumed = MonitorEvent::Resumed { key, forced: true };
    let v = serde_json::to_value(&resumed).unwrap();
    assert_eq!(v["type"], "resumed");
    assert_eq!(v["forced"], true);
}

#[test]
fn composite_record_shape() {
    let record = EvaluationRecord {
        timestamp: 7,
        machine_id: "m1".into(),
        metric_name: MetricName::Cpu,
        value: 85.0,
        moving_range: Some(60.0),
        status: Status::Critical,
        score: Some(0.1),
        is_critical: true,
        test_name: Some("Test 1"),
        involved_offsets: vec![-1],
        pause_state: PauseState::live(),
    };
    let composite = MonitorEvent::Composite(CompositeRecord {
        timestamp: 7,
        machine_id: "m1".into(),
        metrics: vec![record],
        p_score: Some(0.1),
    });
    let v = serde_json::to_value(&composite).unwrap();
    assert_eq!(v["type"], "composite");
    assert_eq!(v["pScore"], 0.1);
    let m = &v["metrics"][0];
    assert_eq!(m["metricName"], "cpu");
    assert_eq!(m["movingRange"], 60.0);
    assert_eq!(m["testName"], "Test 1");
    assert_eq!(m["isCritical"], true);
    assert_eq!(m["involvedOffsets"], json!([-1]));
    assert_eq!(
        m["pauseState"],
        json!({"paused": false, "pointsCollectedSincePause": 0})
    );
}

#[test]
fn weights_validity() {
    assert!(Weights::default().is_valid());
    assert!(!Weights { cpu: 1.01, ram: 0.0, io_wait: 0.0 }.is_valid());
    assert!(!Weights { cpu: 0.5, ram: f64::INFINITY, io_wait: 0.0 }.is_valid());
    assert_eq!(Weights::default().get(MetricName::IoWait), 0.25);
}

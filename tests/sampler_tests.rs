// Replay source grouping and the JSON-lines reporter

use spcmon::models::{MetricKey, MetricName, MonitorEvent, Sample};
use spcmon::reporter;
use spcmon::sampler::{ReplaySource, SampleSource};
use tokio::sync::broadcast;

fn line(ts: u64, machine: &str, metric: &str, value: f64) -> String {
    format!(
        r#"{{"timestamp":{},"machineId":"{}","metricName":"{}","value":{}}}"#,
        ts, machine, metric, value
    )
}

#[tokio::test]
async fn replay_groups_consecutive_machine_and_timestamp() {
    let content = [
        line(1, "a", "cpu", 10.0),
        line(1, "a", "ram", 20.0),
        line(1, "b", "cpu", 30.0),
        String::new(),
        line(2, "a", "cpu", 11.0),
        line(2, "a", "io_wait", 1.5),
    ]
    .join("\n");
    let mut source = ReplaySource::parse(&content);
    assert_eq!(source.remaining(), 3);

    let first = source.next_group().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|s| s.machine_id == "a" && s.timestamp == 1));
    let second = source.next_group().await.unwrap().unwrap();
    assert_eq!(second, vec![Sample::new(1, "b", MetricName::Cpu, 30.0)]);
    let third = source.next_group().await.unwrap().unwrap();
    assert_eq!(third[1].metric_name, MetricName::IoWait);
    assert!(source.next_group().await.unwrap().is_none());
}

#[tokio::test]
async fn replay_skips_malformed_lines() {
    let content = [
        line(1, "a", "cpu", 10.0),
        "not json".to_string(),
        line(1, "a", "disk", 5.0),
        r#"{"timestamp":1,"machineId":"a"}"#.to_string(),
        line(1, "a", "ram", 20.0),
    ]
    .join("\n");
    let mut source = ReplaySource::parse(&content);
    assert_eq!(source.remaining(), 1);
    let group = source.next_group().await.unwrap().unwrap();
    assert_eq!(group.len(), 2);
}

#[tokio::test]
async fn replay_open_reads_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("samples.jsonl");
    std::fs::write(&path, [line(1, "a", "cpu", 1.0), line(2, "a", "cpu", 2.0)].join("\n")).unwrap();
    let source = ReplaySource::open(&path).await.unwrap();
    assert_eq!(source.remaining(), 2);
    assert!(ReplaySource::open(dir.path().join("missing.jsonl")).await.is_err());
}

#[tokio::test]
async fn reporter_writes_one_json_line_per_event() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let file = tokio::fs::File::create(&path).await.unwrap();
    let (tx, rx) = broadcast::channel(16);
    let handle = reporter::spawn(rx, file);

    let key = MetricKey::new("m1", MetricName::Cpu);
    tx.send(MonitorEvent::Paused {
        key: key.clone(),
        timestamp: 10,
    })
    .unwrap();
    tx.send(MonitorEvent::Resumed { key, forced: true }).unwrap();
    drop(tx);
    handle.await.unwrap();

    let out = tokio::fs::read_to_string(&path).await.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["type"], "paused");
    assert_eq!(first["timestamp"], 10);
    assert!(lines[1].contains(r#""type":"resumed""#));
}

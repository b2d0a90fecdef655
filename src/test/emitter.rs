use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::experiment::{Metric, ResultEmitter};
use crate::sim::SimTime;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "tcpcc-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ))
}

#[test]
fn file_emitter_writes_two_columns_per_metric() {
    let dir = unique_temp_dir("emitter");
    let emitter = ResultEmitter::create(&dir, "wired").expect("create outputs");
    emitter.emit(Metric::Cwnd, SimTime::from_millis(9), 10_000.0);
    emitter.emit(Metric::Cwnd, SimTime::from_millis(20), 11_000.0);
    emitter.emit(Metric::Throughput, SimTime::from_millis(10), 0.0);
    let counts = emitter.finish().expect("finish");
    assert_eq!((counts.cwnd, counts.ssthresh, counts.throughput), (2, 0, 1));

    let cwnd = fs::read_to_string(dir.join("wired.cwnd")).expect("read cwnd");
    assert_eq!(cwnd, "0.009 10000\n0.02 11000\n");
    let ssthresh = fs::read_to_string(dir.join("wired.ssthresh")).expect("read ssthresh");
    assert!(ssthresh.is_empty());
    let tput = fs::read_to_string(dir.join("wired.throughput")).expect("read throughput");
    assert_eq!(tput, "0.01 0\n");
    assert_eq!(emitter.paths().len(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn reopening_outputs_truncates_previous_run() {
    let dir = unique_temp_dir("emitter-truncate");
    let first = ResultEmitter::create(&dir, "x").expect("create");
    first.emit(Metric::Throughput, SimTime::from_secs(1), 5.0);
    first.finish().expect("finish");
    drop(first);

    let second = ResultEmitter::create(&dir, "x").expect("create again");
    second.finish().expect("finish");
    let tput = fs::read_to_string(dir.join("x.throughput")).expect("read");
    assert!(tput.is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn memory_emitter_keeps_write_order_across_handles() {
    let emitter = ResultEmitter::in_memory();
    let cwnd = emitter.handle(Metric::Cwnd);
    let tput = emitter.handle(Metric::Throughput);
    cwnd.record(SimTime(1), 1.0);
    tput.record(SimTime(2), 2.0);
    cwnd.record(SimTime(3), 3.0);

    let samples = emitter.samples();
    let metrics: Vec<Metric> = samples.iter().map(|s| s.metric).collect();
    assert_eq!(metrics, vec![Metric::Cwnd, Metric::Throughput, Metric::Cwnd]);
    assert_eq!(cwnd.count(), 2);
    assert_eq!(emitter.finish().expect("finish").throughput, 1);
}

#[test]
fn create_fails_when_output_dir_is_a_file() {
    let dir = unique_temp_dir("emitter-file");
    fs::create_dir_all(&dir).expect("create dir");
    let file = dir.join("not-a-dir");
    fs::write(&file, "x").expect("write");
    assert!(ResultEmitter::create(&file, "wired").is_err());
    let _ = fs::remove_dir_all(&dir);
}

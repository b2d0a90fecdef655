use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "tcpcc-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn parse_columns(path: &Path) -> Vec<(f64, f64)> {
    let raw = fs::read_to_string(path).expect("read output");
    raw.lines()
        .map(|line| {
            let mut cols = line.split_whitespace();
            let t: f64 = cols.next().expect("time column").parse().expect("time");
            let v: f64 = cols.next().expect("value column").parse().expect("value");
            assert!(cols.next().is_none(), "expected two columns: {line:?}");
            (t, v)
        })
        .collect()
}

fn total_rx_line(stdout: &str) -> u64 {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Total Bytes Received from Client: "))
        .expect("summary line")
        .trim()
        .parse()
        .expect("byte count")
}

#[test]
fn wired_run_writes_three_series_and_summary() {
    let dir = unique_temp_dir("cli-wired");
    let output = Command::new(env!("CARGO_BIN_EXE_tcp_experiment"))
        .args([
            "--variant",
            "wired",
            "--duration-secs",
            "3",
            "--out-dir",
            dir.to_str().unwrap(),
        ])
        .output()
        .expect("run tcp_experiment");
    assert!(
        output.status.success(),
        "tcp_experiment failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let total = total_rx_line(&stdout);
    assert!(total > 0);

    let cwnd = parse_columns(&dir.join("wired.cwnd"));
    let ssthresh = parse_columns(&dir.join("wired.ssthresh"));
    let tput = parse_columns(&dir.join("wired.throughput"));
    assert_eq!(cwnd.first().map(|s| s.1), Some(10_000.0));
    assert_eq!(ssthresh.first().map(|s| s.1), Some(4_294_967_295.0));
    assert_eq!(tput.len(), 30);
    assert!(tput.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(tput.iter().all(|s| s.1 >= 0.0));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn config_file_sets_prefix_and_unit() {
    let dir = unique_temp_dir("cli-config");
    let config = write_file(
        &dir,
        "experiment.json",
        r#"
{
    "name": "cell",
    "topology": { "kind": "wireless" },
    "traffic": { "data_rate": "100Mbps", "duration_secs": 2 },
    "sampling": { "interval_ms": 200, "unit": "mbps" }
}
        "#,
    );
    let out = dir.join("out");
    let output = Command::new(env!("CARGO_BIN_EXE_tcp_experiment"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--out-dir",
            out.to_str().unwrap(),
            "--seed",
            "3",
        ])
        .output()
        .expect("run tcp_experiment");
    assert!(
        output.status.success(),
        "tcp_experiment failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let tput = parse_columns(&out.join("cell.throughput"));
    assert_eq!(tput.len(), 10);
    // 单位为 Mbps：数值远小于物理速率
    assert!(tput.iter().all(|s| s.1 < 100.0));
    assert!(out.join("cell.cwnd").exists());
    assert!(out.join("cell.ssthresh").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_fails_before_running() {
    let dir = unique_temp_dir("cli-invalid");
    let config = write_file(
        &dir,
        "bad.json",
        r#"{ "topology": { "kind": "wired" }, "traffic": { "congestion_control": "cubic" } }"#,
    );
    let out = dir.join("out");
    let output = Command::new(env!("CARGO_BIN_EXE_tcp_experiment"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--out-dir",
            out.to_str().unwrap(),
        ])
        .output()
        .expect("run tcp_experiment");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cubic"));
    assert!(!out.join("wired.throughput").exists());

    let _ = fs::remove_dir_all(&dir);
}

//! Result-log behaviour across invocations
//!
//! The kernel CSV is an append-only history: the first write creates parent
//! directories and one header, later writes add exactly one data line each.

use hwprobe::clock::ReferenceClock;
use hwprobe::config::KernelBenchConfig;
use hwprobe::history;
use hwprobe::kernels::Kernel;
use hwprobe::runner::run_kernel_bench;
use hwprobe::sink::{now_timestamp, CsvSink, KernelRow};
use hwprobe::HwprobeError;

const HEADER: &str = "timestamp,kernel,dtype,N,stride,misalign,variant,time_ms,gflops,cpe";

fn log_one(cfg: &KernelBenchConfig, clock: &ReferenceClock) {
    let result = run_kernel_bench(cfg, clock).expect("benchmark runs");
    CsvSink::<KernelRow>::new(&cfg.csv_path)
        .append_one(&result.to_row(now_timestamp()))
        .expect("row appended");
}

#[test]
fn test_new_file_gets_header_then_one_line_per_invocation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does/not/exist/yet.csv");
    let cfg = KernelBenchConfig::new().with_n(512).with_csv_path(&path);

    log_one(&cfg, &ReferenceClock::unknown());
    let first = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = first.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], HEADER);

    log_one(&cfg, &ReferenceClock::from_ghz(Some(2.5)));
    let second = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = second.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines.iter().filter(|l| **l == HEADER).count(), 1);
    assert!(second.starts_with(&first));
}

#[test]
fn test_rows_parse_back_with_na() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    let cfg = KernelBenchConfig::new()
        .with_kernel(Kernel::Mul)
        .with_n(256)
        .with_csv_path(&path);
    log_one(&cfg, &ReferenceClock::unknown());
    log_one(&cfg, &ReferenceClock::from_ghz(Some(3.0)));

    let text = std::fs::read_to_string(&path).unwrap();
    let first_data = text.lines().nth(1).unwrap();
    assert!(first_data.ends_with(",NA"));
    // timestamp column is "YYYY-MM-DD HH:MM:SS"
    let ts = first_data.split(',').next().unwrap();
    assert_eq!(ts.len(), 19);
    assert_eq!(&ts[4..5], "-");
    assert_eq!(&ts[10..11], " ");

    let rows = history::load_rows(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cpe, None);
    assert!(rows[1].cpe.is_some());
    assert_eq!(rows[1].kernel, "mul");
}

#[test]
fn test_header_only_history_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, format!("{HEADER}\n")).unwrap();
    assert!(matches!(
        history::load_rows(&path),
        Err(HwprobeError::EmptyHistory(p)) if p == path
    ));
}

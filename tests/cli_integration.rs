//! Runs the compiled binary against the synthetic demo and CSV input.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_portfolio-eval"))
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("portfolio-eval-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn demo_prints_report_and_writes_exports() {
    let dir = scratch_dir("demo");
    let daily = dir.join("daily.csv");
    let summary = dir.join("summary.csv");
    let report = dir.join("report.json");

    let output = bin()
        .args(["demo", "--days", "3", "--buildings", "2", "--preset", "cooling"])
        .arg("--daily-out")
        .arg(&daily)
        .arg("--summary-out")
        .arg(&summary)
        .arg("--report-out")
        .arg(&report)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("--- Metrics Report ---"));
    assert!(stdout.contains("[flatten]"));
    assert!(stdout.contains("[flatten-half]"));
    assert!(stdout.contains("Failed scenarios:      0"));

    let daily_csv = fs::read_to_string(&daily).unwrap();
    assert!(daily_csv.starts_with("scenario,date,metric,scope,value,status,timestamp"));
    assert!(fs::read_to_string(&summary).unwrap().lines().count() > 1);
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["season"], "cooling");

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn evaluate_reads_csv_scenarios() {
    let dir = scratch_dir("evaluate");
    let header = "building,timestamp,demand_kw,indoor_temp_c,pv_kw,battery_soc,battery_kw,heat_pump_kw,carbon_intensity,tariff\n";
    let write = |name: &str, kw: f64| {
        let mut csv = header.to_string();
        for h in 0..24 {
            csv.push_str(&format!(
                "A,2024-01-01T{h:02}:00:00+00:00,{kw},21.0,0,0.5,0,1,0.2,0.3\n"
            ));
        }
        let path = dir.join(name);
        fs::write(&path, csv).unwrap();
        path
    };
    let base = write("base.csv", 10.0);
    let flex = write("flex.csv", 8.0);

    let output = bin()
        .args(["evaluate", "--preset", "cooling", "--baseline"])
        .arg(&base)
        .arg("--flexible")
        .arg(format!("shed={}", flex.display()))
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[shed]"));
    assert!(stdout.contains("cost_change_percent:   20.00"));

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn unknown_preset_fails() {
    let output = bin().args(["demo", "--preset", "spring"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"));
}

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, tick_ms: u64) -> PathBuf {
    let toml = format!(
        r#"
[pins]
mixture_valve = 3
ph_valve = 4
nutrient_a_valve = 5
nutrient_b_valve = 6
emergency_stop = 17
lockout_led = 9

[dosing]
dose_amount_l = 1.0
flow_rate_lpm = 0.0
ratio_a_to_b_pct = 0.0
ph_dose_time_s = 0

[safety]
safety_timeout_limit_ms = 120000

[runner]
tick_ms = {tick_ms}
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_scenario(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("scenario.csv");
    fs::write(&path, body).unwrap();
    path
}

const EC_DOSE: &str = "at_ms,topic,payload
0,control/flow-rate-lpm,2
0,control/ratio-of-A-to-B-%,75
100,control/ec-dose,1
";

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["simulate"], 2, "--scenario", "stderr")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 100);

    let mut cmd = Command::cargo_bin("dosa").unwrap();
    cmd.arg("--config").arg(&cfg).args(args);
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn simulate_replays_an_ec_dose() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 100);
    let scenario = write_scenario(&dir, EC_DOSE);

    let out = Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["simulate", "--until-ms", "23000", "--scenario"])
        .arg(&scenario)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    for line in [
        "       0 status/nutrient-A-dosing-time-s 22500",
        "       0 status/nutrient-B-dosing-time-s 7500",
        "     200 status/nutrient-A-valve-pin true",
        "     200 status/nutrient-B-valve-pin true",
        "    7800 status/nutrient-B-valve-pin false",
        "   22800 status/nutrient-A-valve-pin false",
    ] {
        assert!(stdout.lines().any(|l| l == line), "missing {line:?} in:\n{stdout}");
    }
    assert!(!stdout.contains("lockout true"));
}

#[test]
fn simulate_json_lines_follow_the_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 100);
    let scenario = write_scenario(&dir, EC_DOSE);

    let out = Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["simulate", "--until-ms", "1000", "--scenario"])
        .arg(&scenario)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut seen = 0;
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON line");
        assert!(v["t_ms"].is_u64(), "t_ms in {line}");
        assert!(v["topic"].as_str().is_some_and(|t| t.starts_with("status/")));
        assert!(v["value"].is_boolean() || v["value"].is_u64(), "value in {line}");
        seen += 1;
    }
    assert!(seen >= 4, "expected timing and valve events, got {seen}");
}

#[test]
fn emergency_stop_row_locks_out_the_doser() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 100);
    let scenario = write_scenario(
        &dir,
        "at_ms,topic,payload
0,control/ph-dose-time-s,10
0,control/ph-dose,1
500,estop,pressed
1000,estop,released
",
    );

    Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["simulate", "--until-ms", "1500", "--scenario"])
        .arg(&scenario)
        .assert()
        .success()
        .stdout(predicate::str::contains("     100 status/ph-pin true"))
        .stdout(predicate::str::contains(
            "     500 status/doser-emergency-stop-lockout true",
        ))
        .stdout(predicate::str::contains("     500 status/ph-pin false"))
        .stdout(predicate::str::contains("    1000 status/emergency-stop-button false"));
}

#[test]
fn bad_scenario_header_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 100);
    let scenario = write_scenario(&dir, "time,topic,payload\n0,control/ec-dose,1\n");

    Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["simulate", "--scenario"])
        .arg(&scenario)
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Invalid headers in scenario CSV. Expected 'at_ms,topic,payload'.",
        ));
}

#[test]
fn duplicate_pins_are_rejected_before_anything_runs() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[pins]\nph_valve = 4\nnutrient_a_valve = 4\n").unwrap();

    Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("share pin 4"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[runner]\ntick_ms = 0\n").unwrap();

    let out = Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr
        .lines()
        .find(|l| l.starts_with('{') && l.contains("exit_code"))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 2);
}

#[test]
fn run_applies_stdin_commands_and_closes_valves_on_exit() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 10);

    assert_cmd::Command::cargo_bin("dosa")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "50"])
        .write_stdin("# operator\ncontrol/run-mixture 1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("status/mixture-pin true"))
        .stdout(predicate::str::contains("status/mixture-pin false"));
}

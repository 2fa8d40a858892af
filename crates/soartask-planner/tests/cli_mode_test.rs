use std::process::Command;

fn config_path() -> String {
    format!("{}/fixtures/sample_task.yaml", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn cli_mode_with_config_and_dry_run_works() {
    let binary_path = env!("CARGO_BIN_EXE_soartask");

    let output = Command::new(binary_path)
        .arg("--config")
        .arg(config_path())
        .arg("--dry-run")
        .arg("--log-level")
        .arg("error")
        .output()
        .expect("Failed to start soartask binary");

    assert!(
        output.status.success(),
        "Process exited with non-zero status: {}\nStdout: {}\nStderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn plan_then_show_round_trips_through_task_file() {
    let binary_path = env!("CARGO_BIN_EXE_soartask");
    let dir = tempfile::TempDir::new().expect("temp dir");
    let task_path = dir.path().join("sample.tsk");

    let plan = Command::new(binary_path)
        .arg("--config")
        .arg(config_path())
        .arg("--log-level")
        .arg("error")
        .arg("plan")
        .arg("--output")
        .arg(&task_path)
        .output()
        .expect("Failed to start soartask binary");
    assert!(plan.status.success(), "{}", String::from_utf8_lossy(&plan.stderr));
    assert!(task_path.exists());

    let show = Command::new(binary_path)
        .arg("--config")
        .arg(config_path())
        .arg("--log-level")
        .arg("error")
        .arg("show")
        .arg("--task")
        .arg(&task_path)
        .output()
        .expect("Failed to start soartask binary");
    assert!(show.status.success(), "{}", String::from_utf8_lossy(&show.stderr));

    let stdout = String::from_utf8_lossy(&show.stdout);
    assert!(stdout.contains("task: 4 points"), "{stdout}");
    assert!(stdout.contains("Zugspitze"));
    assert!(stdout.contains("AAT on"));
}

#[test]
fn missing_config_fails() {
    let binary_path = env!("CARGO_BIN_EXE_soartask");
    let output = Command::new(binary_path)
        .arg("--config")
        .arg("/nonexistent/soartask.yaml")
        .arg("--dry-run")
        .output()
        .expect("Failed to start soartask binary");
    assert!(!output.status.success());
}

#[test]
fn json_summary_is_machine_readable() {
    let binary_path = env!("CARGO_BIN_EXE_soartask");
    let output = Command::new(binary_path)
        .arg("--config")
        .arg(config_path())
        .arg("--log-level")
        .arg("error")
        .arg("--json")
        .output()
        .expect("Failed to start soartask binary");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary is json");
    assert_eq!(summary["aat_enabled"], serde_json::Value::Bool(true));
    assert_eq!(summary["points"].as_array().map(Vec::len), Some(4));
    assert_eq!(summary["points"][1]["name"], "Zugspitze");
}

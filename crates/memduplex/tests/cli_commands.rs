#![cfg(feature = "cli")]

use std::process::Command;

fn memduplex() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_memduplex"));
    cmd.env_remove("MEMDUPLEX_LOG_LEVEL");
    cmd
}

#[test]
fn pump_blocking_reports_json() {
    let output = memduplex()
        .args([
            "pump", "--bytes", "65536", "--chunk", "1000", "--read-buf", "333", "--format",
            "json",
        ])
        .output()
        .expect("pump should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json report");
    assert_eq!(report["kind"], "pump");
    assert_eq!(report["mode"], "blocking");
    assert_eq!(report["bytes"], 65536);
    assert_eq!(report["writes"], 66);
}

#[test]
fn pump_async_reports_json() {
    let output = memduplex()
        .args(["pump", "--bytes", "10000", "--async", "--format", "json"])
        .output()
        .expect("pump should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"mode\":\"async\""));
    assert!(stdout.contains("\"bytes\":10000"));
}

#[test]
fn echo_pretty_output() {
    let output = memduplex()
        .args(["echo", "--rounds", "20", "--payload", "8", "--format", "pretty"])
        .output()
        .expect("echo should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("echo: rounds=20 payload=8 echoed_bytes=160"));
}

#[test]
fn invalid_arguments_exit_with_usage_code() {
    let output = memduplex()
        .args(["pump", "--chunk", "0"])
        .output()
        .expect("pump should run");

    // clap reports argument errors with exit code 2.
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn version_prints_package_version() {
    let output = memduplex().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("memduplex {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn debug_logging_goes_to_stderr() {
    let output = memduplex()
        .args([
            "--log-level",
            "debug",
            "pump",
            "--bytes",
            "10",
            "--format",
            "json",
        ])
        .output()
        .expect("pump should run");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("endpoint disposed"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("endpoint disposed"));
}

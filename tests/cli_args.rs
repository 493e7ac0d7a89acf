//! CLI arg parsing tests for kannel-monitor
use std::process::Command;

fn run(args: &[&str]) -> (bool, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_kannel-monitor"))
        .args(args)
        .output()
        .expect("run kannel-monitor");
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (output.status.success(), text)
}

#[test]
fn test_help_lists_subcommands() {
    let (ok, text) = run(&["--help"]);
    assert!(ok, "kannel-monitor --help failed\n{text}");
    assert!(
        text.contains("serve") && text.contains("report") && text.contains("export"),
        "help text missing subcommands\n{text}"
    );
}

#[test]
fn test_serve_flags_long_and_short() {
    let (ok, text) = run(&["serve", "--help"]);
    assert!(ok, "serve --help failed\n{text}");
    assert!(
        text.contains("--config") && text.contains("-c") && text.contains("--port") && text.contains("-p"),
        "serve help missing --config/-c or --port/-p\n{text}"
    );
    assert!(text.contains("--assets-dir") && text.contains("--log-dir"));

    let (ok, _) = run(&["serve", "-c", "/tmp/monitor.toml", "-p", "9000", "--help"]);
    assert!(ok, "serve -c … -p … --help did not succeed");
}

#[test]
fn test_missing_config_fails() {
    let (ok, text) = run(&["report", "--config", "/nonexistent/kannel-monitor.toml"]);
    assert!(!ok, "report with a missing config should fail\n{text}");
}

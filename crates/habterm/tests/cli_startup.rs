use std::net::TcpListener;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unreachable_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral loopback port");
    let port = listener.local_addr().expect("read local addr").port();
    drop(listener);
    port
}

fn run_habterm(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_habterm"))
        .args(args)
        .env_remove("HABTERM_LOG")
        .output()
        .expect("run habterm")
}

fn unique_temp_file(prefix: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "habterm-{prefix}-{}-{nanos}.toml",
        std::process::id()
    ))
}

#[test]
fn unreachable_sitemap_fails_before_the_terminal_is_taken() {
    let port = unreachable_port().to_string();
    let output = run_habterm(&[
        "--ip",
        "127.0.0.1",
        "--remote-port",
        &port,
        "--timeout-ms",
        "500",
    ]);

    assert!(!output.status.success(), "expected connection failure");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Error: transport error"),
        "expected formatted transport error, stderr was: {stderr}"
    );
    assert!(
        !stderr.contains("\u{1b}[?1049h"),
        "alternate screen must not be entered, stderr was: {stderr}"
    );
}

#[test]
fn invalid_config_file_is_reported() {
    let path = unique_temp_file("bad-config");
    std::fs::write(&path, "[remote]\nhostname = \"hab\"\n").expect("write config");
    let output = run_habterm(&["--config", path.to_str().expect("utf-8 temp path")]);
    let _ = std::fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Error: invalid config"),
        "expected config error, stderr was: {stderr}"
    );
}

#[test]
fn empty_sitemap_flag_is_rejected() {
    let output = run_habterm(&["--sitemap", " "]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("--sitemap must not be empty"),
        "stderr was: {stderr}"
    );
}

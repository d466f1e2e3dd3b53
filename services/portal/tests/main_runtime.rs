#![cfg(unix)]

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

fn spawn_portal() -> std::process::Child {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_portal"));
    cmd.env("TESSERA_BIND", "127.0.0.1:0")
        .env("TESSERA_METRICS_BIND", "127.0.0.1:0")
        .env("TESSERA_STORAGE", "memory")
        .env_remove("TESSERA_CONFIG")
        .env_remove("TESSERA_SESSION_SEED")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .stdout(Stdio::null())
        .env_remove("TESSERA_BOOTSTRAP_ADMIN_EMAIL")
        .env_remove("TESSERA_BOOTSTRAP_ADMIN_PASSWORD")
        .stderr(Stdio::null());
    cmd.spawn().expect("spawn portal")
}

fn stop_with_sigint(child: &mut std::process::Child) {
    let status = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .expect("send SIGINT");
    assert!(status.success());
}

fn wait_for_exit(child: &mut std::process::Child, timeout: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("try_wait") {
            return status;
        }
        if Instant::now() >= deadline {
            child.kill().expect("kill on timeout");
            return child.wait().expect("wait after kill");
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn binary_starts_and_stops_on_sigint() {
    let mut child = spawn_portal();
    std::thread::sleep(Duration::from_millis(500));
    stop_with_sigint(&mut child);
    let status = wait_for_exit(&mut child, Duration::from_secs(3));
    assert!(status.success());
}

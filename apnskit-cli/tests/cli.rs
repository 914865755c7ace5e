//! End-to-end tests of the apnskit binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const P256_KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../apnskit-push/tests/fixtures/p256.pem");
const RSA_KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../apnskit-push/tests/fixtures/rsa.pem");
const NOPASS_P12: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../apnskit-push/tests/fixtures/nopass.p12");
const MODERN_P12: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../apnskit-push/tests/fixtures/modern.p12");

/// The binary, run in an empty directory with no `APNSKIT_*` settings.
fn apnskit(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("apnskit").unwrap();
    cmd.current_dir(dir.path()).env("APNSKIT_LOG_LEVEL", "off").env("NO_COLOR", "1");
    for (key, _) in std::env::vars() {
        if key.starts_with("APNSKIT_") && key != "APNSKIT_LOG_LEVEL" {
            cmd.env_remove(key);
        }
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

async fn run_blocking(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap()
}

#[test]
fn test_generate_token() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["auth", "generate-token", "--key-file", P256_KEY, "--key-id", "ABC123DEFG", "--team-id", "TEAM123456"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\n$").unwrap());
}

#[test]
fn test_generate_token_requires_flags() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["auth", "generate-token", "--key-file", P256_KEY])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--key-id"));
}

#[test]
fn test_generate_token_rejects_rsa_key() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["auth", "generate-token", "--key-file", RSA_KEY, "--key-id", "K", "--team-id", "T"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Key type error"));
}

#[test]
fn test_generate_token_missing_file() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["auth", "generate-token", "--key-file", "missing.p8", "--key-id", "K", "--team-id", "T"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_alert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/3/device/abc123"))
        .and(header("apns-topic", "com.example.app"))
        .and(header("apns-push-type", "alert"))
        .and(body_string(r#"{"aps":{"alert":"Hello","badge":3,"sound":"default"}}"#))
        .respond_with(ResponseTemplate::new(200).insert_header("apns-id", "123e4567-e89b"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = apnskit(&dir);
    cmd.args(["send", "alert", "--app-id", "com.example.app", "--device-token", "abc123"])
        .args(["--alert-text", "Hello", "--badge-count", "3", "--sound-name", "default"])
        .args(["--key-file", P256_KEY, "--key-id", "ABC123DEFG", "--team-id", "TEAM123456"])
        .args(["--endpoint", &server.uri()]);

    run_blocking(cmd)
        .await
        .success()
        .stdout("Notification sent successfully\nAPNS-ID: 123e4567-e89b\n");

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("Bearer "));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"reason":"BadDeviceToken"}"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = apnskit(&dir);
    cmd.args(["send", "alert", "--app-id", "com.example.app", "--device-token", "bad"])
        .args(["--alert-text", "Hello", "--endpoint", &server.uri()]);

    run_blocking(cmd)
        .await
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Operation failed with error: 400 BadDeviceToken"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_background_with_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("apns-push-type", "background"))
        .and(header("apns-priority", "5"))
        .and(body_string(r#"{"aps":{"content-available":1},"sync":"inbox"}"#))
        .respond_with(ResponseTemplate::new(200).insert_header("apns-id", "bg-1"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = apnskit(&dir);
    cmd.args(["send", "background", "--app-id", "com.example.app", "--device-token", "abc123"])
        .args(["-d", r#"{"sync":"inbox"}"#, "--endpoint", &server.uri()]);

    run_blocking(cmd).await.success().stdout(predicate::str::contains("APNS-ID: bg-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_raw_verbose() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("apns-push-type", "alert"))
        .and(header("apns-priority", "10"))
        .and(body_string(r#"{"aps":{"alert":"raw"}}"#))
        .respond_with(ResponseTemplate::new(200).insert_header("apns-id", "raw-1"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = apnskit(&dir);
    cmd.args(["send", "raw", "--app-id", "com.example.app", "--device-token", "abc123", "-v"])
        .args(["-d", r#"{"aps":{"alert":"raw"}}"#, "--priority", "10", "--push-type", "alert"])
        .args(["--cert-file", NOPASS_P12, "--endpoint", &server.uri()]);

    run_blocking(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("> POST "))
        .stdout(predicate::str::contains("* Using client certificate"))
        .stdout(predicate::str::contains("< apns-id: raw-1"))
        .stdout(predicate::str::ends_with("APNS-ID: raw-1\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_without_key_file_uses_certificate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).insert_header("apns-id", "cert-2"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = apnskit(&dir);
    cmd.args(["send", "alert", "--app-id", "com.example.app", "--device-token", "abc123"])
        .args(["--alert-text", "hi", "--key-id", "ABC123DEFG", "--team-id", "TEAM123456"])
        .args(["--cert-file", MODERN_P12, "--cert-password", "secret", "--endpoint", &server.uri()]);

    run_blocking(cmd).await.success().stdout(predicate::str::contains("APNS-ID: cert-2"));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_with_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("apns-topic", "com.config.app"))
        .respond_with(ResponseTemplate::new(200).insert_header("apns-id", "cfg-1"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("apnskit.toml");
    std::fs::write(&config, "app_id = \"com.config.app\"\ntimeout_secs = 5\n").unwrap();

    let mut cmd = apnskit(&dir);
    cmd.args(["send", "alert", "--device-token", "abc123", "--alert-text", "hi"])
        .args(["--config", config.to_str().unwrap(), "--endpoint", &server.uri()]);

    run_blocking(cmd).await.success().stdout(predicate::str::contains("APNS-ID: cfg-1"));
}

#[test]
fn test_send_requires_app_id() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["send", "alert", "--device-token", "abc123", "--alert-text", "hi"])
        .args(["--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("app_id cannot be empty"));
}

#[test]
fn test_send_background_rejects_bad_json() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["send", "background", "--app-id", "com.example.app", "--device-token", "abc123"])
        .args(["-d", "[1, 2]", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid notification data"));
}

#[test]
fn test_invalid_priority() {
    let dir = TempDir::new().unwrap();
    apnskit(&dir)
        .args(["send", "alert", "--app-id", "com.example.app", "--device-token", "abc123"])
        .args(["--priority", "high", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid priority"));
}

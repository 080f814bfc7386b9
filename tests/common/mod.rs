#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tempfile::TempDir;

pub const SECRET: &str = "integration-secret";

pub fn refcode_bin() -> &'static str {
    env!("CARGO_BIN_EXE_refcode")
}

pub fn wait_for_path(path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

pub fn wait_for_path_removed(path: &Path, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Send a raw HTTP/1.1 request over the daemon socket and return the full
/// response text.
pub fn http_request(sock: &Path, request: &str) -> String {
    let mut stream = UnixStream::connect(sock).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

pub fn get(sock: &Path, uri: &str) -> String {
    http_request(
        sock,
        &format!("GET {uri} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
    )
}

pub fn post_json(sock: &Path, uri: &str, body: &str) -> String {
    http_request(
        sock,
        &format!(
            "POST {uri} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
    )
}

/// JSON body of a raw HTTP response.
pub fn json_body(response: &str) -> serde_json::Value {
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b)
        .unwrap_or_default();
    serde_json::from_str(body).unwrap()
}

/// A running daemon process backed by a temporary directory.
/// Sends SIGTERM and waits for exit on drop.
pub struct DaemonFixture {
    child: std::process::Child,
    pub home: TempDir,
}

impl DaemonFixture {
    pub fn start() -> Self {
        Self::start_with_secret(Some(SECRET))
    }

    pub fn start_with_secret(secret: Option<&str>) -> Self {
        let tmp = TempDir::new().unwrap();

        let mut cmd = std::process::Command::new(refcode_bin());
        cmd.env("REFCODE_HOME", tmp.path())
            .env_remove("XDG_DATA_HOME")
            .env_remove("XDG_RUNTIME_DIR")
            .env_remove("REFCODE_SECRET")
            .args(["daemon", "start"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        if let Some(secret) = secret {
            cmd.env("REFCODE_SECRET", secret);
        }
        let child = cmd.spawn().expect("failed to spawn daemon");

        let fixture = Self { child, home: tmp };

        let sock = fixture.socket_path();
        assert!(
            wait_for_path(&sock, Duration::from_secs(5)),
            "daemon socket not created"
        );

        fixture
    }

    pub fn socket_path(&self) -> std::path::PathBuf {
        self.home.path().join("runtime/refcode.sock")
    }

    pub fn pid_path(&self) -> std::path::PathBuf {
        self.home.path().join("runtime/refcode.pid")
    }

    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }

    /// Build an assert_cmd::Command that talks to this daemon's home.
    pub fn assert_cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(refcode_bin());
        cmd.env("REFCODE_HOME", self.home.path());
        cmd.env_remove("XDG_DATA_HOME");
        cmd.env_remove("XDG_RUNTIME_DIR");
        cmd.env_remove("REFCODE_SECRET");
        cmd
    }
}

impl Drop for DaemonFixture {
    fn drop(&mut self) {
        let _ = signal::kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM);
        let _ = self.child.wait();
    }
}

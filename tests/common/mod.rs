//! Integration test common infrastructure.
//!
//! Spawns ircfsd against a scripted mock IRC server and gives tests
//! line-level access to both sides: the wire and the projected
//! filesystem tree.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

/// The server half of the gateway's control socket, line-framed.
pub struct MockServer {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl MockServer {
    pub fn new(sock: TcpStream) -> MockServer {
        let (read, writer) = sock.into_split();
        MockServer {
            reader: BufReader::new(read),
            writer,
        }
    }

    /// Next line from the gateway, CRLF stripped.
    pub async fn recv_line(&mut self) -> String {
        let mut line = String::new();
        timeout(WAIT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line from the gateway")
            .expect("gateway socket read failed");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Read lines until one equals `expected`; panics on timeout.
    pub async fn expect_line(&mut self, expected: &str) {
        loop {
            let line = self.recv_line().await;
            if line == expected {
                return;
            }
        }
    }

    /// Send one line to the gateway, terminator appended.
    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("gateway socket write failed");
    }
}

/// A running ircfsd child projecting into a temp directory.
pub struct Gateway {
    child: Child,
    _root: tempfile::TempDir,
    net_dir: PathBuf,
}

impl Gateway {
    /// Write a config for one network pointed at `port` and spawn the
    /// binary. The caller owns the listener side.
    pub fn spawn(port: u16, channels: &str) -> Gateway {
        let root = tempfile::tempdir().expect("tempdir");
        let config_path = root.path().join("ircfsd.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
root_directory = "{}"
stay_in_foreground = true

[[network]]
name = "testnet"
server = "127.0.0.1"
port = {port}
nickname = "me"
channels = {channels}
"#,
                root.path().display()
            ),
        )
        .expect("write config");

        let child = Command::new(env!("CARGO_BIN_EXE_ircfsd"))
            .arg(&config_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn ircfsd");

        let net_dir = root.path().join("testnet");
        Gateway {
            child,
            _root: root,
            net_dir,
        }
    }

    pub fn network_dir(&self) -> &Path {
        &self.net_dir
    }

    pub fn channel_dir(&self, channel: &str) -> PathBuf {
        self.net_dir.join(channel)
    }

    /// Poll a projected file until `predicate` accepts its contents.
    pub async fn wait_for_view<F>(&self, path: &Path, predicate: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let contents = std::fs::read_to_string(path).unwrap_or_default();
            if predicate(&contents) {
                return contents;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "view {} never matched; last contents: {contents:?}",
                    path.display()
                );
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Wait until a projected path exists (e.g. a channel's `in` pipe).
    pub async fn wait_for_path(&self, path: &Path) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while !path.exists() {
            if tokio::time::Instant::now() > deadline {
                panic!("path {} never appeared", path.display());
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Bind the mock server's listener on an ephemeral port.
pub async fn bind_server() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

/// Accept the gateway's connection.
pub async fn accept_gateway(listener: &TcpListener) -> MockServer {
    let (sock, _) = timeout(WAIT, listener.accept())
        .await
        .expect("timed out waiting for the gateway to connect")
        .expect("accept failed");
    MockServer::new(sock)
}

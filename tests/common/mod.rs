//! Shared utilities for end-to-end tests.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clockstream::net::{load_tls_config, ConnectionId};
use clockstream::{ConnHandle, ConnStateHook, ConnectionState, HttpServer, KeepaliveListener};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// A self-signed key pair for `localhost`, written to a temporary directory.
pub struct TestCerts {
    _dir: TempDir,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_der: CertificateDer<'static>,
}

pub fn write_test_certs() -> TestCerts {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("rootCA.pem");
    let key_path = dir.path().join("rootCA.key");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    TestCerts {
        _dir: dir,
        cert_path,
        key_path,
        cert_der: CertificateDer::from(cert.der().to_vec()),
    }
}

/// Records every transition the server reports.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(ConnectionId, ConnectionState)>>,
}

impl Recorder {
    pub fn states(&self) -> Vec<ConnectionState> {
        self.events.lock().iter().map(|(_, s)| *s).collect()
    }

    pub fn connections(&self) -> usize {
        let mut ids: Vec<u64> = self.events.lock().iter().map(|(id, _)| id.as_u64()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Poll until `state` has been reported, or give up after a few seconds.
    pub async fn wait_for(&self, state: ConnectionState) -> bool {
        for _ in 0..50 {
            if self.states().contains(&state) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }
}

impl ConnStateHook for Recorder {
    fn on_state_change(&self, conn: &ConnHandle, state: ConnectionState) {
        self.events.lock().push((conn.id(), state));
    }
}

#[derive(Clone)]
struct BufferWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Info-level logs of the test thread. Servers started from a
/// `#[tokio::test]` run on that thread, so their events land here too.
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
    _guard: DefaultGuard,
}

impl CapturedLogs {
    pub fn install() -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(BufferWriter {
                buffer: Arc::clone(&buffer),
            })
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();

        Self {
            buffer,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    /// Number of captured lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }

    /// Poll until a line containing `needle` shows up, or give up after a few
    /// seconds.
    pub async fn wait_for(&self, needle: &str) -> bool {
        for _ in 0..50 {
            if self.count(needle) > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }
}

/// Start a server on an ephemeral port. The certificates must outlive the test.
pub async fn start_server(hook: Arc<dyn ConnStateHook>) -> (SocketAddr, TestCerts) {
    let certs = write_test_certs();
    let tls = load_tls_config(&certs.cert_path, &certs.key_path).await.unwrap();

    let listener = KeepaliveListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(tls, hook);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, certs)
}

/// Open a TLS connection offering exactly `alpn`.
pub async fn tls_connect(addr: SocketAddr, certs: &TestCerts, alpn: &[u8]) -> TlsStream<TcpStream> {
    let mut roots = RootCertStore::empty();
    roots.add(certs.cert_der.clone()).unwrap();

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![alpn.to_vec()];

    let tcp = TcpStream::connect(addr).await.unwrap();
    let server_name = ServerName::try_from("localhost").unwrap();
    TlsConnector::from(Arc::new(config))
        .connect(server_name, tcp)
        .await
        .unwrap()
}

pub async fn h2_client(addr: SocketAddr, certs: &TestCerts) -> http2::SendRequest<Empty<Bytes>> {
    let tls = tls_connect(addr, certs, b"h2").await;
    assert_eq!(tls.get_ref().1.alpn_protocol(), Some(&b"h2"[..]));

    let (sender, conn) = http2::handshake(TokioExecutor::new(), TokioIo::new(tls))
        .await
        .unwrap();
    tokio::spawn(conn);
    sender
}

pub async fn h1_client(addr: SocketAddr, certs: &TestCerts) -> http1::SendRequest<Empty<Bytes>> {
    let tls = tls_connect(addr, certs, b"http/1.1").await;

    let (sender, conn) = http1::handshake(TokioIo::new(tls)).await.unwrap();
    tokio::spawn(conn);
    sender
}

/// Read body frames until at least `lines` complete lines have arrived.
pub async fn read_lines<B>(body: &mut B, lines: usize) -> Vec<String>
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Debug,
{
    let mut text = String::new();
    while text.matches('\n').count() < lines {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for body")
            .expect("body ended early")
            .unwrap();
        if let Ok(data) = frame.into_data() {
            text.push_str(std::str::from_utf8(&data).unwrap());
        }
    }
    text.lines().map(str::to_string).collect()
}

#![allow(dead_code)]
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A canned HTTP answer.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl StubResponse {
    pub fn json(body: impl Into<String>) -> Self {
        StubResponse {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        StubResponse {
            status,
            ..StubResponse::json(body)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request seen by the stub: method, path, body.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// A loopback HTTP/1.1 server answering every request through `handler`.
/// The listener lives until the test process exits.
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl StubServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Hit) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub address");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);
        {
            let hits = Arc::clone(&hits);
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    let hits = Arc::clone(&hits);
                    let handler = Arc::clone(&handler);
                    thread::spawn(move || serve(stream, &hits, handler.as_ref()));
                }
            });
        }
        StubServer { addr, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path == path).count()
    }
}

fn serve<F>(stream: TcpStream, hits: &Mutex<Vec<Hit>>, handler: &F)
where
    F: Fn(&Hit) -> StubResponse,
{
    let Some(hit) = read_request(&stream) else {
        return;
    };
    hits.lock().unwrap().push(hit.clone());
    let response = handler(&hit);
    if !response.delay.is_zero() {
        thread::sleep(response.delay);
    }
    let reason = if response.status < 400 { "OK" } else { "Error" };
    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason,
        response.body.len(),
        response.body
    );
    let mut stream = stream;
    // The client may already have timed out.
    let _ = stream.write_all(raw.as_bytes());
    let _ = stream.flush();
}

fn read_request(stream: &TcpStream) -> Option<Hit> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).ok()? == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(Hit {
        method,
        path,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// A URL nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{}", addr)
}

pub const SCENARIO_STDERR: &str = "error[E0425]: cannot find value `x`\n --> src/main.rs:3:5\nwarning: unused variable\n --> src/main.rs:5:1";

/// Playground body reporting the standard error/warning scenario.
pub fn playground_scenario_body() -> String {
    serde_json::json!({
        "success": false,
        "stdout": "",
        "stderr": SCENARIO_STDERR,
    })
    .to_string()
}

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

use fleetload_instruments::report::{InMemoryReportCollector, ReportMetric};
use fleetload_instruments::Reporter;
use serde_json::Value;

/// A reporter whose emitted metrics can be inspected after the fact.
pub fn recording_reporter() -> (Reporter, Arc<parking_lot::Mutex<Vec<ReportMetric>>>) {
    let collector = InMemoryReportCollector::new();
    let handle = collector.handle();
    (Reporter::new(Box::new(collector)), handle)
}

pub fn event_names(metrics: &parking_lot::Mutex<Vec<ReportMetric>>) -> Vec<String> {
    metrics
        .lock()
        .iter()
        .map(|metric| metric.name().to_string())
        .collect()
}

/// One scripted HTTP response.
pub struct CannedResponse {
    pub status: u16,
    pub body: Value,
}

impl CannedResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn conflict() -> Self {
        Self {
            status: 409,
            body: serde_json::json!({ "reason": "Conflict" }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Minimal scripted HTTP server.
///
/// Serves the canned responses in order, one connection per request, and records what it was
/// asked. The serving thread ends once every response has been consumed, so tests that assert
/// an exact request count never race it.
pub struct StubApi {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubApi {
    pub fn start(responses: Vec<CannedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        std::thread::spawn(move || {
            for response in responses {
                let (mut socket, _) = match listener.accept() {
                    Ok(connection) => connection,
                    Err(_) => return,
                };

                let request = match read_request(&mut socket) {
                    Some(request) => request,
                    None => return,
                };
                recorded.lock().unwrap().push(request);

                let body = response.body.to_string();
                let raw = format!(
                    "HTTP/1.1 {} canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(raw.as_bytes());
                let _ = socket.flush();
            }
        });

        Self { base_url, requests }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request_line = head.lines().next()?.split(' ');
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(RecordedRequest { method, path, body })
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

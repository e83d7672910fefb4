//! Shared helpers for integration tests: a throwaway HTTP data source.

#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Header, Response, Server, StatusCode};

/// What the mock source saw for one request.
#[derive(Debug, Clone)]
pub struct Captured {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A data source on `127.0.0.1:<ephemeral>` that answers a fixed number of
/// requests with a canned response.
pub struct MockSource {
    pub base_url: String,
    requests: Receiver<Captured>,
    thread: Option<JoinHandle<()>>,
}

impl MockSource {
    pub fn start(status: u16, body: &str, count: usize) -> Self {
        Self::start_delayed(status, body, count, Duration::ZERO)
    }

    /// Like [`MockSource::start`], sleeping `delay` before each response.
    pub fn start_delayed(status: u16, body: &str, count: usize, delay: Duration) -> Self {
        let server = Server::http("127.0.0.1:0").expect("bind mock source");
        let addr = server
            .server_addr()
            .to_ip()
            .expect("mock source has an IP address");
        let (tx, rx) = mpsc::channel();
        let body = body.to_string();

        let thread = thread::spawn(move || {
            for _ in 0..count {
                let Ok(request) = server.recv() else { break };
                let captured = Captured {
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                };
                let _ = tx.send(captured);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let header = Header::from_bytes("Content-Type", "application/json")
                    .expect("static header");
                let response = Response::from_string(body.clone())
                    .with_header(header)
                    .with_status_code(StatusCode(status));
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests: rx,
            thread: Some(thread),
        }
    }

    /// URL of `path` on this source.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Next captured request, waiting briefly for the server thread.
    pub fn next_request(&self) -> Captured {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("mock source received a request")
    }

    /// Wait for the server thread to finish its canned responses.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// A valid payload in the data source's wire format.
pub const LIVE_BODY: &str = r#"{
  "metrics": [
    {"timestamp": "09:00", "visitors": 1200, "pageViews": 3100, "errors": 4, "latency": 180},
    {"timestamp": "10:00", "visitors": 1350, "pageViews": 3400, "errors": 2, "latency": 165}
  ],
  "endpoints": [
    {"path": "/api/orders", "calls": 5400, "avgLatency": 210, "status": 200},
    {"path": "/api/login", "calls": 830, "avgLatency": 95, "status": 401}
  ],
  "geoData": [
    {"city": "Lisbon", "country": "Portugal", "lat": 38.72, "lng": -9.14, "users": 310}
  ]
}"#;

/// An address nothing is listening on.
pub fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind scratch listener");
    let addr = listener.local_addr().expect("scratch listener address");
    drop(listener);
    format!("http://{addr}/metrics")
}

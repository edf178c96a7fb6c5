/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Test doubles shared by unit tests across the crate

use crate::domain::{AlertEvent, ApiError, NotifyError};
use crate::ports::{ManagementApi, Notifier};
use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Management API answering from a fixed table; unknown paths answer 404
#[derive(Default)]
pub struct StaticManagementApi {
    responses: HashMap<String, Result<Value, ApiError>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<String>>,
}

impl StaticManagementApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Ok(body));
        self
    }

    pub fn with_error(mut self, path: &str, error: ApiError) -> Self {
        self.responses.insert(path.to_string(), Err(error));
        self
    }

    /// Delay every answer, to keep a cycle running
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManagementApi for StaticManagementApi {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(path.to_string());
        self.responses
            .get(path)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::NotFound {
                    path: path.to_string(),
                })
            })
    }
}

/// Notifier that records every alert it is handed
pub struct RecordingNotifier {
    channel: String,
    fail: bool,
    received: Mutex<Vec<AlertEvent>>,
}

impl RecordingNotifier {
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            fail: false,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Records alerts but reports every delivery as failed
    pub fn failing(channel: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(channel)
        }
    }

    pub fn received(&self) -> Vec<AlertEvent> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn notify(&self, alert: &AlertEvent) -> Result<(), NotifyError> {
        self.received.lock().unwrap().push(alert.clone());
        if self.fail {
            Err(NotifyError::Delivery(format!("{} unreachable", self.channel)))
        } else {
            Ok(())
        }
    }
}

/// Serve one canned HTTP response on a local port
///
/// Returns the `host:port` to connect to and a handle yielding the raw
/// request text once the exchange is done.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (address, handle)
}

/// Accept one connection and never answer it
pub async fn serve_silence() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });
    (address, handle)
}

/// A local address nothing listens on
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buffer[..end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buffer.len() >= end + 4 + content_length {
            break;
        }
    }
    String::from_utf8_lossy(&buffer).to_string()
}

thread_local! {
    static CAPTURED_LOGS: RefCell<Option<Vec<(log::Level, String)>>> = RefCell::new(None);
}

/// Logger recording into the current thread's capture buffer, if one is open
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        CAPTURED_LOGS.with(|logs| {
            if let Some(logs) = logs.borrow_mut().as_mut() {
                logs.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;
static INSTALL_LOGGER: Once = Once::new();

/// Start recording log records emitted on this thread
pub fn capture_logs() {
    INSTALL_LOGGER.call_once(|| {
        log::set_logger(&CAPTURE_LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
    CAPTURED_LOGS.with(|logs| *logs.borrow_mut() = Some(Vec::new()));
}

/// Stop recording and return what was captured on this thread
pub fn captured_logs() -> Vec<(log::Level, String)> {
    CAPTURED_LOGS.with(|logs| logs.borrow_mut().take().unwrap_or_default())
}

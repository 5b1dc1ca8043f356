//! Minimal HTTP/1.1 server for exercising the client against canned replies.
//!
//! Each accepted connection serves exactly one request and is then closed.
//! Replies are consumed in order; the last one repeats once the list runs out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the server sends back for one request
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Status line plus a body written as separate pieces
    Chunks { status: u16, chunks: Vec<String> },
    /// Read the request, then never answer
    Stall,
}

impl MockReply {
    /// 200 with one NDJSON content frame per chunk, then a done frame
    pub fn stream(chunks: &[&str]) -> Self {
        let mut lines: Vec<String> = chunks
            .iter()
            .map(|c| content_line(c))
            .collect();
        lines.push(done_line());
        Self::Chunks {
            status: 200,
            chunks: lines,
        }
    }

    /// 200 with raw body pieces, written as given
    pub fn raw(chunks: &[&str]) -> Self {
        Self::Chunks {
            status: 200,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Non-success status with a plain body
    pub fn status(status: u16, body: &str) -> Self {
        Self::Chunks {
            status,
            chunks: vec![body.to_string()],
        }
    }
}

/// An NDJSON line carrying one content chunk
pub fn content_line(content: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({
            "model": "test",
            "message": {"role": "assistant", "content": content},
            "done": false
        })
    )
}

/// The final NDJSON frame
pub fn done_line() -> String {
    "{\"model\":\"test\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\",\"prompt_eval_count\":12,\"eval_count\":3}\n".to_string()
}

/// A request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// e.g. `POST /api/chat HTTP/1.1`, or absolute-form when proxied
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }

    /// All values for a header, case-insensitive, in order
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Messages array from the JSON body
    pub fn messages(&self) -> Vec<serde_json::Value> {
        self.json()["messages"].as_array().cloned().unwrap_or_default()
    }
}

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let replies = Arc::new(Mutex::new(replies));

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let reply = {
                    let mut replies = replies.lock();
                    if replies.len() > 1 {
                        replies.remove(0)
                    } else {
                        replies
                            .first()
                            .cloned()
                            .unwrap_or_else(|| MockReply::status(500, "no reply configured"))
                    }
                };
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    serve(socket, reply, recorded).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("mock server saw no requests")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    reply: MockReply,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    recorded.lock().push(request);

    match reply {
        MockReply::Stall => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        MockReply::Chunks { status, chunks } => {
            let length: usize = chunks.iter().map(|c| c.len()).sum();
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                if status < 400 { "OK" } else { "Error" },
                length
            );
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for chunk in chunks {
                if socket.write_all(chunk.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
            }
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .filter_map(|l| {
            let (name, value) = l.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let body_end = (head_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[head_end..body_end]).to_string();

    Some(RecordedRequest {
        request_line,
        headers,
        body,
    })
}

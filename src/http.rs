//! HTTP server for the dashboard
//! Simple HTTP server using tokio and basic HTTP handling

use crate::api::{self, PipelineOptions};
use crate::config::ServerConfig;
use crate::error::Result;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: &'static str,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json(status: u16, status_text: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text,
            content_type: "application/json".to_string(),
            body: body.into().into_bytes(),
        }
    }

    pub fn not_found() -> Self {
        Self::json(404, "Not Found", api::error_body("not found"))
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    /// Full wire form: status line, headers (CORS included) and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status,
            self.status_text,
            self.content_type,
            self.body.len()
        );
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server listening on http://{}", config.bind_addr());
    info!("Data directory: {}", config.data_dir.display());
    info!("Static directory: {}", config.static_dir.display());

    let config = Arc::new(config);
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&config)));
    }
}

async fn handle_connection(mut stream: TcpStream, config: Arc<ServerConfig>) {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    // Only GET/OPTIONS are served, so the headers are the whole request.
    let read_result = timeout(READ_TIMEOUT, async {
        loop {
            match stream.read(&mut temp_buf).await {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&temp_buf[..n]);
                    if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() > MAX_REQUEST_BYTES {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    })
    .await;

    match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(())) => {}
    }

    if buffer.is_empty() {
        return;
    }

    let request = String::from_utf8_lossy(&buffer);
    let response = handle_request(&request, &config).await;
    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

/// Method and normalized, percent-decoded path from the request line; query
/// string dropped. Paths that do not decode to UTF-8 are rejected.
pub fn parse_request_line(request: &str) -> Option<(String, String)> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_ascii_uppercase();
    let full_path = parts.next()?;

    let raw_path = full_path.split(|c: char| c == '?' || c == '#').next().unwrap_or("/");
    let path = percent_decode_str(raw_path).decode_utf8().ok()?;
    let mut normalized = path.trim_end_matches('/').to_string();
    if normalized.is_empty() {
        normalized = "/".to_string();
    }
    Some((method, normalized))
}

pub async fn handle_request(request: &str, config: &ServerConfig) -> HttpResponse {
    let Some((method, path)) = parse_request_line(request) else {
        return HttpResponse::json(400, "Bad Request", api::error_body("malformed request line"));
    };

    info!("{} {}", method, path);

    match (method.as_str(), path.as_str()) {
        ("OPTIONS", _) => HttpResponse {
            status: 204,
            status_text: "No Content",
            content_type: "text/plain".to_string(),
            body: Vec::new(),
        },
        ("GET", "/health") => HttpResponse::json(200, "OK", r#"{"status":"ok","service":"tagtrends"}"#),
        ("GET", "/data") => data_response(config).await,
        ("GET", "/") => serve_static(&config.static_dir, "index.html").await,
        ("GET", other) => serve_static(&config.static_dir, other.trim_start_matches('/')).await,
        _ => HttpResponse::json(405, "Method Not Allowed", api::error_body("method not allowed")),
    }
}

async fn data_response(config: &ServerConfig) -> HttpResponse {
    let options = PipelineOptions::new(config.data_dir.clone());
    let rendered = match tokio::task::spawn_blocking(move || api::respond(&options)).await {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("Pipeline task failed: {}", e);
            return HttpResponse::json(500, "Internal Server Error", api::error_body("pipeline task failed"));
        }
    };

    match rendered.error {
        Some(err) if config.strict_status => {
            let (status, text) = err.status();
            HttpResponse::json(status, text, rendered.body)
        }
        _ => HttpResponse::json(200, "OK", rendered.body),
    }
}

/// Resolve a request path inside `root`, refusing anything that could escape it.
pub fn resolve_static_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path);
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(relative))
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn serve_static(root: &Path, request_path: &str) -> HttpResponse {
    let Some(path) = resolve_static_path(root, request_path) else {
        return HttpResponse::not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(body) => HttpResponse {
            status: 200,
            status_text: "OK",
            content_type: content_type_for(&path).to_string(),
            body,
        },
        Err(e) => {
            debug!("Static file {} unavailable: {}", path.display(), e);
            HttpResponse::not_found()
        }
    }
}

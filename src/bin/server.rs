//! HTTP Server for the Clinical Workflow Dashboard UI
//! Simple HTTP server using tokio and basic HTTP handling

use clinical_dashboard::api::{self, ApiResponse};
use clinical_dashboard::config::{init_logging, DashboardConfig, SERVICE_LOG_FILTER};
use clinical_dashboard::Session;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

type SharedSession = Arc<Mutex<Option<Session>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(SERVICE_LOG_FILTER);
    let config = Arc::new(DashboardConfig::from_env());

    let session: SharedSession = Arc::new(Mutex::new(None));
    if let Some((encounters, claims)) = config.preload_paths() {
        match Session::load_files(encounters, claims) {
            Ok(loaded) => {
                info!("[OK] Preloaded session from {} and {}", encounters.display(), claims.display());
                *session.lock().await = Some(loaded);
            }
            Err(e) => warn!("Preload failed, waiting for upload: {}", e),
        }
    }

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("[OK] Dashboard API listening on http://{}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, session.clone(), config.clone()));
    }
}

async fn handle_connection(mut stream: TcpStream, session: SharedSession, config: Arc<DashboardConfig>) {
    // Read request with timeout to prevent hanging
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];
    let max_bytes = config.max_request_bytes;

    let read_result = timeout(config.read_timeout, async {
        loop {
            match stream.read(&mut temp_buf).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    buffer.extend_from_slice(&temp_buf[..n]);
                    if let Some(headers_end) = find_headers_end(&buffer) {
                        let content_length = extract_content_length(&buffer[..headers_end]).unwrap_or(0);
                        if buffer.len() >= headers_end + content_length {
                            break; // We have the complete request
                        }
                    }
                    if buffer.len() > max_bytes {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read from stream: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    })
    .await;

    let response = match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(_)) => return,
        Ok(Ok(())) if buffer.is_empty() => return,
        Ok(Ok(())) if buffer.len() > max_bytes => {
            ApiResponse::error(413, format!("Request exceeds {} bytes", max_bytes))
        }
        Ok(Ok(())) => match String::from_utf8(buffer) {
            Ok(request) => dispatch(&request, &session).await,
            Err(_) => ApiResponse::error(400, "Request is not valid UTF-8"),
        },
    };

    if let Err(e) = stream.write_all(create_response(&response).as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

async fn dispatch(request: &str, session: &SharedSession) -> ApiResponse {
    let request_line = request.lines().next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return ApiResponse::error(400, "Malformed request line");
    }
    let (method, path) = (parts[0], parts[1]);

    if method == "OPTIONS" {
        return ApiResponse::ok(serde_json::json!({}));
    }

    let body = request
        .find("\r\n\r\n")
        .map(|idx| &request[idx + 4..])
        .unwrap_or("");

    debug!("Request: {} {}", method, path);
    let mut guard = session.lock().await;
    let response = api::handle(method, path, body, &mut guard);
    info!("{} {} -> {}", method, path, response.status);
    response
}

fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|idx| idx + 4)
}

fn extract_content_length(headers: &[u8]) -> Option<usize> {
    let headers = std::str::from_utf8(headers).ok()?;
    for line in headers.lines() {
        if line.to_lowercase().starts_with("content-length:") {
            if let Some(value) = line.split(':').nth(1) {
                return value.trim().parse().ok();
            }
        }
    }
    None
}

fn create_response(response: &ApiResponse) -> String {
    let body = response.body.to_string();
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        response.status,
        response.status_text(),
        body.len(),
        body
    )
}

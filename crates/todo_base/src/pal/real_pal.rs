use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::{ErrorKind, TodoError, TodoResult};

use super::FilePath;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use super::traits::Pal;

/// How long the accept loop waits for a request before re-checking shutdown.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/* 📖 # Why tiny_http and a fixed set of worker threads?

Every handler finishes in microseconds against an in-memory store, so a
synchronous server is enough. `tiny_http::Server` can be shared between
threads, and each of the configured workers pulls the next request from it
with `recv_timeout`. The number of threads is fixed at startup: a burst of
slow clients queues up inside tiny_http instead of creating a thread per
request. The timeout lets every worker notice the shutdown flag.
*/

/// PAL implementation using the real filesystem and a tiny_http server.
///
/// File paths are resolved relative to the configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> TodoResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.exists();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> TodoResult<Box<dyn Read + 'static>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "opening file for reading");
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            Box::new(TodoError::new(ErrorKind::FileError {
                path: resolved,
                source: e,
            }))
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self, service, config), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> TodoResult<HttpServerHandle> {
        let address = config.address();
        let server = tiny_http::Server::http(&address)
            .map_err(|e| crate::err!("Failed to bind HTTP server to {}: {}", address, e))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("HTTP server at {} is not bound to a TCP port", address))?;

        let handle = HttpServerHandle::new(port);
        let server = Arc::new(server);
        let service: Arc<dyn HttpService> = Arc::from(service);
        let workers = config.workers.max(1);

        // On a spawn error the handle is dropped, which stops workers already started
        for index in 0..workers {
            let server = Arc::clone(&server);
            let service = Arc::clone(&service);
            let shutdown = handle.shutdown_flag();
            let server_name = config.server_name.clone();
            thread::Builder::new()
                .name(format!("http-worker-{}", index))
                .spawn(move || worker_loop(&server, service.as_ref(), &shutdown, &server_name))
                .map_err(|e| crate::err!("Failed to spawn HTTP worker thread: {}", e))?;
        }

        info!(host = %config.host, port, workers, "HTTP server listening");
        Ok(handle)
    }
}

fn worker_loop(
    server: &tiny_http::Server,
    service: &dyn HttpService,
    shutdown: &AtomicBool,
    server_name: &str,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
            Ok(Some(request)) => respond(request, service, server_name),
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to receive HTTP request"),
        }
    }
    debug!("HTTP worker stopped");
}

fn respond(mut request: tiny_http::Request, service: &dyn HttpService, server_name: &str) {
    let response = match convert_request(&mut request) {
        Ok(converted) => {
            let path = converted.path().to_string();
            match service.handle_request(converted) {
                Ok(response) => response,
                Err(e) => {
                    error!(path = %path, error = %e, span_trace = %e.span_trace(), "service failed to handle request");
                    HttpResponse::json_message(HttpStatusCode::ServiceError, &e.to_string())
                }
            }
        }
        Err(response) => response,
    };

    debug!(
        method = %request.method(),
        url = request.url(),
        status = response.status().as_u16(),
        "sending response"
    );
    if let Err(e) = request.respond(convert_response(response, server_name)) {
        warn!(error = %e, "failed to write HTTP response");
    }
}

/// Reads a tiny_http request fully into an [`HttpRequest`].
/// Returns the response to send instead when the body cannot be read.
fn convert_request(request: &mut tiny_http::Request) -> Result<HttpRequest, HttpResponse> {
    let method = HttpMethod::parse(request.method().as_str());

    let mut body = Vec::new();
    if let Err(e) = request.as_reader().read_to_end(&mut body) {
        warn!(error = %e, "failed to read request body");
        return Err(HttpResponse::json_message(
            HttpStatusCode::BadRequest,
            "Failed to read request body",
        ));
    }

    let mut converted = HttpRequest::new(method, request.url()).with_body(body);
    for header in request.headers() {
        converted = converted.with_header(header.field.to_string(), header.value.to_string());
    }
    Ok(converted)
}

fn convert_response(
    response: HttpResponse,
    server_name: &str,
) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let status = tiny_http::StatusCode(response.status().as_u16());
    let mut headers: Vec<tiny_http::Header> = response
        .headers()
        .iter()
        .filter_map(|(key, value)| tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()).ok())
        .collect();
    if let Ok(header) = tiny_http::Header::from_bytes("Server", server_name.as_bytes()) {
        headers.push(header);
    }

    let body = response.into_body().into_bytes();
    let length = body.len();
    tiny_http::Response::new(status, headers, Cursor::new(body), Some(length), None)
}

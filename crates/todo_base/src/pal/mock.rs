use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use parking_lot::Mutex;

use crate::error::ErrorKind;
use crate::{TodoError, TodoResult};

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::Pal;

/* 📖 # Why does MockPal keep the registered services?

start_http_server does not open a socket here. It stores the service under a
port number, and simulate_request later calls that service directly. Tests
exercise the exact wiring the CLI uses (config -> service -> PAL) while staying
in-process and deterministic.
*/

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use todo_base::{FilePath, MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("todo.toml"), b"[server]".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("todo.toml")).unwrap();
/// assert_eq!(content, "[server]");
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    http_servers: Arc<Mutex<HashMap<u16, MockServer>>>,
    next_port: Arc<AtomicU16>,
}

#[derive(Debug)]
struct MockServer {
    service: Arc<dyn HttpService>,
    handle: HttpServerHandle,
}

impl MockPal {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
        }
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.files.lock().insert(path, content);
    }

    /// Simulate an HTTP request to a running server.
    ///
    /// Fails if no server is registered on `port` or if it has been shut down.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> TodoResult<HttpResponse> {
        let service = {
            let servers = self.http_servers.lock();
            let server = servers
                .get(&port)
                .ok_or_else(|| crate::err!("No HTTP server registered on port {}", port))?;
            if server.handle.is_shutdown() {
                crate::bail!("HTTP server on port {} has been shut down", port);
            }
            Arc::clone(&server.service)
        };

        service.handle_request(request)
    }

    /// Get the number of registered HTTP servers.
    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().len()
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> TodoResult<bool> {
        Ok(self.files.lock().contains_key(path))
    }

    fn read_file(&self, path: &FilePath) -> TodoResult<Box<dyn Read + 'static>> {
        let files = self.files.lock();
        let content = files
            .get(path)
            .ok_or_else(|| {
                Box::new(TodoError::new(ErrorKind::FileError {
                    path: path.as_path().to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("File not found: {}", path),
                    ),
                }))
            })?
            .clone();
        Ok(Box::new(Cursor::new(content)))
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> TodoResult<HttpServerHandle> {
        let port = match config.port {
            Some(p) => p,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };

        let mut servers = self.http_servers.lock();
        if let Some(existing) = servers.get(&port) {
            if !existing.handle.is_shutdown() {
                crate::bail!("Port {} is already in use", port);
            }
        }

        // The registry keeps a clone of the handle, so the server stays up
        // until the caller calls shutdown() explicitly.
        let handle = HttpServerHandle::new(port);
        servers.insert(
            port,
            MockServer {
                service: Arc::from(service),
                handle: handle.clone(),
            },
        );
        Ok(handle)
    }
}

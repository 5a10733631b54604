use std::io::Read;
use std::sync::Arc;

use crate::TodoResult;

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/* 📖 # Why is Pal a trait instead of a struct?

Everything the service does outside its own memory goes through this trait:
reading the config file and listening for HTTP. RealPal does it for real,
MockPal keeps files in a map and dispatches requests directly to the service.
Code that depends on `Pal` can be tested without touching disk or network.
*/

/// Platform Abstraction Layer (PAL) trait.
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file exists at the given path.
    fn file_exists(&self, path: &FilePath) -> TodoResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> TodoResult<Box<dyn Read + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> TodoResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(crate::TodoError::new(crate::ErrorKind::FileError {
                path: path.as_path().to_path_buf(),
                source: e,
            }))
        })?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Start an HTTP server with the given service.
    ///
    /// Returns once the server is listening. The returned handle reports the
    /// bound port; dropping the last clone of it stops the server.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> TodoResult<HttpServerHandle>;
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// # Examples
///
/// ```no_run
/// use todo_base::{PalHandle, RealPal};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

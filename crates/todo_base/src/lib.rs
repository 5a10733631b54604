/* 📖 # Why have todo_base as a core library?
todo_base owns the pieces every other crate leans on: the error type, tracing
setup and the Platform Abstraction Layer that hides the filesystem and the HTTP
server. Keeping them here lets the engine stay free of I/O and lets the CLI be a
thin wiring layer.
*/

pub mod error;
pub mod pal;
mod pal_tests;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, TodoError, TodoResult};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};

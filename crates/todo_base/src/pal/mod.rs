/* 📖 # What is the Platform Abstraction Layer?

The PAL is the only place the service touches the outside world: the config
file on disk and the HTTP listener. Engine code depends on the `Pal` trait,
the CLI picks `RealPal`, and tests pick `MockPal`.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{Pal, PalHandle};

/* 📖 # Why an API module in todo_engine?

The api module exposes the store over HTTP. Its service implements the
HttpService trait from todo_base, so the same handler runs behind RealPal in
production and behind MockPal in tests, where requests are fed in directly
without opening a socket.
*/

mod service;

pub use service::{DELETED_MESSAGE, TODO_PATH, TodoApiService};

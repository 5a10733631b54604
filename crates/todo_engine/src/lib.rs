pub mod api;
pub mod config;
pub mod store;
pub mod todo;

pub use api::TodoApiService;
pub use config::{
    ApiConfig, Config, MalformedBodyPolicy, ServerConfig, UpdatePolicy, load_config,
    load_config_or_default,
};
pub use store::{InMemoryStore, StoreHandle, TodoStore};
pub use todo::Todo;

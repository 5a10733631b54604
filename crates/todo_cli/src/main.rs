/* 📖 # Why does the server start without a config file?

`todo-server` with no arguments serves `/todo` on 0.0.0.0:10000 with an empty
list. A `todo.toml` in the working directory (or the file named by
`--config`) is only read if it exists, and `--host`/`--port` override
whatever it says. A config file that exists but cannot be parsed is an error,
so a typo never silently falls back to defaults.

Exit codes:
- 0: never reached in normal operation, the server runs until killed
- 1: startup failed (tracing, config, seed items, or binding the port)
*/

use std::env;
use std::process;

use clap::Parser;
use tracing::info;

use todo_base::tracing::init_tracing;
use todo_base::{FilePath, PalHandle, RealPal, TodoResult};
use todo_engine::{Config, TodoApiService, load_config_or_default};

/// Serve an in-memory todo list over HTTP.
#[derive(Debug, Parser)]
#[command(name = "todo-server", version, about, long_about = None)]
struct Args {
    /// Config file, relative to the working directory
    #[arg(short, long, default_value = "todo.toml")]
    config: String,

    /// Address to bind, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,
}

impl Args {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

fn run(args: Args) -> TodoResult<()> {
    let current_dir = env::current_dir()
        .map_err(|e| todo_base::err!("Failed to get current directory: {}", e))?;
    let pal = PalHandle::new(RealPal::new(current_dir));

    let mut config = load_config_or_default(&pal, &FilePath::from(args.config.as_str()))?;
    args.apply_overrides(&mut config);

    let service = TodoApiService::from_config(&config)?;
    info!(seeded = config.seed.len(), api = ?config.api, "todo store ready");

    let handle = pal.start_http_server(Box::new(service), config.server.to_http_config())?;
    info!(
        address = %handle.address(&config.server.host),
        "serving /todo"
    );
    handle.wait();
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Error: Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

//! # Command line interface
//!
//! The `routeward` binary has two subcommands.
//!
//! ### `serve`
//!
//! Build the router with the bundled controllers and serve it:
//!
//! ```bash
//! routeward serve --config routeward.yaml
//! routeward serve --addr 127.0.0.1:9090
//! ```
//!
//! The config path may also come from `ROUTEWARD_CONFIG`. Without a config
//! file the defaults in [`crate::config::AppConfig`] apply.
//!
//! ### `routes`
//!
//! Print the compiled route table and exit:
//!
//! ```bash
//! routeward routes
//! ```

mod commands;

pub use commands::{build_router, run_cli, Cli, Commands};

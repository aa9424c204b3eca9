use crate::config::AppConfig;
use crate::controllers::UsersController;
use crate::logging::{init_logging, LogConfig};
use crate::middleware::{static_middleware, LoggingMiddleware};
use crate::router::Router;
use crate::server::{AppService, HttpServer, ServerHandle};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "routeward")]
#[command(about = "Controller-driven HTTP dispatcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// YAML or JSON configuration file
        #[arg(short, long, env = "ROUTEWARD_CONFIG")]
        config: Option<PathBuf>,

        /// Bind address, overriding the configured `addr:port`
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// Print the compiled route table
    Routes {
        #[arg(short, long, env = "ROUTEWARD_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => Ok(AppConfig::load(path)?),
        None => Ok(AppConfig::default().with_env_overrides(|key| std::env::var(key).ok())),
    }
}

/// Router for the bundled controllers with the middleware `config` asks for.
///
/// Global pre order: CORS, then request logging. Request logging is also the
/// only global post middleware. Static mounts answer requests no route
/// matched.
///
/// # Errors
///
/// Invalid CORS settings or a route table that fails to compile.
pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    let mut builder = Router::builder().controller(UsersController::new());

    if let Some(cors) = &config.cors {
        builder = builder.use_pre(cors.build()?);
    }
    for mount in &config.static_mounts {
        builder = builder.use_fallback(static_middleware(&mount.path, mount.directory.clone()));
    }

    let log_user_agent = config.logging.user_agent;
    let router = builder
        .use_pre(LoggingMiddleware::pre().with_init(|options| options.user_agent = log_user_agent))
        .use_post(LoggingMiddleware::post())
        .build()?;
    Ok(router)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signals")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server coroutine panicked"))
}

fn serve(config_path: Option<&Path>, addr: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let log_config =
        LogConfig::from_settings(&config.logging).with_overrides(|key| std::env::var(key).ok());
    let _guard = init_logging(&log_config)?;

    let router = build_router(&config)?;
    router.dump_routes();

    may::config().set_stack_size(config.server.stack_size);
    let bind_addr = addr.map_or_else(|| config.server.bind_addr(), str::to_string);

    let handle = HttpServer(AppService::new(router))
        .start(bind_addr.as_str())
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    handle.wait_ready()?;
    info!(
        addr = %handle.addr(),
        stack_size = config.server.stack_size,
        "routeward ready"
    );

    wait_for_shutdown(handle)
}

fn print_routes(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let router = build_router(&config)?;
    for route in router.routes() {
        println!(
            "{:<7} {:<32} {}",
            route.method(),
            route.template(),
            route.handler_id()
        );
    }
    Ok(())
}

/// Parse the process arguments and run the selected subcommand.
///
/// # Errors
///
/// Configuration, logging or bind failures from the subcommand.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Serve { config, addr } => serve(config.as_deref(), addr.as_deref()),
        Commands::Routes { config } => print_routes(config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorsSettings, StaticMount};
    use http::Method;

    #[test]
    fn test_parse_serve_args() {
        let cli = Cli::parse_from(["routeward", "serve", "--addr", "127.0.0.1:0"]);
        match cli.command {
            Commands::Serve { addr, .. } => assert_eq!(addr.as_deref(), Some("127.0.0.1:0")),
            Commands::Routes { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn test_build_router_registers_users() {
        let router = build_router(&AppConfig::default()).unwrap();
        assert_eq!(router.routes().len(), 5);
        assert!(router.find(&Method::GET, "/api/v1/users/7").is_some());
        // logging only
        assert_eq!(router.global_pre().len(), 1);
    }

    #[test]
    fn test_build_router_puts_cors_first() {
        let config = AppConfig {
            cors: Some(CorsSettings::default()),
            ..AppConfig::default()
        };
        let router = build_router(&config).unwrap();
        assert_eq!(router.global_pre().len(), 2);
        assert_eq!(router.global_pre()[0].name(), "cors");
    }

    #[test]
    fn test_static_mounts_become_fallbacks() {
        let config = AppConfig {
            static_mounts: vec![StaticMount {
                path: "/assets".into(),
                directory: "public".into(),
            }],
            ..AppConfig::default()
        };
        let router = build_router(&config).unwrap();
        assert_eq!(router.fallback().len(), 1);
        assert_eq!(router.fallback()[0].name(), "static");
    }
}

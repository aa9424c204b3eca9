use super::{ConfiguredMiddleware, MiddlewareContext};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Also log the `User-Agent` header.
    pub user_agent: bool,
}

/// Request logging for the global chains.
///
/// Register [`LoggingMiddleware::pre`] with `use_pre` and
/// [`LoggingMiddleware::post`] with `use_post`.
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    #[must_use]
    pub fn pre() -> ConfiguredMiddleware<LoggingOptions> {
        ConfiguredMiddleware::new("logging-pre", LoggingOptions::default(), log_request)
    }

    #[must_use]
    pub fn post() -> ConfiguredMiddleware<LoggingOptions> {
        ConfiguredMiddleware::new("logging-post", LoggingOptions::default(), log_response)
    }
}

fn log_request(ctx: &mut MiddlewareContext<'_>, options: &LoggingOptions) -> anyhow::Result<()> {
    let request = ctx.request();
    if options.user_agent {
        info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            user_agent = request.header("user-agent").unwrap_or("-"),
            "Request received"
        );
    } else {
        info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            "Request received"
        );
    }
    ctx.next()
}

fn log_response(ctx: &mut MiddlewareContext<'_>, _options: &LoggingOptions) -> anyhow::Result<()> {
    let request = ctx.request();
    if let Some(entity) = ctx.response_entity() {
        info!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            status = entity.status(),
            "Response produced"
        );
    }
    ctx.next()
}

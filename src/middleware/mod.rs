mod core;
mod cors;
mod logging;
mod static_files;

pub use core::{
    from_fn, ChainState, ConfiguredMiddleware, ErrorHook, FnMiddleware, Middleware,
    MiddlewareContext,
};
pub use cors::{CorsConfigError, CorsMiddleware, CorsMiddlewareBuilder};
pub use logging::{LoggingMiddleware, LoggingOptions};
pub use static_files::{static_middleware, StaticFiles, StaticMiddleware};

use thiserror::Error;

/// Returned by [`CorsMiddlewareBuilder::build`](super::CorsMiddlewareBuilder::build)
/// when the settings cannot produce a valid CORS policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// `*` cannot be combined with `allow_credentials(true)`.
    #[error("cannot use wildcard origin (*) with credentials; list exact origins instead")]
    WildcardWithCredentials,

    /// Expected `scheme://host[:port]`, e.g. `https://example.com`.
    #[error("invalid origin format '{origin}', expected scheme://host[:port]")]
    InvalidOriginFormat { origin: String },

    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },
}

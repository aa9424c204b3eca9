//! HTTP adapter on `may_minihttp`.
//!
//! [`AppService`] parses each wire request into a
//! [`Request`](crate::request::Request), dispatches it into a
//! [`RecordedResponse`](crate::response::RecordedResponse) and copies that
//! onto the wire response.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{build_request, parse_request, RequestParseError};
pub use response::write_recorded;
pub use service::AppService;

use super::request::parse_request;
use super::response::write_recorded;
use crate::response::{RecordedResponse, ResponseEntity, ResponseSink};
use crate::router::Router;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use tracing::warn;

/// `may_minihttp` service that dispatches every request through a [`Router`].
///
/// Each connection runs in its own coroutine; the router is shared
/// read-only between them.
#[derive(Clone)]
pub struct AppService {
    router: Router,
}

impl AppService {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let mut recorded = RecordedResponse::new();
        match parse_request(req) {
            Ok(request) => self.router.dispatch(&request, &mut recorded),
            Err(err) => {
                warn!(error = %err, "Rejecting malformed request");
                ResponseEntity::bad_request(&err.to_string()).send(&mut recorded);
            }
        }
        if !recorded.is_committed() {
            recorded.write_status(200);
        }
        write_recorded(res, &recorded);
        Ok(())
    }
}

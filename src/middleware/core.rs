use crate::binder::Args;
use crate::request::{ParamVec, Request};
use crate::response::{ResponseEntity, ResponseSink};
use std::sync::Arc;
use tracing::{debug, error};

/// A unit of the request pipeline.
///
/// A unit does its work and then either calls [`MiddlewareContext::next`] to
/// pass control downstream, or returns without calling it to halt the chain.
/// Code after `next()` runs once everything downstream has finished.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> anyhow::Result<()>;
}

/// Where a chain run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// `next()` has not been called yet.
    BeforeFirst,
    /// The unit at this index is executing.
    Running(usize),
    /// A unit returned without calling `next()`; downstream units never ran.
    Halted,
    /// `next()` was called past the last unit.
    Completed,
}

/// Per-request state shared by every unit in a chain.
pub struct MiddlewareContext<'a> {
    request: &'a Request,
    sink: &'a mut dyn ResponseSink,
    path_vars: ParamVec,
    args: Option<Args>,
    response_entity: Option<ResponseEntity>,
    chain: Arc<[Arc<dyn Middleware>]>,
    next_index: usize,
    state: ChainState,
}

impl<'a> MiddlewareContext<'a> {
    pub fn new(
        request: &'a Request,
        sink: &'a mut dyn ResponseSink,
        chain: Arc<[Arc<dyn Middleware>]>,
    ) -> Self {
        Self {
            request,
            sink,
            path_vars: ParamVec::new(),
            args: None,
            response_entity: None,
            chain,
            next_index: 0,
            state: ChainState::BeforeFirst,
        }
    }

    #[must_use]
    pub fn with_path_vars(mut self, path_vars: ParamVec) -> Self {
        self.path_vars = path_vars;
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = Some(args);
        self
    }

    /// Advance to the next unit and run it.
    ///
    /// Past the end of the chain this marks the run completed and returns.
    /// Once the chain has halted or completed further calls do nothing.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by the unit that was run.
    pub fn next(&mut self) -> anyhow::Result<()> {
        if matches!(self.state, ChainState::Halted | ChainState::Completed) {
            return Ok(());
        }
        let index = self.next_index;
        self.next_index += 1;

        let Some(unit) = self.chain.get(index).map(Arc::clone) else {
            self.state = ChainState::Completed;
            return Ok(());
        };

        self.state = ChainState::Running(index);
        let result = unit.handle(self);
        if self.state == ChainState::Running(index) {
            self.state = ChainState::Halted;
            debug!(
                middleware = %unit.name(),
                position = index,
                "Middleware chain halted"
            );
        }
        result
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    pub fn sink(&mut self) -> &mut dyn ResponseSink {
        &mut *self.sink
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.sink.is_committed()
    }

    #[must_use]
    pub fn path_vars(&self) -> &ParamVec {
        &self.path_vars
    }

    #[must_use]
    pub fn args(&self) -> Option<&Args> {
        self.args.as_ref()
    }

    pub fn take_args(&mut self) -> Option<Args> {
        self.args.take()
    }

    #[must_use]
    pub fn response_entity(&self) -> Option<&ResponseEntity> {
        self.response_entity.as_ref()
    }

    pub fn response_entity_mut(&mut self) -> Option<&mut ResponseEntity> {
        self.response_entity.as_mut()
    }

    pub fn set_response_entity(&mut self, entity: ResponseEntity) {
        self.response_entity = Some(entity);
    }

    pub fn take_response_entity(&mut self) -> Option<ResponseEntity> {
        self.response_entity.take()
    }

    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.state == ChainState::Halted
    }

    /// Index of the unit most recently entered; `None` before the first
    /// `next()`.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.next_index.checked_sub(1)
    }

    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

type MiddlewareFn = dyn Fn(&mut MiddlewareContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// A named closure used as a [`Middleware`].
pub struct FnMiddleware {
    name: String,
    func: Box<MiddlewareFn>,
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> anyhow::Result<()> {
        (self.func)(ctx)
    }
}

/// Wrap a closure as a middleware.
///
/// ```
/// use routeward::middleware::from_fn;
///
/// let tag = from_fn("tag", |ctx| {
///     ctx.next()?;
///     if let Some(entity) = ctx.response_entity_mut() {
///         entity.set_header("X-Tagged", "yes");
///     }
///     Ok(())
/// });
/// ```
pub fn from_fn<F>(name: &str, func: F) -> FnMiddleware
where
    F: Fn(&mut MiddlewareContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    FnMiddleware {
        name: name.to_string(),
        func: Box::new(func),
    }
}

type ConfiguredFn<C> = dyn Fn(&mut MiddlewareContext<'_>, &C) -> anyhow::Result<()> + Send + Sync;
pub type ErrorHook = Arc<dyn Fn(&mut MiddlewareContext<'_>, &anyhow::Error) + Send + Sync>;

/// A middleware with a typed configuration and an error hook.
///
/// Unless replaced or removed, the error hook logs the error and lets the
/// request carry on as if the unit had returned normally.
pub struct ConfiguredMiddleware<C> {
    name: String,
    config: C,
    handler: Box<ConfiguredFn<C>>,
    on_error: Option<ErrorHook>,
}

impl<C: Send + Sync> ConfiguredMiddleware<C> {
    pub fn new<F>(name: &str, config: C, handler: F) -> Self
    where
        F: Fn(&mut MiddlewareContext<'_>, &C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let owner = name.to_string();
        let default_hook: ErrorHook = Arc::new(move |ctx: &mut MiddlewareContext<'_>, err: &anyhow::Error| {
            error!(
                middleware = %owner,
                method = %ctx.request().method,
                path = %ctx.request().path,
                error = %err,
                "Middleware error"
            );
        });
        Self {
            name: name.to_string(),
            config,
            handler: Box::new(handler),
            on_error: Some(default_hook),
        }
    }

    /// Adjust the configuration once, at construction time.
    #[must_use]
    pub fn with_init(mut self, init: impl FnOnce(&mut C)) -> Self {
        init(&mut self.config);
        self
    }

    #[must_use]
    pub fn on_error<H>(mut self, hook: H) -> Self
    where
        H: Fn(&mut MiddlewareContext<'_>, &anyhow::Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Let handler errors propagate to the dispatcher instead of being
    /// swallowed.
    #[must_use]
    pub fn propagate_errors(mut self) -> Self {
        self.on_error = None;
        self
    }

    #[must_use]
    pub fn config(&self) -> &C {
        &self.config
    }
}

impl<C: Send + Sync> Middleware for ConfiguredMiddleware<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> anyhow::Result<()> {
        match (self.handler)(ctx, &self.config) {
            Err(err) => match &self.on_error {
                Some(hook) => {
                    hook(ctx, &err);
                    Ok(())
                }
                None => Err(err),
            },
            ok => ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::RecordedResponse;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &str, forward: bool) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        let label = name.to_string();
        Arc::new(from_fn(name, move |ctx| {
            log.lock().unwrap().push(format!("{label}:before"));
            if forward {
                ctx.next()?;
            }
            log.lock().unwrap().push(format!("{label}:after"));
            Ok(())
        }))
    }

    #[test]
    fn test_units_nest_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Arc<[Arc<dyn Middleware>]> =
            Arc::from(vec![recorder(&log, "a", true), recorder(&log, "b", true)]);
        let request = Request::get("/");
        let mut sink = RecordedResponse::new();
        let mut ctx = MiddlewareContext::new(&request, &mut sink, chain);

        assert_eq!(ctx.state(), ChainState::BeforeFirst);
        assert_eq!(ctx.position(), None);
        ctx.next().unwrap();
        assert_eq!(ctx.state(), ChainState::Completed);
        assert_eq!(
            *log.lock().unwrap(),
            ["a:before", "b:before", "b:after", "a:after"]
        );
    }

    #[test]
    fn test_unit_that_skips_next_halts_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![
            recorder(&log, "a", true),
            recorder(&log, "gate", false),
            recorder(&log, "c", true),
        ]);
        let request = Request::get("/");
        let mut sink = RecordedResponse::new();
        let mut ctx = MiddlewareContext::new(&request, &mut sink, chain);

        ctx.next().unwrap();
        assert!(ctx.is_halted());
        assert_eq!(ctx.position(), Some(1));
        assert_eq!(
            *log.lock().unwrap(),
            ["a:before", "gate:before", "gate:after", "a:after"]
        );

        // Halted chains cannot be resumed.
        ctx.next().unwrap();
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_empty_chain_completes_immediately() {
        let request = Request::get("/");
        let mut sink = RecordedResponse::new();
        let mut ctx = MiddlewareContext::new(&request, &mut sink, Arc::from(Vec::new()));
        ctx.next().unwrap();
        assert_eq!(ctx.state(), ChainState::Completed);
    }

    #[test]
    fn test_configured_middleware_swallows_errors_by_default() {
        let mw = ConfiguredMiddleware::new("failing", 3u32, |_, limit| {
            anyhow::bail!("limit {limit} exceeded")
        })
        .with_init(|limit| *limit += 1);
        assert_eq!(*mw.config(), 4);

        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![Arc::new(mw) as Arc<dyn Middleware>]);
        let request = Request::get("/");
        let mut sink = RecordedResponse::new();
        let mut ctx = MiddlewareContext::new(&request, &mut sink, chain);
        assert!(ctx.next().is_ok());
        assert!(ctx.is_halted());
    }

    #[test]
    fn test_configured_middleware_can_propagate_errors() {
        let mw = ConfiguredMiddleware::new("failing", (), |_, _| anyhow::bail!("boom"))
            .propagate_errors();
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![Arc::new(mw) as Arc<dyn Middleware>]);
        let request = Request::get("/");
        let mut sink = RecordedResponse::new();
        let mut ctx = MiddlewareContext::new(&request, &mut sink, chain);
        let err = ctx.next().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}

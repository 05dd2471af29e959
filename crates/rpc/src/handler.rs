use crate::args::Args;
use crate::extract::FromArgs;
use crate::fn_trait::FnTrait;
use crate::reply::Reply;
use crate::route::ParamSpec;
use crate::task::Task;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// The callable behind a route.
///
/// Any `Fn(Args) -> Task<Value>` is a handler. Plain functions with typed positional
/// parameters become handlers through [`handler_fn`].
pub trait RouteHandler: Send + Sync {
    fn invoke(&self, args: Args) -> Task<Value>;

    /// Checked once per route while the table is built, against the final parameter list
    /// (plugin additions included). An `Err` names the mismatch.
    fn check(&self, params: &[ParamSpec]) -> Result<(), String> {
        let _ = params;
        Ok(())
    }
}

impl<F> RouteHandler for F
where
    F: Fn(Args) -> Task<Value> + Send + Sync,
{
    fn invoke(&self, args: Args) -> Task<Value> {
        (self)(args)
    }
}

/// a `FnTrait` holder which represents any Fn with typed parameters
pub struct FnHandler<F, Params> {
    f: F,
    _phantom: PhantomData<fn(Params)>,
}

impl<F, Params> FnHandler<F, Params>
where
    F: FnTrait<Params>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

impl<F, Params> fmt::Debug for FnHandler<F, Params> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("fn", &std::any::type_name::<F>()).finish()
    }
}

/// Wraps a function whose parameters are read positionally from the route's arguments.
///
/// The `i`-th function parameter receives the `i`-th declared route parameter; conversion
/// failures fail the call before the function runs.
pub fn handler_fn<F, Params>(f: F) -> FnHandler<F, Params>
where
    F: FnTrait<Params>,
{
    FnHandler::new(f)
}

impl<F, Params> RouteHandler for FnHandler<F, Params>
where
    F: FnTrait<Params> + Send + Sync,
    F::Output: Reply,
    Params: FromArgs,
{
    fn invoke(&self, args: Args) -> Task<Value> {
        match Params::from_args(&args) {
            Ok(params) => self.f.call(params).into_task(),
            Err(e) => Task::failed(e),
        }
    }

    fn check(&self, params: &[ParamSpec]) -> Result<(), String> {
        Params::check(params)
    }
}

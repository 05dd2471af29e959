use crate::args::Args;
use crate::dispatch::{CallStage, RouteContext};
use crate::error::RpcError;
use crate::route::Route;
use crate::task::{guard, Task};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Drives one call through `modify_call` stages, the handler and `modify_result` stages.
///
/// Stages advance only through the continuations handed to plugins and through the handler's
/// task, so asynchronous plugins simply resume the chain later on the same thread.
struct Pipeline {
    route: Arc<Route>,
    context: Rc<RouteContext>,
    done: Task<Value>,
}

/// Runs the plugin chain and handler of `route` with the bound `args`.
pub(crate) fn run(route: Arc<Route>, context: Rc<RouteContext>, args: Args) -> Task<Value> {
    let done = Task::new();
    let pipeline = Rc::new(Pipeline { route, context, done: done.clone() });
    pipeline.call_stage(0, args);
    done
}

impl Pipeline {
    fn call_stage(self: &Rc<Self>, index: usize, args: Args) {
        let Some(binding) = self.route.plugins().get(index) else {
            self.invoke_handler(args);
            return;
        };

        self.context.enter(CallStage::PluginCall(index));
        debug!(
            call_id = self.context.call_id(),
            route = self.route.name(),
            plugin = binding.plugin().name(),
            "modify_call"
        );

        let next = CallNext { pipeline: Some(Rc::clone(self)), index };
        if let Err(e) = guard(|| binding.plugin().modify_call(binding, &self.context, args, next)) {
            self.fail(e);
        }
    }

    fn invoke_handler(self: &Rc<Self>, args: Args) {
        self.context.enter(CallStage::HandlerExecuting);
        debug!(call_id = self.context.call_id(), route = self.route.name(), "invoking handler");

        let pipeline = Rc::clone(self);
        let attached = guard(|| {
            let task = self.route.handler().invoke(args);
            task.on_complete(move |outcome| match outcome {
                Ok(value) => pipeline.result_stage(0, value),
                Err(e) => pipeline.fail(e),
            });
        });
        if let Err(e) = attached {
            self.fail(e);
        }
    }

    fn result_stage(self: &Rc<Self>, index: usize, result: Value) {
        let Some(binding) = self.route.plugins().get(index) else {
            self.succeed(result);
            return;
        };

        self.context.enter(CallStage::PluginResult(index));
        debug!(
            call_id = self.context.call_id(),
            route = self.route.name(),
            plugin = binding.plugin().name(),
            "modify_result"
        );

        let next = ResultNext { pipeline: Some(Rc::clone(self)), index };
        if let Err(e) = guard(|| binding.plugin().modify_result(binding, &self.context, result, next)) {
            self.fail(e);
        }
    }

    fn succeed(&self, result: Value) {
        if !self.done.is_waiting() {
            warn!(
                call_id = self.context.call_id(),
                route = self.route.name(),
                "call already completed, dropping late result"
            );
            return;
        }
        self.context.enter(CallStage::Succeeded);
        self.done.finish(result);
    }

    fn fail(&self, error: RpcError) {
        if !self.done.is_waiting() {
            warn!(
                call_id = self.context.call_id(),
                route = self.route.name(),
                cause = %error,
                "call already completed, dropping late failure"
            );
            return;
        }
        self.context.enter(CallStage::Failed);
        self.done.fail(error);
    }
}

const DROPPED: &str = "plugin dropped its continuation";

/// One-shot continuation of a `modify_call` stage.
///
/// Dropping it without calling [`proceed`](CallNext::proceed) or [`abort`](CallNext::abort)
/// fails the call.
pub struct CallNext {
    pipeline: Option<Rc<Pipeline>>,
    index: usize,
}

impl CallNext {
    /// Hands the (possibly rewritten) arguments to the next stage.
    pub fn proceed(mut self, args: Args) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.call_stage(self.index + 1, args);
        }
    }

    /// Fails the call; no later stage runs.
    pub fn abort(mut self, error: RpcError) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.fail(error);
        }
    }

    /// The call this continuation belongs to.
    pub fn call(&self) -> Option<&RouteContext> {
        self.pipeline.as_deref().map(|p| p.context.as_ref())
    }
}

impl Drop for CallNext {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take()
            && !std::thread::panicking()
        {
            pipeline.fail(RpcError::internal(DROPPED));
        }
    }
}

impl fmt::Debug for CallNext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallNext").field("stage", &self.index).field("pending", &self.pipeline.is_some()).finish()
    }
}

/// One-shot continuation of a `modify_result` stage.
///
/// Dropping it without calling [`proceed`](ResultNext::proceed) or
/// [`abort`](ResultNext::abort) fails the call.
pub struct ResultNext {
    pipeline: Option<Rc<Pipeline>>,
    index: usize,
}

impl ResultNext {
    /// Hands the (possibly transformed) result to the next stage.
    pub fn proceed(mut self, result: Value) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.result_stage(self.index + 1, result);
        }
    }

    pub fn abort(mut self, error: RpcError) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.fail(error);
        }
    }

    pub fn call(&self) -> Option<&RouteContext> {
        self.pipeline.as_deref().map(|p| p.context.as_ref())
    }
}

impl Drop for ResultNext {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take()
            && !std::thread::panicking()
        {
            pipeline.fail(RpcError::internal(DROPPED));
        }
    }
}

impl fmt::Debug for ResultNext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultNext").field("stage", &self.index).field("pending", &self.pipeline.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::plugin::{Plugin, PluginBinding, PluginContext};
    use crate::route::{get, ParamSpec, RouteSignature, RouteTable};
    use crate::task::TaskState;
    use crate::value::ParamType;
    use http::Method;
    use serde_json::json;
    use std::cell::RefCell;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    thread_local! {
        static PENDING: RefCell<Option<Task<Value>>> = const { RefCell::new(None) };
        static GATE: RefCell<Option<Task<()>>> = const { RefCell::new(None) };
    }

    /// Records every stage and optionally misbehaves.
    struct Recorder {
        name: &'static str,
        log: Log,
        behavior: Behavior,
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Pass,
        AbortCall,
        DropCall,
        PanicCall,
        AbortResult,
        WrapResult,
    }

    fn recorder(name: &'static str, log: &Log, behavior: Behavior) -> Arc<dyn Plugin> {
        Arc::new(Recorder { name, log: Arc::clone(log), behavior })
    }

    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn modify_call(&self, _binding: &PluginBinding, _call: &RouteContext, args: Args, next: CallNext) {
            self.log.lock().unwrap().push(format!("{}:call", self.name));
            match self.behavior {
                Behavior::AbortCall => next.abort(RpcError::unauthorized("denied")),
                Behavior::DropCall => drop(next),
                Behavior::PanicCall => panic!("plugin exploded"),
                _ => next.proceed(args),
            }
        }

        fn modify_result(&self, _binding: &PluginBinding, _call: &RouteContext, result: Value, next: ResultNext) {
            self.log.lock().unwrap().push(format!("{}:result", self.name));
            match self.behavior {
                Behavior::AbortResult => next.abort(RpcError::invalid_state("bad result")),
                Behavior::WrapResult => next.proceed(json!([self.name, result])),
                _ => next.proceed(result),
            }
        }
    }

    /// Fills its injected slot only once the thread's gate task resolves.
    struct Deferred;

    impl Plugin for Deferred {
        fn name(&self) -> &str {
            "deferred"
        }

        fn bind(&self, signature: &mut RouteSignature) -> Result<Option<PluginContext>, BuildError> {
            signature.add_param(ParamSpec::injected("user", ParamType::String));
            Ok(Some(PluginContext::empty()))
        }

        fn modify_call(&self, binding: &PluginBinding, _call: &RouteContext, mut args: Args, next: CallNext) {
            let slot = binding.slots()[0];
            let gate = Task::new();
            GATE.with(|g| *g.borrow_mut() = Some(gate.clone()));
            gate.on_complete(move |outcome| match outcome {
                Ok(()) => {
                    args.set(slot, "alice");
                    next.proceed(args);
                }
                Err(e) => next.abort(e),
            });
        }
    }

    fn table_with(plugins: Vec<Arc<dyn Plugin>>, log: &Log) -> RouteTable {
        let log = Arc::clone(log);
        let handler = move |args: Args| {
            log.lock().unwrap().push("handler".to_string());
            Task::finished(json!(args.by_name("user").map(ToString::to_string)))
        };
        plugins
            .into_iter()
            .fold(RouteTable::builder(), |b, p| b.plugin_arc(p))
            .route(get("echo", "/echo", handler))
            .build()
            .unwrap()
    }

    fn start(table: &RouteTable) -> (Rc<RouteContext>, Task<Value>) {
        let route = Arc::clone(table.route("echo").unwrap());
        let context = Rc::new(RouteContext::new(Method::GET, "/echo", 0, None));
        context.attach_route(Arc::clone(&route));
        let args = Args::new(Arc::clone(route.params()), vec![], None);
        let task = run(route, Rc::clone(&context), args);
        (context, task)
    }

    fn outcome(task: Task<Value>) -> Result<Value, RpcError> {
        let slot = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        task.on_complete(move |outcome| *sink.borrow_mut() = Some(outcome));
        slot.borrow_mut().take().expect("task should be resolved")
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn stages_run_in_registration_order() {
        let log = Log::default();
        let plugins = vec![recorder("a", &log, Behavior::WrapResult), recorder("b", &log, Behavior::WrapResult)];
        let table = table_with(plugins, &log);
        let (context, task) = start(&table);

        assert_eq!(outcome(task), Ok(json!(["b", ["a", null]])));
        assert_eq!(entries(&log), ["a:call", "b:call", "handler", "a:result", "b:result"]);
        assert_eq!(context.stage(), CallStage::Succeeded);
    }

    #[test]
    fn abort_in_modify_call_short_circuits() {
        let log = Log::default();
        let plugins = vec![recorder("a", &log, Behavior::AbortCall), recorder("b", &log, Behavior::Pass)];
        let table = table_with(plugins, &log);
        let (context, task) = start(&table);

        assert_eq!(outcome(task), Err(RpcError::unauthorized("denied")));
        assert_eq!(entries(&log), ["a:call"]);
        assert_eq!(context.stage(), CallStage::Failed);
    }

    #[test]
    fn abort_in_modify_result() {
        let log = Log::default();
        let table =
            table_with(vec![recorder("a", &log, Behavior::AbortResult), recorder("b", &log, Behavior::Pass)], &log);
        let (_context, task) = start(&table);

        assert_eq!(outcome(task), Err(RpcError::invalid_state("bad result")));
        assert_eq!(entries(&log), ["a:call", "b:call", "handler", "a:result"]);
    }

    #[test]
    fn dropped_continuation_fails_the_call() {
        let log = Log::default();
        let table = table_with(vec![recorder("a", &log, Behavior::DropCall)], &log);
        let (_context, task) = start(&table);

        assert_eq!(outcome(task), Err(RpcError::internal(DROPPED)));
        assert_eq!(entries(&log), ["a:call"]);
    }

    #[test]
    fn plugin_panic_becomes_internal() {
        let log = Log::default();
        let table = table_with(vec![recorder("a", &log, Behavior::PanicCall)], &log);
        let (_context, task) = start(&table);

        assert_eq!(outcome(task), Err(RpcError::internal("panicked: plugin exploded")));
    }

    #[test]
    fn asynchronous_plugin_resumes_later() {
        let log = Log::default();
        let table = table_with(vec![Arc::new(Deferred) as Arc<dyn Plugin>], &log);
        let (context, task) = start(&table);

        assert_eq!(task.state(), TaskState::Waiting);
        assert_eq!(context.stage(), CallStage::PluginCall(0));
        assert!(entries(&log).is_empty());

        GATE.with(|g| g.borrow_mut().take().unwrap().finish(()));
        assert_eq!(outcome(task), Ok(json!("alice")));
        assert_eq!(entries(&log), ["handler"]);
    }

    #[test]
    fn handler_panic_becomes_internal() {
        let table = RouteTable::builder()
            .route(get("echo", "/echo", |_args: Args| -> Task<Value> { panic!("handler exploded") }))
            .build()
            .unwrap();
        let (context, task) = start(&table);

        assert_eq!(outcome(task), Err(RpcError::internal("panicked: handler exploded")));
        assert_eq!(context.stage(), CallStage::Failed);
    }

    #[test]
    fn handler_resolving_later() {
        let table = RouteTable::builder()
            .route(get("echo", "/echo", |_args: Args| -> Task<Value> {
                let task = Task::new();
                PENDING.with(|p| *p.borrow_mut() = Some(task.clone()));
                task
            }))
            .build()
            .unwrap();
        let (context, task) = start(&table);
        assert_eq!(context.stage(), CallStage::HandlerExecuting);

        PENDING.with(|p| p.borrow_mut().take().unwrap().finish(json!(1)));
        assert_eq!(outcome(task), Ok(json!(1)));
        assert_eq!(context.stage(), CallStage::Succeeded);
    }
}

use micro_rpc::plugin::{CallNext, Plugin, PluginBinding, PluginContext};
use micro_rpc::route::{get, post, ParamSpec, RouteSignature, RouteTable};
use micro_rpc::{
    handler_fn, Args, BuildError, CallRequest, Dispatcher, Json, ParamType, RouteContext, RpcError, Task,
};
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Serialize)]
struct Item {
    id: i32,
    name: String,
    verbose: bool,
}

/// The per-connection object a transport would hand to the dispatcher.
struct Session {
    user: Option<&'static str>,
}

/// Rejects anonymous callers and fills the injected `user` parameter.
struct Authenticated;

impl Plugin for Authenticated {
    fn name(&self) -> &str {
        "authenticated"
    }

    fn bind(&self, signature: &mut RouteSignature) -> Result<Option<PluginContext>, BuildError> {
        if !signature.name.starts_with("admin") {
            return Ok(None);
        }
        let slot = signature.add_param(ParamSpec::injected("user", ParamType::String));
        Ok(Some(PluginContext::new(slot)))
    }

    fn modify_call(&self, binding: &PluginBinding, call: &RouteContext, mut args: Args, next: CallNext) {
        let user = call.transport::<Session>().and_then(|session| session.user);
        match (user, binding.context().get::<usize>()) {
            (Some(user), Some(slot)) => {
                args.set(*slot, user);
                next.proceed(args);
            }
            _ => next.abort(RpcError::unauthorized("login required")),
        }
    }
}

fn get_item(id: i32, verbose: bool) -> Json<Item> {
    Json(Item { id, name: format!("item-{id}"), verbose })
}

fn get_item_2024_01_01(id: i32, verbose: bool) -> Json<Item> {
    Json(Item { id, name: format!("ITEM #{id}"), verbose })
}

// resolved later on the event loop
fn slow_square(n: i64) -> Task<i64> {
    let task = Task::new();
    let resolver = task.clone();
    tokio::task::spawn_local(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        resolver.finish(n * n);
    });
    task
}

fn admin_reset(user: String) -> Result<String, RpcError> {
    Ok(format!("reset by {user}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let item_params = || {
        [ParamSpec::path("id", ParamType::Int), ParamSpec::query("verbose", ParamType::Bool).default_value(false)]
    };

    let table = RouteTable::builder()
        .plugin(Authenticated)
        .route(get("get_item", "/items/:id", handler_fn(get_item)).params(item_params()))
        .route(get("get_item_2024_01_01", "/items/:id", handler_fn(get_item_2024_01_01)).params(item_params()))
        .route(get("slow_square", "/square/:n", handler_fn(slow_square)).param(ParamSpec::path("n", ParamType::Long)))
        .route(post("admin_reset", "/admin/reset", handler_fn(admin_reset)))
        .build()
        .expect("route table should be valid");

    for route in table.routes() {
        info!(
            name = route.name(),
            method = %route.method(),
            path = route.equivalence_path(),
            version = route.version(),
            "registered"
        );
    }

    let dispatcher = Dispatcher::builder().table(table).build().expect("dispatcher should build");

    let requests = vec![
        CallRequest::get("/items/42?verbose=true").version(20_230_101),
        CallRequest::get("/items/42"),
        CallRequest::get("/items/abc"),
        CallRequest::get("/square/12"),
        CallRequest::post("/admin/reset").transport(Rc::new(Session { user: None })),
        CallRequest::post("/admin/reset").transport(Rc::new(Session { user: Some("root") })),
        CallRequest::get("/nothing/here"),
    ];

    LocalSet::new()
        .run_until(async move {
            for request in requests {
                let description = format!("{request:?}");
                match dispatcher.dispatch(request).await {
                    Ok(result) => println!("{description}\n  -> {result}"),
                    Err(e) => println!("{description}\n  -> error: {e}"),
                }
            }
        })
        .await;
}

//! Routing and dispatch core of an RPC server.
//!
//! Handlers are registered against versioned path templates, compiled into an immutable
//! [`RouteTable`](route::RouteTable), and invoked by a [`Dispatcher`] through a plugin
//! pipeline built on the single-threaded [`Task`] primitive.
//!
//! ```
//! use micro_rpc::route::{get, ParamSpec, RouteTable};
//! use micro_rpc::{handler_fn, CallRequest, Dispatcher, ParamType};
//! use serde_json::json;
//!
//! fn get_item(id: i32, verbose: bool) -> serde_json::Value {
//!     json!({ "id": id, "verbose": verbose })
//! }
//!
//! let table = RouteTable::builder()
//!     .route(
//!         get("get_item", "/items/:id", handler_fn(get_item))
//!             .param(ParamSpec::path("id", ParamType::Int))
//!             .param(ParamSpec::query("verbose", ParamType::Bool).default_value(false)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::builder().table(table).build().unwrap();
//! let result = futures::executor::block_on(dispatcher.dispatch(CallRequest::get("/items/42?verbose=true")));
//! assert_eq!(result, Ok(json!({ "id": 42, "verbose": true })));
//! ```

mod args;
mod config;
mod dispatch;
mod error;
mod fn_trait;
mod handler;
mod listener;
mod reply;
mod task;
mod value;

pub mod extract;
pub mod plugin;
pub mod route;
pub mod router;

pub use args::Args;
pub use args::TransportHandle;
pub use config::DispatchConfig;
pub use config::DispatchConfigBuilder;
pub use dispatch::CallRequest;
pub use dispatch::CallStage;
pub use dispatch::Dispatcher;
pub use dispatch::DispatcherBuildError;
pub use dispatch::DispatcherBuilder;
pub use dispatch::RouteContext;
pub use error::AlreadyResolved;
pub use error::BuildError;
pub use error::RpcError;
pub use fn_trait::FnTrait;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::RouteHandler;
pub use listener::CallListener;
pub use listener::TracingListener;
pub use reply::Json;
pub use reply::Reply;
pub use task::Outcome;
pub use task::Task;
pub use task::TaskState;
pub use value::ParamType;
pub use value::ParamValue;

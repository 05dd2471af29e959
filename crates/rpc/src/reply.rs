//! Conversion of handler return values into the call's result task.
//!
//! The [`Reply`] trait lets a typed handler return plain values, `Result`s, `Option`s, or a
//! [`Task`] that resolves later; each is turned into a `Task<Value>` the pipeline can chain on.

use crate::error::RpcError;
use crate::task::Task;
use serde::Serialize;
use serde_json::Value;

/// A handler return type that can become the call result.
pub trait Reply {
    fn into_task(self) -> Task<Value>;
}

/// Serializes the wrapped value with `serde_json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Json<T>(pub T);

fn to_value<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal(format!("failed to serialize result: {e}")))
}

impl<T: Serialize> Reply for Json<T> {
    fn into_task(self) -> Task<Value> {
        Task::from_result(to_value(&self.0))
    }
}

impl Reply for Value {
    fn into_task(self) -> Task<Value> {
        Task::finished(self)
    }
}

/// A deferred result; it is serialized once it resolves.
impl<T: Serialize + 'static> Reply for Task<T> {
    fn into_task(self) -> Task<Value> {
        self.map(|value| to_value(&value))
    }
}

impl<R: Reply> Reply for Result<R, RpcError> {
    fn into_task(self) -> Task<Value> {
        match self {
            Ok(r) => r.into_task(),
            Err(e) => Task::failed(e),
        }
    }
}

/// `None` becomes a JSON `null`.
impl<R: Reply> Reply for Option<R> {
    fn into_task(self) -> Task<Value> {
        match self {
            Some(r) => r.into_task(),
            None => Task::finished(Value::Null),
        }
    }
}

impl Reply for () {
    fn into_task(self) -> Task<Value> {
        Task::finished(Value::Null)
    }
}

impl Reply for &'static str {
    fn into_task(self) -> Task<Value> {
        Task::finished(Value::from(self))
    }
}

macro_rules! reply_via_from {
    ($($ty:ty),*) => {
        $(
            impl Reply for $ty {
                fn into_task(self) -> Task<Value> {
                    Task::finished(Value::from(self))
                }
            }
        )*
    };
}

reply_via_from!(String, i32, i64, f64, bool);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn outcome(task: Task<Value>) -> Result<Value, RpcError> {
        let slot = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        task.on_complete(move |outcome| *sink.borrow_mut() = Some(outcome));
        slot.borrow_mut().take().expect("task should be resolved")
    }

    #[derive(Serialize)]
    struct Item {
        id: i32,
        name: &'static str,
    }

    #[test]
    fn plain_values() {
        assert_eq!(outcome(().into_task()), Ok(Value::Null));
        assert_eq!(outcome("hi".into_task()), Ok(json!("hi")));
        assert_eq!(outcome(3_i32.into_task()), Ok(json!(3)));
        assert_eq!(outcome(true.into_task()), Ok(json!(true)));
        assert_eq!(outcome(Json(Item { id: 1, name: "a" }).into_task()), Ok(json!({"id": 1, "name": "a"})));
    }

    #[test]
    fn result_and_option() {
        let err: Result<String, RpcError> = Err(RpcError::unauthorized("nope"));
        assert_eq!(outcome(err.into_task()), Err(RpcError::unauthorized("nope")));
        assert_eq!(outcome(None::<i32>.into_task()), Ok(Value::Null));
        assert_eq!(outcome(Some(Ok::<_, RpcError>(5_i64)).into_task()), Ok(json!(5)));
    }

    #[test]
    fn deferred_task() {
        let pending = Task::<Vec<i32>>::new();
        let reply = pending.clone().into_task();
        assert_eq!(reply.state(), TaskState::Waiting);

        pending.finish(vec![1, 2]);
        assert_eq!(outcome(reply), Ok(json!([1, 2])));
    }
}

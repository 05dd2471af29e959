use crate::error::{AlreadyResolved, RpcError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Runs `f`, turning a panic into an [`RpcError::Internal`].
///
/// An [`AlreadyResolved`] panic is a framework bug and keeps unwinding.
pub(crate) fn guard<R>(f: impl FnOnce() -> R) -> Result<R, RpcError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => Ok(r),
        Err(payload) => {
            if payload.is::<AlreadyResolved>() {
                panic::resume_unwind(payload);
            }
            let message = panic_message(payload.as_ref());
            error!(panic_message = %message, "captured panic in dispatch stage");
            Err(RpcError::internal(format!("panicked: {message}")))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

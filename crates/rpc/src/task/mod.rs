//! Single-assignment deferred results.
//!
//! A [`Task`] starts out waiting and is resolved exactly once, either with a value or with an
//! [`RpcError`]. Exactly one consumer observes the outcome: a completion handler attached
//! through [`Task::on_complete`] (directly or through the combinators), or an `.await`.
//!
//! Handlers attached after resolution run synchronously with the cached outcome, so the order
//! of subscription and resolution never matters.
//!
//! A task is `!Send`: it lives on the thread that created it, and work done elsewhere must
//! hand its result back to that thread before resolving it.
//!
//! # Example
//! ```
//! use micro_rpc::Task;
//!
//! let task = Task::<i32>::new();
//! let doubled = task.clone().map(|v| Ok(v * 2));
//!
//! task.finish(21);
//! doubled.on_complete(|outcome| assert_eq!(outcome, Ok(42)));
//! ```

mod future;
mod guard;

pub(crate) use guard::guard;

use crate::error::{AlreadyResolved, RpcError};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::task::Waker;

pub type Outcome<T> = Result<T, RpcError>;

type Callback<T> = Box<dyn FnOnce(Outcome<T>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Waiting,
    Finished,
    Error,
}

pub struct Task<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

struct Inner<T> {
    state: TaskState,
    outcome: Option<Outcome<T>>,
    subscriber: Subscriber<T>,
}

enum Subscriber<T> {
    None,
    Callback(Callback<T>),
    Awaiting(Option<Waker>),
    Delivered,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("state", &self.state()).finish()
    }
}

impl<T> Task<T> {
    pub fn state(&self) -> TaskState {
        self.inner.borrow().state
    }

    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.state() == TaskState::Waiting
    }
}

impl<T: 'static> Default for Task<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Task<T> {
    /// Creates a task in the waiting state.
    pub fn new() -> Self {
        let inner = Inner { state: TaskState::Waiting, outcome: None, subscriber: Subscriber::None };
        Self { inner: Rc::new(RefCell::new(inner)) }
    }

    pub fn finished(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    pub fn failed(error: RpcError) -> Self {
        Self::from_result(Err(error))
    }

    pub fn from_result(outcome: Outcome<T>) -> Self {
        let task = Self::new();
        task.complete(outcome);
        task
    }

    /// Resolves the task with a value.
    ///
    /// # Panics
    /// Panics with an [`AlreadyResolved`] payload if the task is no longer waiting.
    pub fn finish(&self, value: T) {
        self.complete(Ok(value));
    }

    /// Resolves the task with an error.
    ///
    /// # Panics
    /// Panics with an [`AlreadyResolved`] payload if the task is no longer waiting.
    pub fn fail(&self, error: RpcError) {
        self.complete(Err(error));
    }

    /// # Panics
    /// Panics with an [`AlreadyResolved`] payload if the task is no longer waiting.
    pub fn complete(&self, outcome: Outcome<T>) {
        if let Err(e) = self.try_complete(outcome) {
            std::panic::panic_any(e);
        }
    }

    pub fn try_finish(&self, value: T) -> Result<(), AlreadyResolved> {
        self.try_complete(Ok(value))
    }

    pub fn try_fail(&self, error: RpcError) -> Result<(), AlreadyResolved> {
        self.try_complete(Err(error))
    }

    pub fn try_complete(&self, outcome: Outcome<T>) -> Result<(), AlreadyResolved> {
        let callback = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != TaskState::Waiting {
                return Err(AlreadyResolved);
            }
            inner.state = if outcome.is_ok() { TaskState::Finished } else { TaskState::Error };

            match std::mem::replace(&mut inner.subscriber, Subscriber::Delivered) {
                Subscriber::Callback(callback) => callback,
                Subscriber::Awaiting(waker) => {
                    inner.outcome = Some(outcome);
                    inner.subscriber = Subscriber::Awaiting(None);
                    drop(inner);
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                    return Ok(());
                }
                Subscriber::None | Subscriber::Delivered => {
                    inner.outcome = Some(outcome);
                    inner.subscriber = Subscriber::None;
                    return Ok(());
                }
            }
        };

        // the borrow is released before running foreign code, which may touch this task again
        callback(outcome);
        Ok(())
    }

    /// Attaches the completion handler.
    ///
    /// A waiting task stores the handler; a resolved task invokes it immediately with the
    /// cached outcome.
    ///
    /// # Panics
    /// Panics if the task already has a consumer.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(Outcome<T>) + 'static,
    {
        let outcome = {
            let mut inner = self.inner.borrow_mut();
            assert!(matches!(inner.subscriber, Subscriber::None), "task already has a consumer");
            match inner.outcome.take() {
                Some(outcome) => {
                    inner.subscriber = Subscriber::Delivered;
                    outcome
                }
                None => {
                    inner.subscriber = Subscriber::Callback(Box::new(f));
                    return;
                }
            }
        };

        f(outcome);
    }

    /// Transforms a successful value; errors pass through untouched.
    pub fn map<U, F>(self, f: F) -> Task<U>
    where
        U: 'static,
        F: FnOnce(T) -> Outcome<U> + 'static,
    {
        self.map_maybe(move |outcome| f(outcome?))
    }

    /// Transforms the whole outcome.
    ///
    /// An error returned by `f`, or a panic raised inside it, fails the returned task.
    pub fn map_maybe<U, F>(self, f: F) -> Task<U>
    where
        U: 'static,
        F: FnOnce(Outcome<T>) -> Outcome<U> + 'static,
    {
        let next = Task::new();
        let resolver = next.clone();
        self.on_complete(move |outcome| {
            resolver.complete(guard(|| f(outcome)).and_then(|mapped| mapped));
        });
        next
    }

    /// Chains a continuation that itself produces a task; its outcome becomes the outcome of
    /// the returned task. Errors skip the continuation.
    pub fn then<U, F>(self, f: F) -> Task<U>
    where
        U: 'static,
        F: FnOnce(T) -> Task<U> + 'static,
    {
        self.then_maybe(move |outcome| match outcome {
            Ok(value) => f(value),
            Err(e) => Task::failed(e),
        })
    }

    pub fn then_maybe<U, F>(self, f: F) -> Task<U>
    where
        U: 'static,
        F: FnOnce(Outcome<T>) -> Task<U> + 'static,
    {
        let next = Task::new();
        let resolver = next.clone();
        self.on_complete(move |outcome| match guard(|| f(outcome)) {
            Ok(chained) => chained.on_complete(move |outcome| resolver.complete(outcome)),
            Err(e) => resolver.fail(e),
        });
        next
    }
}

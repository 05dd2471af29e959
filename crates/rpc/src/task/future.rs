use super::{Outcome, Subscriber, Task};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Awaiting a task makes the `.await` its single consumer.
///
/// # Panics
/// Polling panics if a completion handler was attached, or if the outcome was already taken.
impl<T: 'static> Future for Task<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.borrow_mut();
        match &inner.subscriber {
            Subscriber::None | Subscriber::Awaiting(_) => {}
            Subscriber::Callback(_) => panic!("task awaited while it has a completion handler"),
            Subscriber::Delivered => panic!("task polled after its outcome was taken"),
        }

        match inner.outcome.take() {
            Some(outcome) => {
                inner.subscriber = Subscriber::Delivered;
                Poll::Ready(outcome)
            }
            None => {
                inner.subscriber = Subscriber::Awaiting(Some(cx.waker().clone()));
                Poll::Pending
            }
        }
    }
}

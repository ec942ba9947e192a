use std::{
    future::Future,
    task::{Context, Poll},
    thread,
    time::Duration,
};

use futures::task::noop_waker_ref;

/// Drive a future to completion on the current thread. The provider SDK is
/// async but every storage operation is a synchronous blocking call, so each
/// request is polled in place with a noop waker.
pub fn block_on<Fut>(future: Fut) -> Fut::Output
where
    Fut: Future,
{
    let mut future = Box::pin(future);
    let mut context = Context::from_waker(noop_waker_ref());

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut context) {
            return output;
        }

        thread::sleep(Duration::from_millis(10));
    }
}

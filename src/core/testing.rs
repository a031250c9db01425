//! Test-only helpers.

use core::future::Future;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// Simple blocking executor for async tests (no external deps).
///
/// The futures under test never actually yield (mock sensors resolve
/// immediately), so busy-polling with a no-op waker is sufficient.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        const VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut fut = core::pin::pin!(fut);

    loop {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => continue,
        }
    }
}

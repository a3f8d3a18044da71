//! Splitting one single-pass stream into two.
//!
//! [`tee`] returns two branches that see identical items in identical order.
//! Only the tee polls the origin; whichever branch is ahead pushes a clone
//! of each item into the other branch's buffer. Buffers are unbounded, so a
//! lagging branch never stalls or loses data for the other one.

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use tracing::trace;

/// Shared state of a tee.
struct TeeState<S: Stream> {
    // `None` once the origin is exhausted.
    upstream: Option<S>,
    buffers: [VecDeque<S::Item>; 2],
    detached: [bool; 2],
}

/// Wakes every branch that is waiting on the origin.
#[derive(Default)]
struct TeeWaker {
    slots: Mutex<[Option<Waker>; 2]>,
}

impl TeeWaker {
    fn register(&self, side: usize, waker: &Waker) {
        let mut slots = self.slots.lock();
        match &slots[side] {
            Some(existing) if existing.will_wake(waker) => {}
            _ => slots[side] = Some(waker.clone()),
        }
    }

    fn clear(&self, side: usize) {
        self.slots.lock()[side] = None;
    }

    fn wake_side(&self, side: usize) {
        let waker = self.slots.lock()[side].take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl Wake for TeeWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let wakers = {
            let mut slots = self.slots.lock();
            [slots[0].take(), slots[1].take()]
        };
        for waker in wakers.into_iter().flatten() {
            waker.wake();
        }
    }
}

/// One branch of a [`tee`].
pub struct TeeBranch<S: Stream> {
    state: Arc<Mutex<TeeState<S>>>,
    waker: Arc<TeeWaker>,
    side: usize,
}

/// Split `stream` into two independent branches.
pub fn tee<S>(stream: S) -> (TeeBranch<S>, TeeBranch<S>)
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    let state = Arc::new(Mutex::new(TeeState {
        upstream: Some(stream),
        buffers: [VecDeque::new(), VecDeque::new()],
        detached: [false, false],
    }));
    let waker = Arc::new(TeeWaker::default());

    let left = TeeBranch {
        state: Arc::clone(&state),
        waker: Arc::clone(&waker),
        side: 0,
    };
    let right = TeeBranch {
        state,
        waker,
        side: 1,
    };
    (left, right)
}

impl<S: Stream> TeeBranch<S> {
    /// Number of items buffered for this branch.
    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffers[self.side].len()
    }

    fn other(&self) -> usize {
        1 - self.side
    }
}

impl<S> Stream for TeeBranch<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let (side, other) = (this.side, this.other());

        let mut guard = this.state.lock();
        let state = &mut *guard;

        if let Some(item) = state.buffers[side].pop_front() {
            return Poll::Ready(Some(item));
        }

        let Some(upstream) = state.upstream.as_mut() else {
            return Poll::Ready(None);
        };

        // The origin sees a waker that wakes both branches, so whichever
        // one is parked on it is resumed.
        this.waker.register(side, cx.waker());
        let upstream_waker = Waker::from(Arc::clone(&this.waker));
        let mut upstream_cx = Context::from_waker(&upstream_waker);

        match upstream.poll_next_unpin(&mut upstream_cx) {
            Poll::Ready(Some(item)) => {
                this.waker.clear(side);
                if !state.detached[other] {
                    state.buffers[other].push_back(item.clone());
                    this.waker.wake_side(other);
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                trace!(side, "tee origin exhausted");
                this.waker.clear(side);
                state.upstream = None;
                this.waker.wake_side(other);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: Stream> Drop for TeeBranch<S> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.detached[self.side] = true;
        state.buffers[self.side].clear();
        if state.detached[self.other()] {
            state.upstream = None;
        }
        self.waker.clear(self.side);
    }
}

impl<S: Stream> std::fmt::Debug for TeeBranch<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeBranch")
            .field("side", &self.side)
            .field("buffered", &self.buffered_len())
            .finish()
    }
}

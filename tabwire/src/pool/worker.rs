use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
    time::Duration,
};
use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender},
        oneshot,
    },
    time::{Instant, Sleep, sleep},
};

use super::{ExhaustedPolicy, Lease, PoolConfig};
use crate::{
    Result,
    common::{log_error, log_warn, verbose},
    transport::Connect,
};

/// Least sleep between idle eviction cycles.
const MIN_CYCLE: Duration = Duration::from_millis(1);

pub(crate) struct WorkerHandle<T> {
    send: UnboundedSender<WorkerMessage<T>>,
    state: State<T>,
}

enum State<T> {
    Idle,
    Recv(AcquireRecv<T>),
}

impl<T> WorkerHandle<T> {
    pub(crate) fn new<C>(connector: C, config: PoolConfig) -> (Self, WorkerFuture<C>)
    where
        C: Connect<Transport = T>,
    {
        let (send, recv) = mpsc::unbounded_channel();
        let weak = send.downgrade();
        let sleep = config.idle_timeout.map(|timeout| Box::pin(sleep(timeout.max(MIN_CYCLE))));
        (
            Self { send, state: State::Idle },
            WorkerFuture {
                connector,
                config,
                slots: Vec::new(),
                queue: VecDeque::new(),
                weak,
                recv,
                sleep,
            },
        )
    }

    pub(crate) fn poll_acquire(&mut self, cx: &mut Context) -> Poll<Result<Lease<T>>> {
        loop {
            match &mut self.state {
                State::Idle => {
                    let (tx, rx) = oneshot::channel();
                    if self.send.send(WorkerMessage::Acquire(tx)).is_err() {
                        return Poll::Ready(Err(closed().into()));
                    }
                    self.state = State::Recv(rx);
                }
                State::Recv(recv) => {
                    let result = ready!(Pin::new(recv).poll(cx));
                    self.state = State::Idle;
                    return Poll::Ready(result.unwrap_or_else(|_| Err(closed().into())));
                }
            }
        }
    }
}

impl<T> Clone for WorkerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            send: self.send.clone(),
            state: State::Idle,
        }
    }
}

impl<T> std::fmt::Debug for WorkerHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WorkerHandle")
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "pool worker closed")
}

type AcquireSend<T> = oneshot::Sender<Result<Lease<T>>>;
type AcquireRecv<T> = oneshot::Receiver<Result<Lease<T>>>;

pub(crate) enum WorkerMessage<T> {
    Acquire(AcquireSend<T>),
    Release(Arc<T>),
    Discard(Arc<T>),
}

/// Transport handle tracked by the worker.
struct Slot<T> {
    handle: Arc<T>,
    leases: usize,
    released_at: Instant,
}

impl<T> Slot<T> {
    fn is_idle(&self) -> bool {
        self.leases == 0
    }
}

enum Lend<T> {
    Ready(Result<Lease<T>>),
    Exhausted,
}

/// The task owning every transport handle.
///
/// All bookkeeping happens here, callers only exchange messages, so two
/// callers can never claim the same idle handle.
pub(crate) struct WorkerFuture<C: Connect> {
    connector: C,
    config: PoolConfig,

    slots: Vec<Slot<C::Transport>>,
    /// callers waiting for a handle, oldest first
    queue: VecDeque<AcquireSend<C::Transport>>,

    weak: WeakUnboundedSender<WorkerMessage<C::Transport>>,
    recv: UnboundedReceiver<WorkerMessage<C::Transport>>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl<C: Connect> Unpin for WorkerFuture<C> { }

impl<C: Connect> WorkerFuture<C> {
    fn lend(&mut self, i: usize) -> Result<Lease<C::Transport>> {
        let send = self.weak.upgrade().ok_or_else(closed)?;
        let slot = &mut self.slots[i];
        slot.leases += 1;
        Ok(Lease::new(slot.handle.clone(), send))
    }

    fn try_lend(&mut self) -> Lend<C::Transport> {
        let idle = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_idle())
            .max_by_key(|(_, slot)| slot.released_at)
            .map(|(i, _)| i);

        if let Some(i) = idle {
            return Lend::Ready(self.lend(i));
        }

        if self.slots.len() < self.config.max_count {
            return match self.connector.connect() {
                Ok(handle) => {
                    self.slots.push(Slot {
                        handle: Arc::new(handle),
                        leases: 0,
                        released_at: Instant::now(),
                    });
                    Lend::Ready(self.lend(self.slots.len() - 1))
                }
                Err(err) => {
                    log_error!("failed to create transport: {err}");
                    Lend::Ready(Err(err.into()))
                }
            };
        }

        Lend::Exhausted
    }

    fn acquire(&mut self, send: AcquireSend<C::Transport>) {
        if !self.queue.is_empty() {
            self.queue.push_back(send);
            return;
        }

        match self.try_lend() {
            // a dropped receiver drops the lease, which release it back
            Lend::Ready(result) => { let _ = send.send(result); }
            Lend::Exhausted => match self.config.exhausted {
                ExhaustedPolicy::Wait => {
                    log_warn!("pool exhausted with {} handles, caller queued", self.slots.len());
                    self.queue.push_back(send);
                }
                ExhaustedPolicy::Share => {
                    let Some(i) = self
                        .slots
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, slot)| slot.released_at)
                        .map(|(i, _)| i)
                    else {
                        self.queue.push_back(send);
                        return;
                    };
                    log_warn!("pool exhausted with {} handles, sharing a busy handle", self.slots.len());
                    let _ = send.send(self.lend(i));
                }
            },
        }
    }

    fn position(&self, handle: &Arc<C::Transport>) -> Option<usize> {
        self.slots.iter().position(|slot| Arc::ptr_eq(&slot.handle, handle))
    }

    fn release(&mut self, handle: Arc<C::Transport>) {
        if let Some(i) = self.position(&handle) {
            let slot = &mut self.slots[i];
            slot.leases = slot.leases.saturating_sub(1);
            slot.released_at = Instant::now();
        }
        self.serve_queue();
    }

    fn discard(&mut self, handle: Arc<C::Transport>) {
        if let Some(i) = self.position(&handle) {
            self.slots.swap_remove(i);
        }
        self.serve_queue();
    }

    fn serve_queue(&mut self) {
        while let Some(send) = self.queue.pop_front() {
            if send.is_closed() {
                continue;
            }
            match self.try_lend() {
                Lend::Ready(result) => { let _ = send.send(result); }
                Lend::Exhausted => {
                    self.queue.push_front(send);
                    break;
                }
            }
        }
    }

    /// Drop handles idle longer than the timeout, then reset `sleep` to the next expiry.
    fn evict_idle(&mut self) {
        let Some(timeout) = self.config.idle_timeout else {
            return;
        };

        let before = self.slots.len();
        self.slots.retain(|slot| !slot.is_idle() || slot.released_at.elapsed() < timeout);
        if self.slots.len() != before {
            verbose!("evicted {} idle handles", before - self.slots.len());
        }

        let next = self
            .slots
            .iter()
            .filter(|slot| slot.is_idle())
            .fold(timeout, |acc, slot| timeout.saturating_sub(slot.released_at.elapsed()).min(acc));

        if let Some(sleep) = self.sleep.as_mut() {
            sleep.as_mut().reset(Instant::now() + next.max(MIN_CYCLE));
        }
    }
}

impl<C: Connect> Future for WorkerFuture<C> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let me = self.get_mut();

        while let Poll::Ready(msg) = me.recv.poll_recv(cx) {
            let Some(msg) = msg else {
                // every pool handle and lease are dropped
                return Poll::Ready(());
            };

            match msg {
                WorkerMessage::Acquire(send) => me.acquire(send),
                WorkerMessage::Release(handle) => me.release(handle),
                WorkerMessage::Discard(handle) => me.discard(handle),
            }
        }

        loop {
            let Some(sleep) = me.sleep.as_mut() else { break };
            if sleep.as_mut().poll(cx).is_pending() {
                break;
            }
            me.evict_idle();
        }

        verbose!(
            "pool: handles={}, busy={}, queued={}",
            me.slots.len(),
            me.slots.iter().filter(|slot| !slot.is_idle()).count(),
            me.queue.len(),
        );

        Poll::Pending
    }
}

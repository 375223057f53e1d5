//! Transport handle pooling.
//!
//! A [`Pool`] owns at most [`PoolConfig::max_count`] transport handles.
//! [`Pool::acquire`] returns a [`Lease`], which returns its handle to the pool
//! when dropped. A cancelled acquire never leaks a handle.
use std::{
    ops::Deref,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    Result,
    transport::{Connect, Transport},
};

mod config;
mod worker;

pub use config::{DEFAULT_MAX_COUNT, ExhaustedPolicy, PoolConfig};
use worker::{WorkerHandle, WorkerMessage};

/// Transport handle pool.
pub struct Pool<T> {
    handle: WorkerHandle<T>,
}

impl<T: Transport> Pool<T> {
    /// Create [`Pool`] configured from environment variable.
    ///
    /// See [`PoolConfig::from_env`] for more details on env.
    ///
    /// # Panics
    ///
    /// Panics if called outside of tokio runtime.
    pub fn new<C>(connector: C) -> Pool<T>
    where
        C: Connect<Transport = T>,
    {
        Self::with_config(connector, PoolConfig::from_env())
    }

    /// Create [`Pool`] with given config.
    ///
    /// No handle is created until the first acquire.
    ///
    /// # Panics
    ///
    /// Panics if called outside of tokio runtime.
    pub fn with_config<C>(connector: C, config: PoolConfig) -> Pool<T>
    where
        C: Connect<Transport = T>,
    {
        let (handle, worker) = WorkerHandle::new(connector, config);
        tokio::spawn(worker);
        Self { handle }
    }

    /// Acquire a transport handle.
    pub fn acquire(&self) -> PoolAcquire<T> {
        PoolAcquire { handle: self.handle.clone() }
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone() }
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").finish_non_exhaustive()
    }
}

/// Future returned from [`Pool::acquire`].
#[derive(Debug)]
pub struct PoolAcquire<T> {
    handle: WorkerHandle<T>,
}

impl<T> Future for PoolAcquire<T> {
    type Output = Result<Lease<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().handle.poll_acquire(cx)
    }
}

/// Checked out transport handle.
///
/// Dropping the lease returns the handle to the pool.
pub struct Lease<T> {
    handle: Arc<T>,
    send: UnboundedSender<WorkerMessage<T>>,
    discard: bool,
}

impl<T> Lease<T> {
    pub(crate) fn new(handle: Arc<T>, send: UnboundedSender<WorkerMessage<T>>) -> Self {
        Self { handle, send, discard: false }
    }

    /// Remove the handle from the pool instead of returning it.
    ///
    /// Used for failed handles, the pool creates a fresh one on demand.
    pub fn discard(mut self) {
        self.discard = true;
    }

    /// Returns the shared handle.
    pub fn handle(&self) -> &Arc<T> {
        &self.handle
    }
}

impl<T> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.handle
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        let handle = self.handle.clone();
        let msg = if self.discard {
            WorkerMessage::Discard(handle)
        } else {
            WorkerMessage::Release(handle)
        };
        // worker gone means the pool is gone too
        let _ = self.send.send(msg);
    }
}

impl<T> std::fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("discard", &self.discard).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use std::{
        io,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::transport::{HttpRequest, HttpResponse};

    #[derive(Default)]
    struct Probe {
        in_use: AtomicBool,
    }

    impl Transport for Probe {
        async fn send(&self, _: HttpRequest) -> io::Result<HttpResponse> {
            Ok(HttpResponse::new(200, ""))
        }
    }

    fn pool(config: PoolConfig) -> (Pool<Probe>, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let pool = Pool::with_config(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, io::Error>(Probe::default())
            },
            config,
        );
        (pool, created)
    }

    #[tokio::test]
    async fn single_handle_is_never_shared() {
        let (pool, created) = pool(PoolConfig::default().max_count(1));

        let tasks = (0..8)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let lease = pool.acquire().await.unwrap();
                    assert!(!lease.in_use.swap(true, Ordering::SeqCst), "double acquire");
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    lease.in_use.store(false, Ordering::SeqCst);
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn idle_handle_is_reused() {
        let (pool, created) = pool(PoolConfig::default().max_count(4));

        let first = pool.acquire().await.unwrap();
        let first_ptr = Arc::as_ptr(first.handle());
        drop(first);

        let second = pool.acquire().await.unwrap();
        assert_eq!(Arc::as_ptr(second.handle()), first_ptr);

        let third = pool.acquire().await.unwrap();
        assert_ne!(Arc::as_ptr(third.handle()), first_ptr);
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn share_policy_lends_busy_handle() {
        let (pool, created) = pool(PoolConfig::default().max_count(1).exhausted(ExhaustedPolicy::Share));

        let a = pool.acquire().await.unwrap();
        let b = tokio::time::timeout(Duration::from_secs(1), pool.acquire()).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(a.handle(), b.handle()));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_policy_queues_until_release() {
        let (pool, _) = pool(PoolConfig::default().max_count(1));

        let a = pool.acquire().await.unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await.is_err());

        drop(a);
        tokio::time::timeout(Duration::from_secs(1), pool.acquire()).await.unwrap().unwrap();
    }

    #[cfg(feature = "log")]
    #[tokio::test]
    async fn queued_caller_is_warned() {
        use std::sync::Mutex;

        struct Capture(Mutex<Vec<String>>);

        impl log::Log for Capture {
            fn enabled(&self, metadata: &log::Metadata) -> bool {
                metadata.level() <= log::Level::Warn
            }

            fn log(&self, record: &log::Record) {
                if self.enabled(record.metadata()) {
                    self.0.lock().unwrap().push(record.args().to_string());
                }
            }

            fn flush(&self) { }
        }

        static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Warn);

        let (pool, _) = pool(PoolConfig::default().max_count(1));
        let a = pool.acquire().await.unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await.is_err());
        drop(a);

        let warned = CAPTURE.0.lock().unwrap().iter().any(|msg| msg.contains("caller queued"));
        assert!(warned);
    }

    #[tokio::test]
    async fn discarded_handle_is_replaced() {
        let (pool, created) = pool(PoolConfig::default().max_count(1));

        let a = pool.acquire().await.unwrap();
        let a_handle = a.handle().clone();
        let waiter = tokio::spawn({
            let pool = pool.clone();
            async move { Arc::as_ptr(pool.acquire().await.unwrap().handle()) as usize }
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        a.discard();

        let b_ptr = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_ne!(b_ptr, Arc::as_ptr(&a_handle) as usize);
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn idle_handle_is_evicted() {
        let (pool, created) = pool(PoolConfig::default().idle_timeout(Duration::from_millis(10)));

        drop(pool.acquire().await.unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(pool.acquire().await.unwrap());

        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_connect_is_reported() {
        let pool = Pool::<Probe>::with_config(
            || Err::<Probe, _>(io::Error::from(io::ErrorKind::ConnectionRefused)),
            PoolConfig::default(),
        );

        let err = pool.acquire().await.unwrap_err();
        assert!(err.is_retryable());
    }
}

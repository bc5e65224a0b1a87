//! Where adapter work runs
//!
//! Every adapter call produces one future. An [`Executor`] decides where
//! it runs: spawned on a Tokio runtime so the caller is never blocked, or
//! deferred until the caller awaits it on its own task.

use crate::errors::{Result, StreamError};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Dispatches adapter work
pub trait Executor: Send + Sync {
    fn execute<T: Send + 'static>(&self, work: BoxFuture<'static, T>) -> TaskHandle<T>;
}

/// Handle to work handed to an [`Executor`]
pub enum TaskHandle<T> {
    /// Running on a runtime worker
    Spawned(JoinHandle<T>),

    /// Not started; runs when first polled
    Deferred(BoxFuture<'static, T>),
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            TaskHandle::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| joined.map_err(join_error)),
            TaskHandle::Deferred(work) => work.as_mut().poll(cx).map(Ok),
        }
    }
}

fn join_error(err: JoinError) -> StreamError {
    if err.is_cancelled() {
        StreamError::Cancelled
    } else if err.is_panic() {
        StreamError::TaskFailed("task panicked".to_string())
    } else {
        StreamError::TaskFailed(err.to_string())
    }
}

/// Spawns work onto a Tokio runtime
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Use the runtime the caller is currently inside
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| StreamError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self { handle })
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Executor for TokioExecutor {
    fn execute<T: Send + 'static>(&self, work: BoxFuture<'static, T>) -> TaskHandle<T> {
        TaskHandle::Spawned(self.handle.spawn(work))
    }
}

/// Runs work on whichever task awaits it. Nothing happens until then.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute<T: Send + 'static>(&self, work: BoxFuture<'static, T>) -> TaskHandle<T> {
        TaskHandle::Deferred(work)
    }
}

/// Deferred result of one adapter call.
///
/// Await it for the outcome, call [`Task::cancel`] to abort it, or drop it.
/// Dropping a spawned task detaches it; dropping a deferred one discards
/// the work.
pub struct Task<T> {
    handle: TaskHandle<Result<T>>,
    cancel: CancellationToken,
}

/// Task resolving to the collected chunks of a stream
pub type StreamTask<R> = Task<Vec<R>>;

impl<T> Task<T> {
    pub(crate) fn new(handle: TaskHandle<Result<T>>, cancel: CancellationToken) -> Self {
        Self { handle, cancel }
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by this task and its producer
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True if the work was dispatched to a runtime rather than deferred
    pub fn is_spawned(&self) -> bool {
        matches!(self.handle, TaskHandle::Spawned(_))
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().handle)
            .poll(cx)
            .map(|outcome| outcome.and_then(|result| result))
    }
}

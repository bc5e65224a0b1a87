//! Streaming aggregation
//!
//! Three layers, each usable on its own:
//! - [`project`] filters and maps a chunk stream, ending it with
//!   `Cancelled` once the token fires.
//! - [`drain`] feeds each projected value to a callback and collects it.
//! - [`StreamingAdapter::run_streaming`] opens the source, projects, drains,
//!   and hands the whole thing to an executor as one [`Task`].
//!
//! The outcome is all-or-nothing: a completed `Vec` in arrival order, the
//! first error raised by the source or the callback, or `Cancelled`. Chunks
//! seen before a failure are never returned.

use crate::adapter::executor::{Executor, StreamTask, Task, TokioExecutor};
use crate::errors::{Result, StreamError};
use crate::service::ChunkStream;
use futures_util::StreamExt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Filter-map `source` through `projector`.
///
/// Chunks projecting to `None` are consumed and dropped. The token is
/// checked before every pull from `source`; once it fires the stream yields
/// `Err(Cancelled)` and ends, even if `source` had already run dry.
pub fn project<T, R, P>(source: ChunkStream<T>, mut projector: P, cancel: CancellationToken) -> ChunkStream<R>
where
    T: Send + 'static,
    R: Send + 'static,
    P: FnMut(T) -> Option<R> + Send + 'static,
{
    let mut source = source;

    Box::pin(async_stream::try_stream! {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(StreamError::Cancelled),
                next = source.next() => Ok(next),
            };

            let Some(chunk) = next? else { break };
            if let Some(value) = projector(chunk?) {
                yield value;
            }
        }

        if cancel.is_cancelled() {
            Err::<(), StreamError>(StreamError::Cancelled)?;
        }
    })
}

/// Invoke `on_chunk` for every value, in order, and collect them.
///
/// The next value is not pulled until the callback returns. The first error,
/// from either the stream or the callback, ends the drain.
pub async fn drain<R, C>(mut projected: ChunkStream<R>, mut on_chunk: C) -> Result<Vec<R>>
where
    C: FnMut(&R) -> Result<()>,
{
    let mut results = Vec::new();
    while let Some(value) = projected.next().await {
        let value = value?;
        on_chunk(&value)?;
        results.push(value);
    }
    Ok(results)
}

/// Turns streaming calls into callback-plus-collected-list tasks
#[derive(Debug, Clone)]
pub struct StreamingAdapter<E = TokioExecutor> {
    executor: E,
}

impl StreamingAdapter<TokioExecutor> {
    /// Adapter spawning onto the current Tokio runtime
    pub fn tokio() -> Result<Self> {
        Ok(Self::new(TokioExecutor::current()?))
    }
}

impl<E: Executor> StreamingAdapter<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run a single-shot operation as a task that also resolves to
    /// `Cancelled` when `cancel` fires first.
    pub fn run<T, F>(&self, work: F, cancel: CancellationToken) -> Task<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let token = cancel.clone();
        let guarded = async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(StreamError::Cancelled),
                result = work => result,
            }
        };

        Task::new(self.executor.execute(Box::pin(guarded)), cancel)
    }

    /// Open `source`, project every chunk, call `on_chunk` for each
    /// surviving value and collect them in arrival order.
    ///
    /// `cancel` is the same token the producer behind `source` should
    /// observe; [`Task::cancel`] fires it. Pass a child token when it must
    /// not reach other work sharing the parent.
    pub fn run_streaming<T, R, F, C, P>(
        &self,
        source: F,
        on_chunk: C,
        projector: P,
        cancel: CancellationToken,
    ) -> StreamTask<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Future<Output = Result<ChunkStream<T>>> + Send + 'static,
        C: FnMut(&R) -> Result<()> + Send + 'static,
        P: FnMut(T) -> Option<R> + Send + 'static,
    {
        let token = cancel.clone();
        let work = async move {
            let projected = project(source.await?, projector, token);
            let outcome = drain(projected, on_chunk).await;

            match &outcome {
                Ok(results) => debug!(chunks = results.len(), "stream drained"),
                Err(StreamError::Cancelled) => debug!("stream cancelled"),
                Err(e) => warn!(error = %e, "stream failed"),
            }
            outcome
        };

        self.run(work, cancel)
    }
}

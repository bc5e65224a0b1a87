//! Streaming aggregation adapters
//!
//! Turns lazily-produced chunk streams into a per-chunk callback plus a
//! collected, ordered result delivered as one cancellable task.

pub mod aggregate;
pub mod callback;
pub mod executor;

pub use aggregate::{drain, project, StreamingAdapter};
pub use callback::{CallbackClient, DEFAULT_MODEL};
pub use executor::{Executor, InlineExecutor, StreamTask, Task, TaskHandle, TokioExecutor};

//! Concurrent task execution engine: bounded work distribution, synchronized
//! shared state and multi-source event waiting, built on OS threads and
//! blocking synchronization.
//!
//! # Key Components
//!
//! ## Work Distribution
//!
//! - [`queue::TaskQueue`] - A bounded multi-producer, multi-consumer FIFO
//!   queue with explicit close-and-drain semantics
//! - [`worker_pool::WorkerPool`] - A fixed-size pool of worker threads that
//!   drains a shared queue and reports per-task outcomes
//! - [`batch`] - One-call fan-out/fan-in over a payload collection
//!
//! ## Shared State
//!
//! - [`cache::SharedCache`] - A key-value map under reader/writer locking
//!   with explicit writer preference
//! - [`counter::Counter`] - An integer counter under an exclusive lock
//!
//! ## Coordination
//!
//! - [`completion::CompletionTracker`] - Outstanding-work accounting with
//!   blocking and timed waits
//! - [`once::OnceGuard`] - Exactly-once initialization under concurrent
//!   first access
//! - [`cancel::CancelToken`] - Cooperative cancellation flag
//! - [`select`] - Waiting on multiple readiness sources with a deadline
//!
//! ## Boundaries
//!
//! - [`sink::ResultSink`] - The seam through which task results leave the
//!   engine
//! - [`codec::Codec`] - The seam through which payloads are serialized by an
//!   external collaborator
//!
//! # Design Philosophy
//!
//! Every shared structure here is an explicit instance handed to the code
//! that uses it; there are no process-wide singletons. Blocking operations
//! either complete, fail with a typed error, or (where documented) wait
//! indefinitely for a condition under the caller's control.

pub mod batch;
pub mod cache;
pub mod cancel;
pub mod codec;
pub mod completion;
pub mod counter;
pub mod once;
pub mod queue;
pub mod select;
pub mod sink;
pub mod task;
pub mod worker_pool;

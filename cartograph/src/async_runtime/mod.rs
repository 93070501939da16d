//! Thin wrapper around the async runtime used to run background work.
//!
//! Kept as a separate module (rather than calling `tokio::spawn` directly
//! everywhere) so the rest of the crate doesn't need to know which runtime is
//! in use.

use std::future::Future;

/// Spawns a future on the runtime's thread pool, detached from the caller.
pub fn spawn<T>(future: T)
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    tokio::spawn(future);
}

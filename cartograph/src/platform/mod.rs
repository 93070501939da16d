//! The abstract contract the core consumes to issue and cancel URL
//! transport requests, and to ask the embedding application to (re)render.

use crate::error::CartographError;
use crate::url::Url;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one in-flight (or already completed) URL request, returned by
/// [`PlatformService::start_url_request`] and accepted by
/// [`PlatformService::cancel_url_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl RequestHandle {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Outcome delivered to a request's callback: the downloaded bytes, or the
/// error that prevented delivery (including a cancellation, surfaced as
/// [`CartographError::IO`] per the advisory-cancellation contract).
pub type UrlRequestResult = Result<Bytes, CartographError>;

/// A callback invoked exactly once with the outcome of a URL request,
/// possibly from a worker thread.
pub type UrlRequestCallback = Box<dyn FnOnce(UrlRequestResult) + Send>;

/// Platform request/render contract the core consumes. External collaborator
/// interface: the core never assumes a particular I/O stack or render loop,
/// only this surface.
pub trait PlatformService: Send + Sync {
    /// Issues a URL request. `callback` fires exactly once, with either the
    /// response bytes or an error, possibly on a different thread.
    fn start_url_request(&self, url: &Url, callback: UrlRequestCallback) -> RequestHandle;

    /// Requests cancellation of a previously started request. Advisory: the
    /// callback may still fire afterwards, with an error set.
    fn cancel_url_request(&self, handle: RequestHandle);

    /// Asks the embedding application to schedule a render pass.
    fn request_render(&self);

    /// Enables or disables continuous (every-frame) rendering, as opposed to
    /// rendering only on explicit `request_render` calls.
    fn set_continuous_rendering(&self, continuous: bool);

    /// Shuts the service down: no further requests are issued; outstanding
    /// ones are best-effort cancelled.
    fn shutdown(&self);
}

pub mod native;

/// Platform service implementation used outside of test doubles.
pub type PlatformServiceImpl = native::NativePlatformService;

//! Platform service backed by `reqwest`, for native (non-browser) hosts.

use super::{PlatformService, RequestHandle, UrlRequestCallback};
use crate::error::CartographError;
use crate::messenger::Messenger;
use crate::url::Url;
use bytes::Bytes;
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// `reqwest`-backed [`PlatformService`]. Each in-flight request is tracked
/// by a cancellation flag; cancelling sets the flag, which the request task
/// checks right before invoking the callback (advisory cancellation, per the
/// platform contract: the callback may still fire, with an error set).
#[derive(Clone)]
pub struct NativePlatformService {
    http_client: reqwest::Client,
    in_flight: Arc<Mutex<HashMap<RequestHandle, Arc<AtomicBool>>>>,
    shutdown: Arc<AtomicBool>,
    continuous_rendering: Arc<AtomicBool>,
    messenger: Option<Arc<dyn Messenger>>,
}

impl NativePlatformService {
    /// Creates a service with no render-request listener attached.
    pub fn new() -> Self {
        Self::with_messenger(None)
    }

    /// Creates a service that forwards `request_render` to `messenger`.
    pub fn with_messenger(messenger: Option<Arc<dyn Messenger>>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("cartograph/0.1")
            .build()
            .expect("failed to initialize http client");

        Self {
            http_client,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            continuous_rendering: Arc::new(AtomicBool::new(false)),
            messenger,
        }
    }

    /// True if continuous (every-frame) rendering is currently requested.
    pub fn is_continuous_rendering(&self) -> bool {
        self.continuous_rendering.load(Ordering::Acquire)
    }
}

impl Default for NativePlatformService {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformService for NativePlatformService {
    fn start_url_request(&self, url: &Url, callback: UrlRequestCallback) -> RequestHandle {
        let handle = RequestHandle::next();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.in_flight.lock().insert(handle, cancel_flag.clone());

        if self.shutdown.load(Ordering::Acquire) {
            self.in_flight.lock().remove(&handle);
            callback(Err(CartographError::IO));
            return handle;
        }

        let client = self.http_client.clone();
        let url = url.clone();
        let in_flight = self.in_flight.clone();

        crate::async_runtime::spawn(async move {
            let result = match url.scheme() {
                "file" => load_from_file(&url).await,
                _ => load_from_web(&client, &url.string()).await,
            };
            let result = if cancel_flag.load(Ordering::Acquire) {
                Err(CartographError::IO)
            } else {
                result
            };
            in_flight.lock().remove(&handle);
            callback(result);
        });

        handle
    }

    fn cancel_url_request(&self, handle: RequestHandle) {
        if let Some(flag) = self.in_flight.lock().get(&handle) {
            flag.store(true, Ordering::Release);
        }
    }

    fn request_render(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    fn set_continuous_rendering(&self, continuous: bool) {
        self.continuous_rendering.store(continuous, Ordering::Release);
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        for flag in self.in_flight.lock().values() {
            flag.store(true, Ordering::Release);
        }
    }
}

async fn load_from_web(client: &reqwest::Client, url: &str) -> Result<Bytes, CartographError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        info!("failed to load {url}: {}", response.status());
        return Err(CartographError::IO);
    }

    Ok(response.bytes().await?)
}

async fn load_from_file(url: &Url) -> Result<Bytes, CartographError> {
    let path = url.to_file_path()?;
    tokio::task::spawn_blocking(move || std::fs::read(path))
        .await
        .map_err(|err| CartographError::Generic(format!("file read task panicked: {err}")))?
        .map(Bytes::from)
        .map_err(CartographError::FsIo)
}

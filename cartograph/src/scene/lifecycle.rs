//! Owns the current [`Scene`] and serializes scene transitions through an
//! [`OrderedWorker`].

use crate::platform::PlatformService;
use crate::scene::{Scene, SceneError, SceneId, SceneOptions};
use crate::tile::{TileCache, TileManagerConfig};
use crate::work_pool::{OrderedWorker, WorkerPool};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Sequences scene load/dispose and owns the "current" scene pointer.
///
/// Async loads enqueue two tasks, in order, on a single ordered worker: a
/// *load* task that builds the new scene, and a *dispose* task that drops
/// the outgoing one. Because the worker is FIFO and single-threaded, a
/// dispose always finishes before a load submitted after it begins, and the
/// "current" scene is always the *last submitted* one, independent of how
/// far its load has progressed.
pub struct SceneLifecycle {
    platform: Arc<dyn PlatformService>,
    decode_pool: WorkerPool,
    cache: Arc<TileCache>,
    manager_config: TileManagerConfig,
    worker: OrderedWorker,
    next_id: AtomicU64,
    current: Mutex<Option<Arc<Scene>>>,
}

impl SceneLifecycle {
    /// Creates a lifecycle with no current scene. `platform` backs every
    /// scene's importer and tile sources; `cache` is shared by every scene
    /// built through this lifecycle (tiles outlive their originating scene
    /// as long as something still pins them).
    pub fn new(platform: Arc<dyn PlatformService>, cache: Arc<TileCache>, manager_config: TileManagerConfig) -> Self {
        Self {
            platform,
            decode_pool: WorkerPool::new(4),
            cache,
            manager_config,
            worker: OrderedWorker::new(),
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
        }
    }

    /// The scene currently owned by the Map, if any load has completed.
    pub fn current(&self) -> Option<Arc<Scene>> {
        self.current.lock().clone()
    }

    fn next_id(&self) -> SceneId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Loads `options` as the new current scene.
    ///
    /// `on_ready` fires once, carrying the new scene's id and its
    /// accumulated load-time errors, from whichever thread finished the
    /// build (the calling thread for a sync load, the ordered worker for an
    /// async one). Returns the new scene's id immediately.
    pub fn load_scene(
        &self,
        options: SceneOptions,
        async_load: bool,
        on_ready: impl FnOnce(SceneId, Vec<SceneError>) + Send + 'static,
    ) -> SceneId {
        let id = self.next_id();
        let cancel = Arc::new(AtomicBool::new(false));

        if !async_load {
            let scene = Scene::new_loading(id, cancel.clone());
            match Scene::build_ready(
                &options,
                self.platform.clone(),
                self.decode_pool.clone(),
                self.cache.clone(),
                self.manager_config,
                cancel,
            ) {
                Ok(ready) => {
                    let errors = ready.errors.clone();
                    scene.mark_ready(ready);
                    let old = self.current.lock().replace(scene);
                    drop(old);
                    on_ready(id, errors);
                }
                Err(()) => scene.mark_cancelled(),
            }
            return id;
        }

        let old = self.current.lock().take();
        if let Some(old) = &old {
            old.cancel_tasks();
        }

        let new_scene = Scene::new_loading(id, cancel.clone());
        *self.current.lock() = Some(new_scene.clone());

        let platform = self.platform.clone();
        let decode_pool = self.decode_pool.clone();
        let cache = self.cache.clone();
        let manager_config = self.manager_config;
        let render_platform = self.platform.clone();
        let load_scene = new_scene.clone();

        self.worker.post(move || {
            match Scene::build_ready(&options, platform, decode_pool, cache, manager_config, cancel) {
                Ok(ready) => {
                    let errors = ready.errors.clone();
                    load_scene.mark_ready(ready);
                    on_ready(id, errors);
                    render_platform.request_render();
                }
                Err(()) => load_scene.mark_cancelled(),
            }
        });

        self.worker.post(move || {
            let Some(old) = old else { return };
            let outstanding = Arc::strong_count(&old) - 1;
            if outstanding > 0 {
                log::warn!(
                    "scene {} disposed with {outstanding} outstanding reference(s): a worker or importer still holds it",
                    old.id()
                );
            }
            drop(old);
        });

        id
    }

    /// Shuts the lifecycle down: stops the platform from accepting new URL
    /// requests (best-effort cancelling outstanding ones), then joins the
    /// ordered worker once its queued dispose/load tasks finish draining.
    /// The decode pool needs no separate join — it has no dedicated threads
    /// of its own to stop, only a concurrency cap on the async runtime's
    /// blocking pool.
    pub fn shutdown(&mut self) {
        self.platform.shutdown();
        self.worker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CartographError;
    use crate::platform::{RequestHandle, UrlRequestCallback};
    use crate::tile::TileCacheLimits;
    use crate::url::Url;
    use bytes::Bytes;
    use std::sync::mpsc;

    struct FakePlatform;
    impl PlatformService for FakePlatform {
        fn start_url_request(&self, _url: &Url, callback: UrlRequestCallback) -> RequestHandle {
            callback(Ok(Bytes::from_static(b"root_only: true")));
            RequestHandle::next()
        }
        fn cancel_url_request(&self, _handle: RequestHandle) {}
        fn request_render(&self) {}
        fn set_continuous_rendering(&self, _continuous: bool) {}
        fn shutdown(&self) {}
    }

    fn lifecycle() -> SceneLifecycle {
        SceneLifecycle::new(
            Arc::new(FakePlatform),
            Arc::new(TileCache::new(TileCacheLimits::default())),
            TileManagerConfig::default(),
        )
    }

    #[test]
    fn sync_load_sets_current_scene() {
        let lifecycle = lifecycle();
        let id = lifecycle.load_scene(
            SceneOptions::new(Url::parse("https://example.com/a.yaml").unwrap()),
            false,
            |_, _| {},
        );
        let current = lifecycle.current().unwrap();
        assert_eq!(current.id(), id);
        assert!(current.is_ready());
    }

    #[test]
    fn async_swap_delivers_ready_callbacks_in_submission_order() {
        let lifecycle = lifecycle();
        let (tx, rx) = mpsc::channel();

        let tx_a = tx.clone();
        let id_a = lifecycle.load_scene(
            SceneOptions::new(Url::parse("https://example.com/a.yaml").unwrap()),
            true,
            move |id, errors: Vec<SceneError>| {
                let _ = tx_a.send((id, errors.len()));
            },
        );

        let id_b = lifecycle.load_scene(
            SceneOptions::new(Url::parse("https://example.com/b.yaml").unwrap()),
            true,
            move |id, errors: Vec<SceneError>| {
                let _ = tx.send((id, errors.len()));
            },
        );

        let first = rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
        assert_eq!(first.0, id_a);
        assert_eq!(second.0, id_b);

        // Allow the dispose task(s) to run before asserting final state.
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(lifecycle.current().unwrap().id(), id_b);
    }

    #[test]
    fn cancel_then_reload_with_same_options_still_produces_a_ready_scene() {
        let lifecycle = lifecycle();
        let options = || SceneOptions::new(Url::parse("https://example.com/a.yaml").unwrap());

        let id1 = lifecycle.load_scene(options(), true, |_, _: Vec<SceneError>| {});
        let id2 = lifecycle.load_scene(options(), true, |_, _: Vec<SceneError>| {});

        std::thread::sleep(std::time::Duration::from_millis(50));
        let current = lifecycle.current().unwrap();
        assert_eq!(current.id(), id2);
        assert!(current.is_ready());
        assert_ne!(id1, id2);
    }

    #[test]
    fn root_fetch_failure_still_yields_a_ready_scene_with_the_error_recorded() {
        struct FailingPlatform;
        impl PlatformService for FailingPlatform {
            fn start_url_request(&self, _url: &Url, callback: UrlRequestCallback) -> RequestHandle {
                callback(Err(CartographError::NotFound));
                RequestHandle::next()
            }
            fn cancel_url_request(&self, _handle: RequestHandle) {}
            fn request_render(&self) {}
            fn set_continuous_rendering(&self, _continuous: bool) {}
            fn shutdown(&self) {}
        }

        let lifecycle = SceneLifecycle::new(
            Arc::new(FailingPlatform),
            Arc::new(TileCache::new(TileCacheLimits::default())),
            TileManagerConfig::default(),
        );
        lifecycle.load_scene(
            SceneOptions::new(Url::parse("https://example.com/missing.yaml").unwrap()),
            false,
            |_, _| {},
        );

        // The root document failed to parse (empty tree), but the load is
        // not cancelled outright: the importer's fatal case is only "root
        // URL never resolves a node at all", which still yields an empty,
        // ready scene with the error recorded.
        let current = lifecycle.current().unwrap();
        assert!(current.is_ready());
        assert!(!current.errors().is_empty());
    }
}

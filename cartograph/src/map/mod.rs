//! The single public entry point: sequences update/render ticks and funnels
//! client mutations through a job queue to the scene thread.

use crate::messenger::Messenger;
use crate::scene::lifecycle::SceneLifecycle;
use crate::scene::{Scene, SceneError, SceneId, SceneOptions};
use crate::tile::{TileCache, TileManagerConfig, TileSource};
use crate::view::View;
use cartograph_types::cartesian::{CartesianPoint2d, NewCartesianPoint2d, Point2d, Size};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Flags describing what changed as a result of a single [`Map::update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapState {
    /// True if the current scene is ready to draw.
    pub scene_ready: bool,
    /// True if a camera animation is still in progress.
    pub camera_animating: bool,
}

/// What a screen-point pick query found. Full feature/label hit-testing
/// needs the renderer's own screen-space geometry (an external
/// collaborator); this reports only what the core itself
/// tracks — registered markers close enough to be a plausible hit.
#[derive(Debug, Clone)]
pub enum PickResult {
    /// A registered marker's id.
    Marker(u64),
    /// A registered label's id.
    Label(u64),
}

struct AnimationParameters {
    start_view: View,
    end_view: View,
    elapsed: Duration,
    duration: Duration,
}

enum MapJob {
    SetView(View),
    AnimateTo(View, Duration),
    AddTileSource(Arc<dyn TileSource>),
    ClearTileSource(String),
    RemoveTileSource(String),
    AddMarker(Point2d, Option<String>),
    RemoveMarker(u64),
    ClearMarkers,
    AddLabel(Point2d, String),
    RemoveLabel(u64),
    ClearLabels,
}

/// Thin public surface over the scene pipeline. All mutating client calls
/// (camera, markers, tile sources) enqueue their side effects through a
/// main-thread job queue so the scene thread observes a consistent state at
/// frame boundaries.
pub struct Map {
    view: View,
    padding: Size,
    animation: Option<AnimationParameters>,
    messenger: Option<Arc<dyn Messenger>>,
    lifecycle: SceneLifecycle,
    jobs: Mutex<VecDeque<MapJob>>,
    ready_listener: Arc<Mutex<Option<Box<dyn FnMut(SceneId, Vec<SceneError>) + Send>>>>,
    animation_listener: Mutex<Option<Box<dyn FnMut(&View) + Send>>>,
}

impl Map {
    /// Builds a map with no scene loaded yet.
    pub fn new(
        view: View,
        platform: Arc<dyn crate::platform::PlatformService>,
        cache: Arc<TileCache>,
        manager_config: TileManagerConfig,
        messenger: Option<Arc<dyn Messenger>>,
    ) -> Self {
        Self {
            view,
            padding: Size::new(0.0, 0.0),
            animation: None,
            messenger,
            lifecycle: SceneLifecycle::new(platform, cache, manager_config),
            jobs: Mutex::new(VecDeque::new()),
            ready_listener: Arc::new(Mutex::new(None)),
            animation_listener: Mutex::new(None),
        }
    }

    /// The camera's current view.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// The view a running camera animation is heading towards, or the
    /// current view if none is in progress.
    pub fn target_view(&self) -> View {
        self.animation.as_ref().map(|a| a.end_view).unwrap_or(self.view)
    }

    /// The currently loaded scene, if any `load_scene` call has completed.
    pub fn scene(&self) -> Option<Arc<Scene>> {
        self.lifecycle.current()
    }

    /// Starts loading `options` as the new scene. See [`SceneLifecycle::load_scene`]
    /// for the synchronous/async load semantics. Returns the new scene's id
    /// immediately; `on_scene_ready` fires once the load (or cancellation)
    /// settles.
    pub fn load_scene(&self, options: SceneOptions, async_load: bool) -> SceneId {
        let listener = self.ready_listener.clone();
        let messenger = self.messenger.clone();
        self.lifecycle.load_scene(options, async_load, move |id, errors| {
            if let Some(callback) = listener.lock().as_mut() {
                callback(id, errors);
            }
            if let Some(messenger) = &messenger {
                messenger.request_redraw();
            }
        })
    }

    /// Registers the listener invoked once per completed (or cancelled)
    /// scene load.
    pub fn on_scene_ready(&self, callback: impl FnMut(SceneId, Vec<SceneError>) + Send + 'static) {
        *self.ready_listener.lock() = Some(Box::new(callback));
    }

    /// Registers the listener invoked every frame a camera animation is
    /// advanced.
    pub fn on_camera_animation(&self, callback: impl FnMut(&View) + Send + 'static) {
        *self.animation_listener.lock() = Some(Box::new(callback));
    }

    // -- Camera ------------------------------------------------------

    /// Stages a camera jump to `view`, applied at the next `update`.
    pub fn set_view(&self, view: View) {
        self.jobs.lock().push_back(MapJob::SetView(view));
    }

    /// Stages an eased camera move to `target`, applied starting at the
    /// next `update` and advanced by `duration` worth of subsequent ticks.
    pub fn animate_to(&self, target: View, duration: Duration) {
        self.jobs.lock().push_back(MapJob::AnimateTo(target, duration));
    }

    /// The camera position, in map units.
    pub fn position(&self) -> Point2d {
        self.view.center()
    }

    /// The camera's continuous zoom level.
    pub fn zoom(&self) -> f64 {
        self.view.zoom()
    }

    /// The camera's rotation, in radians.
    pub fn rotation(&self) -> f64 {
        self.view.rotation()
    }

    /// The camera's tilt, in radians.
    pub fn tilt(&self) -> f64 {
        self.view.pitch()
    }

    /// The viewport padding (in pixels) subtracted from each side when
    /// computing the effective visible area for tile scheduling.
    pub fn padding(&self) -> Size {
        self.padding
    }

    /// Sets the viewport padding.
    pub fn set_padding(&mut self, padding: Size) {
        self.padding = padding;
    }

    /// Resizes the viewport.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.view = self.view.with_viewport(Size::new(width, height));
        self.redraw();
    }

    // -- Tile sources --------------------------------------------------

    /// Stages adding `source` to the current scene's tile manager.
    pub fn add_tile_source(&self, source: Arc<dyn TileSource>) {
        self.jobs.lock().push_back(MapJob::AddTileSource(source));
    }

    /// Stages dropping `source_id`'s tracked tiles without unregistering it.
    pub fn clear_tile_source(&self, source_id: impl Into<String>) {
        self.jobs.lock().push_back(MapJob::ClearTileSource(source_id.into()));
    }

    /// Stages unregistering `source_id` entirely.
    pub fn remove_tile_source(&self, source_id: impl Into<String>) {
        self.jobs.lock().push_back(MapJob::RemoveTileSource(source_id.into()));
    }

    // -- Markers & labels ------------------------------------------------

    /// Stages adding a marker at `position`.
    pub fn add_marker(&self, position: Point2d, label: Option<String>) {
        self.jobs.lock().push_back(MapJob::AddMarker(position, label));
    }

    /// Stages removing the marker with `id`.
    pub fn remove_marker(&self, id: u64) {
        self.jobs.lock().push_back(MapJob::RemoveMarker(id));
    }

    /// Stages removing every marker.
    pub fn clear_markers(&self) {
        self.jobs.lock().push_back(MapJob::ClearMarkers);
    }

    /// Stages adding a text label at `position`.
    pub fn add_label(&self, position: Point2d, text: impl Into<String>) {
        self.jobs.lock().push_back(MapJob::AddLabel(position, text.into()));
    }

    /// Stages removing the label with `id`.
    pub fn remove_label(&self, id: u64) {
        self.jobs.lock().push_back(MapJob::RemoveLabel(id));
    }

    /// Stages removing every label.
    pub fn clear_labels(&self) {
        self.jobs.lock().push_back(MapJob::ClearLabels);
    }

    /// Finds the registered marker or label nearest `screen_point`, within
    /// `tolerance_px` of it. Feature picking against tile geometry is not
    /// implemented here: it needs the renderer's screen-space projection,
    /// an external collaborator.
    pub fn pick(&self, screen_point: Point2d, tolerance_px: f64) -> Option<PickResult> {
        let scene = self.lifecycle.current()?;
        let map_point = self.screen_to_map(screen_point);
        let tolerance = tolerance_px * self.view.resolution();

        let marker_hit = scene.with_markers(|markers| {
            markers
                .iter()
                .find(|m| distance(m.position, map_point) <= tolerance)
                .map(|m| m.id)
        })??;
        Some(PickResult::Marker(marker_hit))
    }

    fn screen_to_map(&self, screen_point: Point2d) -> Point2d {
        let half_w = self.view.viewport().half_width();
        let half_h = self.view.viewport().half_height();
        let resolution = self.view.resolution();
        Point2d::new(
            self.view.center().x() + (screen_point.x() - half_w) * resolution,
            self.view.center().y() - (screen_point.y() - half_h) * resolution,
        )
    }

    // -- Frame loop ------------------------------------------------------

    /// Advances the map by one frame: drains the job queue, advances the
    /// camera animation, and ticks the current scene's tile manager against
    /// the (possibly just-updated) view.
    pub fn update(&mut self, dt: Duration) -> MapState {
        self.drain_jobs();
        self.advance_animation(dt);

        let scene = self.lifecycle.current();
        let ready = scene.as_ref().map(|s| s.is_ready()).unwrap_or(false);
        if let Some(scene) = &scene {
            scene.tick(&self.effective_view());
        }

        MapState {
            scene_ready: ready,
            camera_animating: self.animation.is_some(),
        }
    }

    /// Issues draw passes against the current scene, if it's ready. The
    /// actual GPU work is the external renderer's;
    /// this is the seam that would hand it the scene's styles and tile
    /// manager. Returns whether there was anything ready to draw.
    pub fn render(&self) -> bool {
        self.lifecycle.current().map(|scene| scene.is_ready()).unwrap_or(false)
    }

    /// Requests a render pass from the messenger, if one is attached.
    pub fn redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    /// Tears the map down: shuts down the platform service, then joins the
    /// scene lifecycle's ordered worker, then drops any pending client jobs.
    /// No further `update`/`render` calls should be made afterwards.
    pub fn shutdown(&mut self) {
        self.lifecycle.shutdown();
        self.jobs.lock().clear();
    }

    fn effective_view(&self) -> View {
        let padded_width = (self.view.viewport().width() - 2.0 * self.padding.width()).max(1.0);
        let padded_height = (self.view.viewport().height() - 2.0 * self.padding.height()).max(1.0);
        self.view.with_viewport(Size::new(padded_width, padded_height))
    }

    fn drain_jobs(&mut self) {
        let jobs: Vec<MapJob> = self.jobs.lock().drain(..).collect();
        let scene = self.lifecycle.current();

        for job in jobs {
            match job {
                MapJob::SetView(view) => {
                    self.animation = None;
                    self.view = view;
                    self.redraw();
                }
                MapJob::AnimateTo(target, duration) => {
                    self.animation = Some(AnimationParameters {
                        start_view: self.view,
                        end_view: target,
                        elapsed: Duration::ZERO,
                        duration,
                    });
                }
                MapJob::AddTileSource(source) => {
                    if let Some(handle) = scene.as_ref().and_then(|s| s.client_tile_source()) {
                        handle.add(source);
                    }
                }
                MapJob::ClearTileSource(id) => {
                    if let Some(handle) = scene.as_ref().and_then(|s| s.client_tile_source()) {
                        handle.clear(id);
                    }
                }
                MapJob::RemoveTileSource(id) => {
                    if let Some(handle) = scene.as_ref().and_then(|s| s.client_tile_source()) {
                        handle.remove(id);
                    }
                }
                MapJob::AddMarker(position, label) => {
                    if let Some(scene) = &scene {
                        scene.with_markers(|mgr| mgr.add(position, label));
                    }
                }
                MapJob::RemoveMarker(id) => {
                    if let Some(scene) = &scene {
                        scene.with_markers(|mgr| mgr.remove(id));
                    }
                }
                MapJob::ClearMarkers => {
                    if let Some(scene) = &scene {
                        scene.with_markers(|mgr| mgr.clear());
                    }
                }
                MapJob::AddLabel(position, text) => {
                    if let Some(scene) = &scene {
                        scene.with_labels(|mgr| mgr.add(position, text));
                    }
                }
                MapJob::RemoveLabel(id) => {
                    if let Some(scene) = &scene {
                        scene.with_labels(|mgr| mgr.remove(id));
                    }
                }
                MapJob::ClearLabels => {
                    if let Some(scene) = &scene {
                        scene.with_labels(|mgr| mgr.clear());
                    }
                }
            }
        }
    }

    fn advance_animation(&mut self, dt: Duration) {
        let Some(animation) = &mut self.animation else {
            return;
        };
        animation.elapsed += dt;

        let k = (animation.elapsed.as_secs_f64() / animation.duration.as_secs_f64().max(f64::EPSILON)).min(1.0);
        self.view = animation.start_view.interpolate(&animation.end_view, k);

        if let Some(listener) = self.animation_listener.lock().as_mut() {
            listener(&self.view);
        }

        if k >= 1.0 {
            self.animation = None;
        }
        self.redraw();
    }
}

fn distance(a: Point2d, b: Point2d) -> f64 {
    ((a.x() - b.x()).powi(2) + (a.y() - b.y()).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformService, RequestHandle, UrlRequestCallback};
    use crate::tile::TileCacheLimits;
    use crate::url::Url;
    use bytes::Bytes;

    struct FakePlatform;
    impl PlatformService for FakePlatform {
        fn start_url_request(&self, _url: &Url, callback: UrlRequestCallback) -> RequestHandle {
            callback(Ok(Bytes::from_static(b"{}")));
            RequestHandle::next()
        }
        fn cancel_url_request(&self, _handle: RequestHandle) {}
        fn request_render(&self) {}
        fn set_continuous_rendering(&self, _continuous: bool) {}
        fn shutdown(&self) {}
    }

    fn map() -> Map {
        Map::new(
            View::new(Point2d::new(0.0, 0.0), 2.0, Size::new(512.0, 512.0)),
            Arc::new(FakePlatform),
            Arc::new(TileCache::new(TileCacheLimits::default())),
            TileManagerConfig::default(),
            None,
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_reports_scene_ready_once_load_completes() {
        let mut map = map();
        map.load_scene(SceneOptions::new(Url::parse("https://example.com/root.yaml").unwrap()), false);
        let state = map.update(Duration::from_millis(16));
        assert!(state.scene_ready);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn set_view_job_is_applied_on_next_update() {
        let mut map = map();
        let target = View::new(Point2d::new(10.0, 10.0), 4.0, Size::new(512.0, 512.0));
        map.set_view(target);
        map.update(Duration::from_millis(16));
        assert_eq!(map.view().center(), target.center());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn animate_to_eases_towards_the_target_over_multiple_updates() {
        let mut map = map();
        let target = View::new(Point2d::new(100.0, 0.0), 2.0, Size::new(512.0, 512.0));
        map.animate_to(target, Duration::from_millis(100));

        map.update(Duration::from_millis(10));
        let mid_x = map.view().center().x();
        assert!(mid_x > 0.0 && mid_x < 100.0);

        for _ in 0..20 {
            map.update(Duration::from_millis(10));
        }
        assert_eq!(map.view().center(), target.center());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn markers_added_through_the_job_queue_are_visible_after_update() {
        let mut map = map();
        map.load_scene(SceneOptions::new(Url::parse("https://example.com/root.yaml").unwrap()), false);
        map.update(Duration::from_millis(16));

        map.add_marker(Point2d::new(0.0, 0.0), None);
        map.update(Duration::from_millis(16));

        let scene = map.scene().unwrap();
        let count = scene.with_markers(|mgr| mgr.iter().count()).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_drops_jobs_queued_but_never_applied() {
        let mut map = map();
        map.add_marker(Point2d::new(0.0, 0.0), None);
        map.shutdown();
        assert!(map.jobs.lock().is_empty());
    }
}

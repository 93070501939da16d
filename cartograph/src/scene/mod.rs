//! One assembled, ready-to-render scene: the merged document, its tile
//! sources and scheduler, and the marker/label/font bookkeeping that rides
//! alongside them. [`lifecycle::SceneLifecycle`] owns the current scene and
//! drives the cancel-then-dispose-then-load sequencing.

pub mod document;
pub mod importer;
pub mod lifecycle;
pub mod node;

use crate::error::CartographError;
use crate::platform::PlatformService;
use crate::tile::{
    ClientTileSource, Tile, TileCache, TileId, TileManager, TileManagerConfig, TileSourceConfig,
    UrlTileSource,
};
use crate::url::Url;
use crate::view::View;
use crate::work_pool::WorkerPool;
use cartograph_types::cartesian::Point2d;
use importer::Importer;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Monotonically increasing scene identifier. Callbacks carry this id so
/// clients can discard results for a scene that is no longer current.
pub type SceneId = u64;

/// The request to load a scene. Immutable once built.
#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// The document to fetch as the import graph's root.
    pub root_url: Url,
    /// If set, used as the root document's text instead of fetching
    /// `root_url` (`root_url` is still used to resolve relative imports).
    pub inline_document: Option<String>,
    /// Per-source-id URL template overrides, applied in place of whatever
    /// the merged document specifies for that source.
    pub source_overrides: HashMap<String, Url>,
    /// Pixel scale (device pixel ratio) of the render target this scene is
    /// being built for.
    pub pixel_scale: f32,
}

impl SceneOptions {
    /// Creates options that fetch `root_url` with no inline override.
    pub fn new(root_url: Url) -> Self {
        Self {
            root_url,
            inline_document: None,
            source_overrides: HashMap::new(),
            pixel_scale: 1.0,
        }
    }

    /// Uses `text` as the root document instead of fetching it over
    /// `root_url`.
    pub fn with_inline_document(mut self, text: impl Into<String>) -> Self {
        self.inline_document = Some(text.into());
        self
    }

    /// Overrides the URL template used for the source named `id`.
    pub fn with_source_override(mut self, id: impl Into<String>, url: Url) -> Self {
        self.source_overrides.insert(id.into(), url);
        self
    }

    /// Sets the render target's pixel scale.
    pub fn with_pixel_scale(mut self, scale: f32) -> Self {
        self.pixel_scale = scale;
        self
    }
}

/// One `styles.<name>` entry from the merged document. Opaque to this
/// crate: the declarative-style-to-shader compiler (an external
/// collaborator) is the consumer of `definition`.
#[derive(Debug, Clone)]
pub struct StyleDefinition {
    /// The style's name, i.e. its key under `styles`.
    pub name: String,
    /// The style's raw document subtree.
    pub definition: Value,
}

/// A load-time error attached to a [`Scene`] and delivered once via
/// `on_scene_ready`.
#[derive(Debug, Clone)]
pub struct SceneError {
    /// The document this error is attributed to, if any.
    pub url: Option<Url>,
    /// Human-readable description.
    pub message: String,
}

/// A point marker registered on a scene.
#[derive(Debug, Clone)]
pub struct Marker {
    /// Id this marker was assigned on `add`.
    pub id: u64,
    /// Marker position, in the scene's map units.
    pub position: Point2d,
    /// Optional style/symbol name (opaque, resolved by the renderer).
    pub label: Option<String>,
}

/// CRUD registry of point markers. Rendering (symbol lookup, GPU upload) is
/// the external renderer's job; this just tracks what's registered.
#[derive(Debug, Default)]
pub struct MarkerManager {
    markers: HashMap<u64, Marker>,
    next_id: u64,
}

impl MarkerManager {
    /// Registers a marker at `position`, returning its id.
    pub fn add(&mut self, position: Point2d, label: Option<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.markers.insert(id, Marker { id, position, label });
        id
    }

    /// Unregisters the marker with `id`, if present.
    pub fn remove(&mut self, id: u64) -> Option<Marker> {
        self.markers.remove(&id)
    }

    /// Drops every registered marker.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Looks up a marker by id.
    pub fn get(&self, id: u64) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// Iterates over all registered markers.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }
}

/// A text label registered on a scene. Glyph rasterization itself is an
/// external collaborator; this just tracks the
/// placement request.
#[derive(Debug, Clone)]
pub struct Label {
    /// Id this label was assigned on `add`.
    pub id: u64,
    /// Anchor position, in the scene's map units.
    pub position: Point2d,
    /// The label's text content.
    pub text: String,
}

/// CRUD registry of text labels.
#[derive(Debug, Default)]
pub struct LabelManager {
    labels: HashMap<u64, Label>,
    next_id: u64,
}

impl LabelManager {
    /// Registers a label at `position`, returning its id.
    pub fn add(&mut self, position: Point2d, text: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.labels.insert(
            id,
            Label {
                id,
                position,
                text: text.into(),
            },
        );
        id
    }

    /// Unregisters the label with `id`, if present.
    pub fn remove(&mut self, id: u64) -> Option<Label> {
        self.labels.remove(&id)
    }

    /// Drops every registered label.
    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// Iterates over all registered labels.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }
}

/// Registry of font families resolved for this scene. Glyph atlas packing
/// and rasterization are external collaborators; this just
/// records which families a scene's styles have asked to use so the font
/// subsystem knows what to load.
#[derive(Debug, Default)]
pub struct FontContext {
    families: Vec<String>,
}

impl FontContext {
    /// Records that `name` is needed by this scene, if not already present.
    pub fn register_family(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.families.contains(&name) {
            self.families.push(name);
        }
    }

    /// The families registered so far.
    pub fn families(&self) -> &[String] {
        &self.families
    }
}

struct ReadyState {
    styles: Vec<StyleDefinition>,
    tile_manager: TileManager,
    marker_manager: MarkerManager,
    label_manager: LabelManager,
    font_context: FontContext,
    errors: Vec<SceneError>,
}

enum SceneState {
    Loading,
    Ready(ReadyState),
    Cancelled,
}

/// The assembled, ready-to-render state of one stylesheet plus its
/// resources.
///
/// Created in the `Loading` state immediately when a load is submitted (so
/// its id is known right away); [`Scene::mark_ready`]/[`Scene::mark_cancelled`]
/// transition it once the importer and tile source construction finish,
/// from whichever thread is running the load task.
pub struct Scene {
    id: SceneId,
    cancel: Arc<AtomicBool>,
    state: Mutex<SceneState>,
}

impl Scene {
    fn new_loading(id: SceneId, cancel: Arc<AtomicBool>) -> Arc<Scene> {
        Arc::new(Scene {
            id,
            cancel,
            state: Mutex::new(SceneState::Loading),
        })
    }

    /// This scene's unique id.
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// True once the scene has finished loading and is ready to draw.
    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.lock(), SceneState::Ready(_))
    }

    /// True if this scene's load was cancelled before completing.
    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.state.lock(), SceneState::Cancelled)
    }

    /// Advances this scene's tile manager (and, transitively, its markers
    /// and labels) by one frame against `view`. A no-op while loading.
    pub fn tick(&self, view: &View) {
        if let SceneState::Ready(ready) = &mut *self.state.lock() {
            ready.tile_manager.update(view);
        }
    }

    /// The tile currently serving `(source_id, tile)`, real or proxy.
    pub fn displayed_tile(&self, source_id: &str, tile: TileId) -> Option<Arc<Tile>> {
        match &*self.state.lock() {
            SceneState::Ready(ready) => ready.tile_manager.displayed_tile(source_id, tile),
            _ => None,
        }
    }

    /// A handle for staging tile source registration changes, if the scene
    /// is ready. `None` while loading — callers should retry on a later
    /// frame rather than block.
    pub fn client_tile_source(&self) -> Option<ClientTileSource> {
        match &*self.state.lock() {
            SceneState::Ready(ready) => Some(ready.tile_manager.client_handle()),
            _ => None,
        }
    }

    /// This scene's style definitions, empty while loading.
    pub fn styles(&self) -> Vec<StyleDefinition> {
        match &*self.state.lock() {
            SceneState::Ready(ready) => ready.styles.clone(),
            _ => Vec::new(),
        }
    }

    /// The load-time errors accumulated while building this scene.
    pub fn errors(&self) -> Vec<SceneError> {
        match &*self.state.lock() {
            SceneState::Ready(ready) => ready.errors.clone(),
            _ => Vec::new(),
        }
    }

    /// Runs `f` against the marker manager, if ready.
    pub fn with_markers<R>(&self, f: impl FnOnce(&mut MarkerManager) -> R) -> Option<R> {
        match &mut *self.state.lock() {
            SceneState::Ready(ready) => Some(f(&mut ready.marker_manager)),
            _ => None,
        }
    }

    /// Runs `f` against the label manager, if ready.
    pub fn with_labels<R>(&self, f: impl FnOnce(&mut LabelManager) -> R) -> Option<R> {
        match &mut *self.state.lock() {
            SceneState::Ready(ready) => Some(f(&mut ready.label_manager)),
            _ => None,
        }
    }

    /// Runs `f` against the font context, if ready.
    pub fn with_fonts<R>(&self, f: impl FnOnce(&mut FontContext) -> R) -> Option<R> {
        match &mut *self.state.lock() {
            SceneState::Ready(ready) => Some(f(&mut ready.font_context)),
            _ => None,
        }
    }

    /// Cancels this scene's load: flips the shared cancel flag the importer
    /// observes, and cancels any tile fetches already in flight. Safe to
    /// call from any thread; safe to call more than once.
    pub fn cancel_tasks(&self) {
        self.cancel.store(true, Ordering::Release);
        if let SceneState::Ready(ready) = &mut *self.state.lock() {
            ready.tile_manager.cancel_all();
        }
    }

    fn mark_ready(&self, ready: ReadyState) {
        let mut guard = self.state.lock();
        if self.cancel.load(Ordering::Acquire) {
            *guard = SceneState::Cancelled;
        } else {
            *guard = SceneState::Ready(ready);
        }
    }

    fn mark_cancelled(&self) {
        *self.state.lock() = SceneState::Cancelled;
    }

    /// Runs the importer (4.5) and builds tile sources/styles from the
    /// merged document. Blocks the calling thread until the importer
    /// settles; intended to run on the ordered scene worker.
    fn build_ready(
        options: &SceneOptions,
        platform: Arc<dyn PlatformService>,
        decode_pool: WorkerPool,
        cache: Arc<TileCache>,
        manager_config: TileManagerConfig,
        cancel: Arc<AtomicBool>,
    ) -> Result<ReadyState, ()> {
        let importer = Importer::new(platform.clone(), decode_pool.clone());
        let result = importer.load(options, cancel);
        if result.cancelled {
            return Err(());
        }

        let mut errors: Vec<SceneError> = result
            .errors
            .into_iter()
            .map(|(url, message)| SceneError {
                url: Some(url),
                message,
            })
            .collect();

        let mut tile_manager = TileManager::new(cache, manager_config);
        if let Some(Value::Mapping(sources)) =
            document::get_at_path(&result.document, &[document::Step::Key("sources".into())])
        {
            for (key, value) in sources {
                let Some(id) = key.as_str() else { continue };
                match build_tile_source(id, value, options, platform.clone(), decode_pool.clone()) {
                    Ok(source) => tile_manager.register_source(source),
                    Err(err) => errors.push(SceneError {
                        url: None,
                        message: format!("tile source {id}: {err}"),
                    }),
                }
            }
        }

        let styles = match document::get_at_path(&result.document, &[document::Step::Key("styles".into())]) {
            Some(Value::Mapping(map)) => map
                .iter()
                .filter_map(|(key, value)| {
                    key.as_str().map(|name| StyleDefinition {
                        name: name.to_string(),
                        definition: value.clone(),
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(ReadyState {
            styles,
            tile_manager,
            marker_manager: MarkerManager::default(),
            label_manager: LabelManager::default(),
            font_context: FontContext::default(),
            errors,
        })
    }
}

#[derive(Deserialize)]
struct RawSourceConfig {
    #[serde(rename = "type")]
    format: crate::tile::TileFormat,
    url: String,
    #[serde(default)]
    url_params: HashMap<String, String>,
    max_zoom: u32,
}

fn build_tile_source(
    id: &str,
    value: &Value,
    options: &SceneOptions,
    platform: Arc<dyn PlatformService>,
    decode_pool: WorkerPool,
) -> Result<Arc<dyn crate::tile::TileSource>, CartographError> {
    let raw: RawSourceConfig = serde_yaml::from_value(value.clone())?;
    let url = match options.source_overrides.get(id) {
        Some(over) => over.string(),
        None => raw.url,
    };

    let config = TileSourceConfig {
        id: id.to_string(),
        format: raw.format,
        url,
        url_params: raw.url_params,
        max_zoom: raw.max_zoom,
    };
    Ok(Arc::new(UrlTileSource::new(config, platform, decode_pool)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{RequestHandle, UrlRequestCallback};
    use crate::tile::TileCacheLimits;
    use bytes::Bytes;
    use std::collections::HashMap as StdHashMap;

    struct FakePlatform {
        documents: StdHashMap<String, String>,
    }

    impl PlatformService for FakePlatform {
        fn start_url_request(&self, url: &Url, callback: UrlRequestCallback) -> RequestHandle {
            let handle = RequestHandle::next();
            let result = match self.documents.get(&url.string()) {
                Some(body) => Ok(Bytes::from(body.clone())),
                None => Err(CartographError::NotFound),
            };
            callback(result);
            handle
        }
        fn cancel_url_request(&self, _handle: RequestHandle) {}
        fn request_render(&self) {}
        fn set_continuous_rendering(&self, _continuous: bool) {}
        fn shutdown(&self) {}
    }

    fn build(root: &str, docs: &[(&str, &str)]) -> Arc<Scene> {
        let documents = docs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let platform: Arc<dyn PlatformService> = Arc::new(FakePlatform { documents });
        let cache = Arc::new(TileCache::new(TileCacheLimits::default()));
        let cancel = Arc::new(AtomicBool::new(false));
        let scene = Scene::new_loading(1, cancel.clone());
        let ready = Scene::build_ready(
            &SceneOptions::new(Url::parse(root).unwrap()),
            platform,
            WorkerPool::new(2),
            cache,
            TileManagerConfig::default(),
            cancel,
        )
        .unwrap();
        scene.mark_ready(ready);
        scene
    }

    #[test]
    fn registers_sources_and_styles_from_the_merged_document() {
        let scene = build(
            "https://example.com/root.yaml",
            &[(
                "https://example.com/root.yaml",
                r#"
                sources:
                  osm:
                    type: GeoJSON
                    url: "https://example.com/{z}/{x}/{y}.geojson"
                    max_zoom: 18
                styles:
                  roads:
                    texture: "global.line_color"
                "#,
            )],
        );

        assert!(scene.is_ready());
        assert!(scene.errors().is_empty(), "unexpected errors: {:?}", scene.errors());
        assert_eq!(scene.styles().len(), 1);
        assert!(scene.client_tile_source().is_some());
    }

    #[test]
    fn markers_and_labels_round_trip() {
        let scene = build("https://example.com/root.yaml", &[("https://example.com/root.yaml", "{}")]);

        let id = scene
            .with_markers(|mgr| mgr.add(Point2d::new(1.0, 2.0), Some("pin".into())))
            .unwrap();
        assert!(scene.with_markers(|mgr| mgr.get(id).is_some()).unwrap());

        scene.with_markers(|mgr| mgr.remove(id));
        assert!(!scene.with_markers(|mgr| mgr.get(id).is_some()).unwrap());
    }

    #[test]
    fn cancel_tasks_transitions_in_flight_load_to_cancelled() {
        let cancel = Arc::new(AtomicBool::new(true));
        let scene = Scene::new_loading(1, cancel);
        scene.mark_ready(ReadyState {
            styles: Vec::new(),
            tile_manager: TileManager::new(Arc::new(TileCache::new(TileCacheLimits::default())), TileManagerConfig::default()),
            marker_manager: MarkerManager::default(),
            label_manager: LabelManager::default(),
            font_context: FontContext::default(),
            errors: Vec::new(),
        });
        assert!(scene.is_cancelled());
        assert!(!scene.is_ready());
    }
}

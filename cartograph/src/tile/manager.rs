//! Camera-driven tile scheduler: computes the tile set a [`View`] needs,
//! drives loads through each source, fills gaps with proxy tiles, and
//! retires tiles that have fallen out of coverage.
//!
//! The visible-set rasterization below rasterizes the view's bounding box
//! against a standard Web-Mercator tile grid at an integer zoom level, the
//! same approach any XYZ tile consumer uses to pick its tile set.

use crate::tile::cache::TileCache;
use crate::tile::id::TileId;
use crate::tile::source::{LoadTileResult, TileSource};
use crate::tile::tile::Tile;
use crate::view::{View, BASE_RESOLUTION};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const TILE_SIZE_PX: f64 = 256.0;
const ORIGIN_X: f64 = -20_037_508.342787;
const ORIGIN_Y: f64 = 20_037_508.342787;

/// Tuning knobs for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct TileManagerConfig {
    /// Radius, in tiles, of the ring prefetched around the visible set.
    pub prefetch_radius: i64,
    /// Number of consecutive frames a tile may go unreferenced before it is
    /// dropped from the active set.
    pub removal_after_frames: u64,
}

impl Default for TileManagerConfig {
    fn default() -> Self {
        Self {
            prefetch_radius: 1,
            removal_after_frames: 2,
        }
    }
}

/// Current status of one `TileId` the manager is tracking for a source.
#[derive(Debug, Clone)]
pub enum TileState {
    /// No usable data yet; a load has been issued.
    Loading,
    /// The tile's own data is decoded and cached.
    Ready(Arc<Tile>),
    /// A different tile (ancestor or descendant) is standing in while the
    /// real one loads.
    Proxy(Arc<Tile>),
    /// The load was cancelled when the tile fell out of coverage.
    Canceled,
}

struct TileEntry {
    state: TileState,
    last_seen_frame: u64,
    requested: bool,
}

#[derive(Default)]
struct TileSet {
    entries: HashMap<TileId, TileEntry>,
}

/// A staged mutation to the manager's registered sources, applied at the
/// head of the next [`TileManager::update`].
enum PendingOp {
    Add(Arc<dyn TileSource>),
    Clear(String),
    Remove(String),
}

/// A tile source registration as observed from outside the scene thread:
/// the staged half of the `ClientTileSource` / `TileManager` pair.
pub struct ClientTileSource {
    pending: Arc<Mutex<Vec<PendingOp>>>,
}

impl ClientTileSource {
    /// Stages `source` for registration on the next update.
    pub fn add(&self, source: Arc<dyn TileSource>) {
        self.pending.lock().push(PendingOp::Add(source));
    }

    /// Stages dropping `source_id`'s tracked tiles without unregistering it.
    pub fn clear(&self, source_id: impl Into<String>) {
        self.pending.lock().push(PendingOp::Clear(source_id.into()));
    }

    /// Stages unregistering `source_id` and releasing all its tiles.
    pub fn remove(&self, source_id: impl Into<String>) {
        self.pending.lock().push(PendingOp::Remove(source_id.into()));
    }
}

/// Camera-driven scheduler owning the live tile set for every registered
/// source. Runs on the scene thread; `ClientTileSource` staging is the only
/// part other threads touch directly.
pub struct TileManager {
    cache: Arc<TileCache>,
    config: TileManagerConfig,
    sources: HashMap<String, Arc<dyn TileSource>>,
    tile_sets: HashMap<String, TileSet>,
    pending: Arc<Mutex<Vec<PendingOp>>>,
    frame: u64,
}

impl TileManager {
    /// Creates a manager with no registered sources yet.
    pub fn new(cache: Arc<TileCache>, config: TileManagerConfig) -> Self {
        Self {
            cache,
            config,
            sources: HashMap::new(),
            tile_sets: HashMap::new(),
            pending: Arc::new(Mutex::new(Vec::new())),
            frame: 0,
        }
    }

    /// A handle client code can use to stage source registration changes
    /// from any thread; they apply at the head of the next `update`.
    pub fn client_handle(&self) -> ClientTileSource {
        ClientTileSource {
            pending: self.pending.clone(),
        }
    }

    /// Registers `source` immediately (bypassing staging); intended for
    /// scene construction, where no other thread can race the manager yet.
    pub fn register_source(&mut self, source: Arc<dyn TileSource>) {
        self.tile_sets.insert(source.id().to_string(), TileSet::default());
        self.sources.insert(source.id().to_string(), source);
    }

    /// The sources currently registered.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Advances the tile set by one frame for `view`: applies staged source
    /// registrations, computes the visible and prefetch sets per source,
    /// issues loads, resolves proxies, and retires stale entries.
    pub fn update(&mut self, view: &View) {
        self.frame += 1;
        self.apply_pending();

        let source_ids: Vec<String> = self.sources.keys().cloned().collect();
        for source_id in source_ids {
            self.update_source(&source_id, view);
        }
    }

    /// Looks up the tile currently serving `tile_id` for `source_id`, be it
    /// the real tile or a proxy.
    pub fn displayed_tile(&self, source_id: &str, tile_id: TileId) -> Option<Arc<Tile>> {
        match &self.tile_sets.get(source_id)?.entries.get(&tile_id)?.state {
            TileState::Ready(tile) | TileState::Proxy(tile) => Some(tile.clone()),
            TileState::Loading | TileState::Canceled => None,
        }
    }

    /// Number of `TileId`s currently tracked for `source_id`.
    pub fn tracked_tile_count(&self, source_id: &str) -> usize {
        self.tile_sets.get(source_id).map(|set| set.entries.len()).unwrap_or(0)
    }

    /// Cancels every in-flight load across all registered sources. Used
    /// when the scene owning this manager is cancelled mid-load: the
    /// manager itself is about to be dropped, but any still-running
    /// platform requests should stop holding it alive longer than needed.
    pub fn cancel_all(&mut self) {
        for (source_id, tile_set) in &self.tile_sets {
            let Some(source) = self.sources.get(source_id) else {
                continue;
            };
            for (id, entry) in &tile_set.entries {
                if matches!(entry.state, TileState::Loading) {
                    source.cancel_tile(*id);
                }
            }
        }
    }

    fn apply_pending(&mut self) {
        let ops: Vec<PendingOp> = std::mem::take(&mut *self.pending.lock());
        for op in ops {
            match op {
                PendingOp::Add(source) => self.register_source(source),
                PendingOp::Clear(id) => {
                    if let Some(source) = self.sources.get(&id) {
                        source.clear_data();
                    }
                    self.tile_sets.insert(id, TileSet::default());
                }
                PendingOp::Remove(id) => {
                    if let Some(source) = self.sources.remove(&id) {
                        source.clear_data();
                    }
                    self.tile_sets.remove(&id);
                }
            }
        }
    }

    fn update_source(&mut self, source_id: &str, view: &View) {
        let Some(source) = self.sources.get(source_id).cloned() else {
            return;
        };
        let tile_set = self.tile_sets.entry(source_id.to_string()).or_default();

        let zoom = view.integer_zoom(source.max_zoom());
        let visible = visible_tiles(view, zoom);
        let prefetch = prefetch_ring(&visible, zoom, self.config.prefetch_radius);

        let mut requests = Vec::with_capacity(visible.len() + prefetch.len());
        let center = view.center();
        for id in &visible {
            requests.push((priority_key(*id, center, false), *id));
        }
        for id in &prefetch {
            requests.push((priority_key(*id, center, true), *id));
        }
        requests.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for (_, id) in requests {
            track_tile(tile_set, &self.cache, &source, source_id, id, self.frame);
        }

        for id in &visible {
            resolve_proxy(tile_set, &self.cache, source_id, *id);
        }

        retire_stale(tile_set, &source, self.frame, self.config.removal_after_frames);
    }
}

fn visible_tiles(view: &View, zoom: u32) -> Vec<TileId> {
    let bbox = view.bbox();
    let tile_span = BASE_RESOLUTION / 2f64.powi(zoom as i32) * TILE_SIZE_PX;
    let width = 1i64 << zoom;

    let x_min = ((bbox.x_min() - ORIGIN_X) / tile_span).floor() as i64;
    let x_max = ((bbox.x_max() - ORIGIN_X) / tile_span).floor() as i64;
    let y_min = ((ORIGIN_Y - bbox.y_max()) / tile_span).floor() as i64;
    let y_max = ((ORIGIN_Y - bbox.y_min()) / tile_span).floor() as i64;

    let y_min = y_min.max(0);
    let y_max = y_max.min(width - 1);

    let mut tiles = Vec::new();
    if y_min > y_max {
        return tiles;
    }

    // A span wider than the grid would otherwise wrap onto itself and
    // produce duplicate ids; clamping covers the whole world exactly once.
    let span = (x_max - x_min + 1).min(width);
    let mut seen_x = std::collections::HashSet::new();
    for x in x_min..(x_min + span) {
        if seen_x.insert(TileId::new(zoom, x, 0).x) {
            for y in y_min..=y_max {
                tiles.push(TileId::new(zoom, x, y));
            }
        }
    }
    tiles
}

fn prefetch_ring(visible: &[TileId], zoom: u32, radius: i64) -> Vec<TileId> {
    if visible.is_empty() || radius <= 0 {
        return Vec::new();
    }

    let width = 1i64 << zoom;
    let x_min = visible.iter().map(|t| t.x).min().unwrap_or(0);
    let x_max = visible.iter().map(|t| t.x).max().unwrap_or(0);
    let y_min = visible.iter().map(|t| t.y).min().unwrap_or(0);
    let y_max = visible.iter().map(|t| t.y).max().unwrap_or(0);

    let mut ring = Vec::new();
    for x in (x_min - radius)..=(x_max + radius) {
        for y in (y_min - radius).max(0)..=(y_max + radius).min(width - 1) {
            let candidate = TileId::new(zoom, x, y);
            if !visible.contains(&candidate) {
                ring.push(candidate);
            }
        }
    }
    ring
}

fn priority_key(id: TileId, center: cartograph_types::cartesian::Point2d, is_prefetch: bool) -> (f64, f64, i64) {
    use cartograph_types::cartesian::CartesianPoint2d;
    let tile_span = BASE_RESOLUTION / 2f64.powi(id.z as i32) * TILE_SIZE_PX;
    let tile_center_x = ORIGIN_X + (id.x as f64 + 0.5) * tile_span;
    let tile_center_y = ORIGIN_Y - (id.y as f64 + 0.5) * tile_span;
    let distance = ((tile_center_x - center.x()).powi(2) + (tile_center_y - center.y()).powi(2)).sqrt();
    let prefetch_rank = if is_prefetch { 1.0 } else { 0.0 };
    (distance, prefetch_rank, -(id.z as i64))
}

fn track_tile(
    tile_set: &mut TileSet,
    cache: &Arc<TileCache>,
    source: &Arc<dyn TileSource>,
    source_id: &str,
    id: TileId,
    frame: u64,
) {
    let entry = tile_set.entries.entry(id).or_insert_with(|| TileEntry {
        state: TileState::Loading,
        last_seen_frame: frame,
        requested: false,
    });
    entry.last_seen_frame = frame;

    if let Some(tile) = cache.get(&(source_id.to_string(), id)) {
        tile.touch(frame);
        entry.state = TileState::Ready(tile);
        return;
    }

    if matches!(entry.state, TileState::Ready(_)) {
        entry.state = TileState::Loading;
    }

    if entry.requested {
        return;
    }
    entry.requested = true;

    let cache = cache.clone();
    let source_id = source_id.to_string();
    let callback: Box<dyn FnOnce(LoadTileResult) + Send> = Box::new(move |result| {
        if let Ok(tile) = result {
            cache.put((source_id, id), tile);
        }
    });
    source.load_tile(id, callback);
}

fn resolve_proxy(tile_set: &mut TileSet, cache: &Arc<TileCache>, source_id: &str, id: TileId) {
    let Some(entry) = tile_set.entries.get_mut(&id) else {
        return;
    };
    if matches!(entry.state, TileState::Ready(_)) {
        return;
    }

    if let Some(parent) = id.parent() {
        if let Some(tile) = cache.get(&(source_id.to_string(), parent)) {
            entry.state = TileState::Proxy(tile);
            return;
        }
    }

    for child in id.children() {
        if let Some(tile) = cache.get(&(source_id.to_string(), child)) {
            entry.state = TileState::Proxy(tile);
            return;
        }
    }

    if !matches!(entry.state, TileState::Proxy(_)) {
        entry.state = TileState::Loading;
    }
}

fn retire_stale(tile_set: &mut TileSet, source: &Arc<dyn TileSource>, frame: u64, removal_after_frames: u64) {
    let stale: Vec<TileId> = tile_set
        .entries
        .iter()
        .filter(|(_, entry)| frame.saturating_sub(entry.last_seen_frame) > removal_after_frames)
        .map(|(id, _)| *id)
        .collect();

    for id in stale {
        if let Some(entry) = tile_set.entries.get(&id) {
            if matches!(entry.state, TileState::Loading) {
                source.cancel_tile(id);
            }
        }
        tile_set.entries.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformService, RequestHandle, UrlRequestCallback};
    use crate::tile::cache::TileCacheLimits;
    use crate::tile::source::{TileFormat, TileSourceConfig, UrlTileSource};
    use crate::url::Url;
    use bytes::Bytes;
    use cartograph_types::cartesian::{Point2d, Size};

    struct FakePlatform;
    impl PlatformService for FakePlatform {
        fn start_url_request(&self, _url: &Url, callback: UrlRequestCallback) -> RequestHandle {
            callback(Ok(Bytes::from_static(br#"{"type":"FeatureCollection","features":[]}"#)));
            RequestHandle::next()
        }
        fn cancel_url_request(&self, _handle: RequestHandle) {}
        fn request_render(&self) {}
        fn set_continuous_rendering(&self, _continuous: bool) {}
        fn shutdown(&self) {}
    }

    fn view_at(zoom: f64) -> View {
        View::new(Point2d::new(0.0, 0.0), zoom, Size::new(512.0, 512.0))
    }

    fn geojson_source(id: &str, max_zoom: u32) -> Arc<dyn TileSource> {
        Arc::new(UrlTileSource::new(
            TileSourceConfig {
                id: id.to_string(),
                format: TileFormat::GeoJson,
                url: "https://example.com/{z}/{x}/{y}.geojson".into(),
                url_params: HashMap::new(),
                max_zoom,
            },
            Arc::new(FakePlatform),
            crate::work_pool::WorkerPool::new(2),
        ))
    }

    #[test]
    fn visible_tiles_at_zoom_zero_is_the_single_root_tile() {
        let view = view_at(0.0);
        let tiles = visible_tiles(&view, 0);
        assert_eq!(tiles, vec![TileId::new(0, 0, 0)]);
    }

    #[test]
    fn prefetch_ring_excludes_the_visible_set() {
        let visible = vec![TileId::new(2, 1, 1)];
        let ring = prefetch_ring(&visible, 2, 1);
        assert!(!ring.contains(&TileId::new(2, 1, 1)));
        assert!(ring.contains(&TileId::new(2, 0, 0)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_marks_the_root_tile_ready_once_loaded() {
        let cache = Arc::new(TileCache::new(TileCacheLimits::default()));
        let mut manager = TileManager::new(cache, TileManagerConfig::default());
        manager.register_source(geojson_source("vector", 18));

        let view = view_at(0.0);
        manager.update(&view);
        // Give the spawned decode task a chance to run and populate the cache.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        manager.update(&view);

        let tile = manager.displayed_tile("vector", TileId::new(0, 0, 0));
        assert!(tile.is_some());

        let entry = &manager.tile_sets["vector"].entries[&TileId::new(0, 0, 0)];
        assert_matches::assert_matches!(entry.state, TileState::Ready(_));
    }

    #[test]
    fn stale_entries_are_retired_after_the_configured_frame_count() {
        let cache = Arc::new(TileCache::new(TileCacheLimits::default()));
        let mut manager = TileManager::new(
            cache,
            TileManagerConfig {
                prefetch_radius: 0,
                removal_after_frames: 1,
            },
        );
        manager.register_source(geojson_source("vector", 0));

        manager.update(&view_at(0.0));
        assert_eq!(manager.tracked_tile_count("vector"), 1);

        // Move the view far away so the old root tile is no longer visible
        // or prefetched at all, and let it age out.
        let far_view = View::new(Point2d::new(1e9, 1e9), 0.0, Size::new(1.0, 1.0));
        for _ in 0..3 {
            manager.update(&far_view);
        }

        assert_eq!(manager.tracked_tile_count("vector"), 0);
    }

    #[test]
    fn client_handle_stages_registration_applied_on_next_update() {
        let cache = Arc::new(TileCache::new(TileCacheLimits::default()));
        let mut manager = TileManager::new(cache, TileManagerConfig::default());
        let client = manager.client_handle();
        client.add(geojson_source("staged", 18));

        assert_eq!(manager.source_ids().count(), 0);
        manager.update(&view_at(0.0));
        assert_eq!(manager.source_ids().count(), 1);
    }
}
